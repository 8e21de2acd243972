use crate::classifier::{merge_suggestions, Classification, ExternalSuggestion};
use crate::error::{Result, SheetIntakeError};
use crate::llm::client::GeminiClient;
use crate::llm::prompts::{build_classification_prompt, SYSTEM_PROMPT_CLASSIFICATION};
use crate::llm::types::Content;
use crate::taxonomy::{CategoryTaxonomy, ScopeFilter};
use futures::future::join_all;
use log::{info, warn};
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Local results at or above this confidence are not sent out.
pub const ENRICHMENT_CUTOFF: f64 = 0.6;
/// Line items per request; batches run concurrently.
pub const BATCH_SIZE: usize = 40;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SuggestionBatch {
    #[schemars(description = "One entry per classified line item.")]
    pub suggestions: Vec<ExternalSuggestion>,
}

impl SuggestionBatch {
    /// Gemini-compatible response schema: inlined, without `$schema` or
    /// `definitions`.
    pub fn response_schema() -> serde_json::Result<serde_json::Value> {
        let settings = SchemaSettings::draft07().with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        });
        let root = settings.into_generator().into_root_schema_for::<SuggestionBatch>();
        let mut value = serde_json::to_value(root)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("definitions");
            obj.remove("title");
        }
        Ok(value)
    }
}

/// Asks Gemini for classifications of uncertain rows. Always bounded by a
/// timeout; see [`GeminiAccountClassifier::enrich`].
pub struct GeminiAccountClassifier {
    client: GeminiClient,
    model: String,
    timeout: Duration,
    taxonomy: CategoryTaxonomy,
    filter: ScopeFilter,
}

impl GeminiAccountClassifier {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
            taxonomy: CategoryTaxonomy::new(),
            filter: ScopeFilter::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_taxonomy(mut self, taxonomy: CategoryTaxonomy, filter: ScopeFilter) -> Self {
        self.taxonomy = taxonomy;
        self.filter = filter;
        self
    }

    pub async fn suggest(&self, names: &[(usize, &str)]) -> Result<Vec<ExternalSuggestion>> {
        let prompt = build_classification_prompt(names, &self.taxonomy, &self.filter);
        let schema = SuggestionBatch::response_schema()?;

        let raw = self
            .client
            .generate_content(
                &self.model,
                SYSTEM_PROMPT_CLASSIFICATION,
                vec![Content::user(prompt)],
                Some(schema),
            )
            .await?;

        parse_suggestions(&raw)
    }

    /// Replaces weak local results with external suggestions. Any failure or
    /// timeout leaves `local` untouched and is only logged. Returns the
    /// number of replaced entries.
    pub async fn enrich(&self, names: &[String], local: &mut [Classification]) -> usize {
        let uncertain: Vec<(usize, &str)> = names
            .iter()
            .zip(local.iter())
            .enumerate()
            .filter(|(_, (_, c))| c.is_fallback() || c.confidence < ENRICHMENT_CUTOFF)
            .map(|(i, (name, _))| (i, name.as_str()))
            .collect();

        if uncertain.is_empty() {
            return 0;
        }

        let calls = uncertain.chunks(BATCH_SIZE).map(|chunk| self.suggest(chunk));
        let results = match tokio::time::timeout(self.timeout, join_all(calls)).await {
            Ok(results) => results,
            Err(_) => {
                warn!(
                    "External classification timed out after {:?}, keeping local rules",
                    self.timeout
                );
                return 0;
            }
        };

        let mut suggestions = Vec::new();
        for result in results {
            match result {
                Ok(batch) => suggestions.extend(batch),
                Err(e) => warn!("External classification unavailable, keeping local rules: {}", e),
            }
        }

        let replaced = merge_suggestions(local, &suggestions, &self.taxonomy, &self.filter);
        info!(
            "External classification replaced {} of {} uncertain row(s)",
            replaced,
            uncertain.len()
        );
        replaced
    }
}

fn parse_suggestions(raw: &str) -> Result<Vec<ExternalSuggestion>> {
    let batch: SuggestionBatch = serde_json::from_str(raw.trim())
        .map_err(|e| SheetIntakeError::ClassificationFailed(format!("Invalid response: {}", e)))?;
    Ok(batch.suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{AccountClassifier, ClassificationContext};
    use crate::taxonomy::MainCategory;

    #[test]
    fn test_response_schema_is_inlined() {
        let schema = SuggestionBatch::response_schema().unwrap();
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("definitions").is_none());
        assert!(schema["properties"]["suggestions"].is_object());
    }

    #[test]
    fn test_parse_suggestions() {
        let raw = r#"{"suggestions":[{"index":2,"category":"revenue","subcategory":"service_revenue","confidence":0.8}]}"#;
        let parsed = parse_suggestions(raw).unwrap();
        assert_eq!(parsed[0].category, MainCategory::Revenue);
        assert!(parse_suggestions("not json").is_err());
    }

    #[test]
    fn test_prompt_lists_codes_and_items() {
        let prompt = build_classification_prompt(
            &[(0, "Xyzzy")],
            &CategoryTaxonomy::new(),
            &ScopeFilter::default(),
        );
        assert!(prompt.contains("- operating_expenses (outflow)"));
        assert!(prompt.contains("- salaries: Salaries and wages / Sueldos y salarios"));
        assert!(prompt.contains("0. \"Xyzzy\""));
        assert!(!prompt.contains("- margin"));
    }

    #[tokio::test]
    async fn test_unreachable_service_keeps_local_results() {
        let client = GeminiClient::new("test-key".to_string()).with_base_url("http://127.0.0.1:9");
        let enricher = GeminiAccountClassifier::new(client, "gemini-test")
            .with_timeout(Duration::from_millis(200));

        let names = vec!["Xyzzy".to_string()];
        let mut local = vec![AccountClassifier::new().classify(
            "Xyzzy",
            None,
            &ClassificationContext::default(),
        )];
        let before = local.clone();

        assert_eq!(enricher.enrich(&names, &mut local).await, 0);
        assert_eq!(local, before);
    }
}
