//! # Financial Sheet Intake
//!
//! A library for reading cash-flow and P&L spreadsheet exports from arbitrary
//! accounting systems and turning them into a canonical monthly series plus an
//! editable, classified list of accounts.
//!
//! ## Core Concepts
//!
//! - **Format detection**: three confidence-scored strategies locate the date,
//!   income, expense and balance rows. The first to clear its threshold wins.
//! - **Period columns**: header rows are scored for month/quarter/year labels
//!   (English and Spanish) and columns without data are dropped.
//! - **Classification**: an ordered keyword table maps each line item to a
//!   main category and subcategory. Totals, subtotals, derived figures and
//!   section headers are tagged separately.
//! - **Analysis**: runway, burn rate, scenarios and waterfall bridges are pure
//!   functions over the monthly series.
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_sheet_intake::*;
//!
//! let bytes = std::fs::read("cashflow.xlsx")?;
//! let parsed = StatementProcessor::process_workbook(&bytes, "cashflow.xlsx", &IntakeConfig::default())?;
//!
//! let today = chrono::Local::now().date_naive();
//! let idx = current_month_index(&parsed.metrics, today);
//! let runway = calculate_runway(&parsed.metrics, idx)?;
//!
//! let tree = parsed.accounts.set_category("acc_12", MainCategory::OperatingExpenses);
//! let template = tree.to_template(&parsed.pattern, &parsed.periods)?;
//! ```

pub mod account_tree;
pub mod analysis;
pub mod classifier;
pub mod config;
pub mod error;
pub mod extraction;
pub mod format_detector;
pub mod locale;
pub mod numeric;
pub mod periods;
pub mod schema;
pub mod taxonomy;
pub mod template;
pub mod utils;
pub mod vocabulary;
pub mod workbook;

#[cfg(feature = "gemini")]
pub mod llm;

pub use account_tree::{
    classify_rows, collect_rows, AccountEdit, AccountNode, AccountTree, NodeType, StatementRow,
    TreeStats,
};
pub use analysis::*;
pub use classifier::{
    AccountClassifier, Classification, ClassificationContext, ClassificationSource,
    ExternalSuggestion, KeywordRule, TotalKind,
};
pub use config::{DetectionConfig, FixedLayout, IntakeConfig, PeriodConfig};
pub use error::{Result, SheetIntakeError};
pub use extraction::{extract_monthly_metrics, SeriesExtraction};
pub use format_detector::detect_format;
pub use numeric::{parse_number, to_number};
pub use periods::{detect_period_header, detect_periods, parse_period_label, PeriodHeader};
pub use schema::*;
pub use taxonomy::{
    CategoryTaxonomy, Direction, MainCategory, ScopeFilter, Subcategory, SubcategoryScope,
};
pub use template::{Reapplied, StatementTemplate};
pub use workbook::load_first_sheet;

use log::{debug, info};
use serde::Serialize;

/// Everything parsed from one upload. Owned by the caller; nothing is kept
/// between calls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedStatement {
    pub file_name: String,
    pub pattern: DetectedPattern,
    pub periods: Vec<PeriodColumn>,
    pub metrics: Vec<MonthlyMetric>,
    pub accounts: AccountTree,
    /// Cells that were unreadable and counted as zero, dropped periods and
    /// similar recoverable problems.
    pub warnings: Vec<String>,
    /// Column the account names were read from.
    pub label_column: usize,
}

impl ParsedStatement {
    /// Reapplies a saved template to this upload's sheet layout.
    pub fn reapply_template(&self, template: &StatementTemplate, sheet: &RawSheet) -> Reapplied {
        template.reapply(sheet, &self.periods, self.label_column)
    }
}

/// The detection and extraction half of the pipeline, before classification.
struct Staged {
    pattern: DetectedPattern,
    periods: Vec<PeriodColumn>,
    metrics: Vec<MonthlyMetric>,
    rows: Vec<StatementRow>,
    warnings: Vec<String>,
    label_column: usize,
}

pub struct StatementProcessor;

impl StatementProcessor {
    pub fn process(sheet: &RawSheet, file_name: &str, config: &IntakeConfig) -> Result<ParsedStatement> {
        Self::process_with(sheet, file_name, config, &AccountClassifier::default())
    }

    /// Same as [`StatementProcessor::process`] with a caller-supplied rule table.
    pub fn process_with(
        sheet: &RawSheet,
        file_name: &str,
        config: &IntakeConfig,
        classifier: &AccountClassifier,
    ) -> Result<ParsedStatement> {
        let staged = Self::stage(sheet, file_name, config)?;
        let classifications = classify_rows(classifier, &staged.rows, &staged.periods);
        Ok(Self::finish(staged, file_name, &classifications))
    }

    /// Loads the first worksheet of `bytes` and processes it.
    pub fn process_workbook(
        bytes: &[u8],
        file_name: &str,
        config: &IntakeConfig,
    ) -> Result<ParsedStatement> {
        let sheet = load_first_sheet(bytes, file_name)?;
        Self::process(&sheet, file_name, config)
    }

    /// Like [`StatementProcessor::process`], but lets Gemini reclassify the
    /// rows the local rules were unsure about. Enrichment failures never fail
    /// the upload.
    #[cfg(feature = "gemini")]
    pub async fn process_enriched(
        sheet: &RawSheet,
        file_name: &str,
        config: &IntakeConfig,
        enricher: &llm::GeminiAccountClassifier,
    ) -> Result<ParsedStatement> {
        let staged = Self::stage(sheet, file_name, config)?;
        let mut classifications =
            classify_rows(&AccountClassifier::default(), &staged.rows, &staged.periods);
        let names: Vec<String> = staged.rows.iter().map(|r| r.name.clone()).collect();
        enricher.enrich(&names, &mut classifications).await;
        Ok(Self::finish(staged, file_name, &classifications))
    }

    fn stage(sheet: &RawSheet, file_name: &str, config: &IntakeConfig) -> Result<Staged> {
        config.validate()?;

        info!(
            "Processing '{}' ({} rows x {} columns)",
            file_name,
            sheet.row_count(),
            sheet.width()
        );

        let pattern = detect_format(sheet, &config.detection)?;

        let header = detect_period_header(sheet, &config.periods);
        let data_start = header.as_ref().map(|h| h.row + 1).unwrap_or(0);
        let periods = header.map(|h| h.columns).unwrap_or_default();
        debug!("{} validated period column(s)", periods.len());

        let extraction = extract_monthly_metrics(sheet, &pattern, &periods);
        let mut warnings = extraction.warnings;
        if periods.is_empty() {
            warnings.push("No period columns with data were found".to_string());
        }

        let label_column = resolve_label_column(sheet, &pattern, config);
        let rows = collect_rows(sheet, label_column, &periods, data_start);

        Ok(Staged {
            pattern,
            periods,
            metrics: extraction.metrics,
            rows,
            warnings,
            label_column,
        })
    }

    fn finish(staged: Staged, file_name: &str, classifications: &[Classification]) -> ParsedStatement {
        let accounts = AccountTree::build(&staged.rows, &staged.pattern, classifications);
        let stats = accounts.stats();
        info!(
            "'{}': {} month(s), {} account(s), {:.0}% categorized",
            file_name,
            staged.metrics.len(),
            stats.total,
            stats.completion_percentage
        );

        ParsedStatement {
            file_name: file_name.to_string(),
            pattern: staged.pattern,
            periods: staged.periods,
            metrics: staged.metrics,
            accounts,
            warnings: staged.warnings,
            label_column: staged.label_column,
        }
    }
}

/// Configured column, else the column holding the detected income label,
/// else the first column.
fn resolve_label_column(sheet: &RawSheet, pattern: &DetectedPattern, config: &IntakeConfig) -> usize {
    if let Some(column) = config.label_column {
        return column;
    }
    if pattern.strategy == DetectionStrategy::FixedLayout {
        return config.detection.fixed_layout.label_column;
    }
    [
        &pattern.income_location,
        &pattern.expense_location,
        &pattern.balance_location,
    ]
    .into_iter()
    .flatten()
    .find_map(|location| {
        sheet
            .row(location.row)
            .iter()
            .position(|cell| cell.as_str() == Some(location.label.as_str()))
    })
    .unwrap_or(0)
}
