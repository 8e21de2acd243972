use crate::account_tree::AccountNode;
use crate::error::Result;
use crate::schema::{Currency, PeriodColumn, RawSheet, StatementType, Units};
use crate::utils::normalize_label;
use log::{info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A saved account mapping. Reapplied to later exports of the same statement
/// by row position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatementTemplate {
    pub statement_type: StatementType,
    pub currency: Currency,
    pub units: Units,
    pub period_columns: Vec<PeriodColumn>,
    #[schemars(description = "Active accounts in row order, with their classification")]
    pub accounts: Vec<AccountNode>,
}

#[derive(Debug, Clone, Default)]
pub struct Reapplied {
    pub accounts: Vec<AccountNode>,
    pub warnings: Vec<String>,
}

impl StatementTemplate {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn json_schema() -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(schemars::schema_for!(StatementTemplate))
    }

    /// Re-pulls period values for every saved account from a refreshed
    /// sheet. Classification is kept as saved. A label that no longer matches
    /// the saved name is reported but still applied.
    pub fn reapply(
        &self,
        sheet: &RawSheet,
        periods: &[PeriodColumn],
        label_column: usize,
    ) -> Reapplied {
        let mut warnings = Vec::new();

        let accounts = self
            .accounts
            .iter()
            .map(|saved| {
                let mut account = saved.clone();

                if saved.row_index >= sheet.row_count() {
                    warnings.push(format!(
                        "Row {} ('{}') is beyond the end of the sheet",
                        saved.row_index + 1,
                        saved.account_name
                    ));
                    account.periods = BTreeMap::new();
                    return account;
                }

                let current = sheet.cell(saved.row_index, label_column).display();
                if normalize_label(&current) != normalize_label(&saved.account_name) {
                    warnings.push(format!(
                        "Row {} label changed from '{}' to '{}'",
                        saved.row_index + 1,
                        saved.account_name,
                        current
                    ));
                }

                account.periods = if saved.is_section_header {
                    BTreeMap::new()
                } else {
                    periods
                        .iter()
                        .map(|p| {
                            let value = sheet
                                .cell(saved.row_index, p.column_index)
                                .number()
                                .unwrap_or(0.0);
                            (p.label.clone(), value)
                        })
                        .collect()
                };
                account
            })
            .collect();

        for warning in &warnings {
            warn!("{}", warning);
        }
        info!(
            "Reapplied template to {} account(s) across {} period(s)",
            self.accounts.len(),
            periods.len()
        );

        Reapplied { accounts, warnings }
    }
}
