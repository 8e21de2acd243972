use crate::error::{Result, SheetIntakeError};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const FIXED_LAYOUT_THRESHOLD: f64 = 0.8;
pub const STANDARD_HEURISTIC_THRESHOLD: f64 = 0.7;
pub const FLEXIBLE_SCAN_THRESHOLD: f64 = 0.3;

pub const STANDARD_WEIGHT_DATES: f64 = 0.3;
pub const STANDARD_WEIGHT_INCOME: f64 = 0.25;
pub const STANDARD_WEIGHT_EXPENSE: f64 = 0.25;
pub const STANDARD_WEIGHT_BALANCE: f64 = 0.2;

pub const FLEXIBLE_WEIGHT_DATES: f64 = 0.3;
pub const FLEXIBLE_WEIGHT_METRIC: f64 = 0.2;
pub const FLEXIBLE_CO_OCCURRENCE_BONUS: f64 = 0.1;

pub const STANDARD_SCAN_ROWS: usize = 10;
pub const FLEXIBLE_SCAN_ROWS: usize = 50;
pub const FLEXIBLE_SCAN_COLUMNS: usize = 5;
pub const MIN_DATE_CELLS: usize = 3;
pub const LOCALE_SAMPLE_ROWS: usize = 30;

pub const HEADER_CANDIDATE_ROWS: usize = 15;
pub const PERIOD_VALIDATION_WINDOW: usize = 50;

/// Row numbers (0-based) of the one accounting-system export whose layout never
/// changes. Only consulted by the fixed-layout strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedLayout {
    pub date_row: usize,
    pub income_row: usize,
    pub expense_row: usize,
    pub balance_row: usize,
    pub label_column: usize,
}

impl Default for FixedLayout {
    fn default() -> Self {
        Self {
            date_row: 2,
            income_row: 24,
            expense_row: 99,
            balance_row: 104,
            label_column: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub fixed_layout: FixedLayout,
    pub fixed_layout_threshold: f64,
    pub standard_threshold: f64,
    pub flexible_threshold: f64,
    pub standard_weights: StandardWeights,
    pub flexible_weights: FlexibleWeights,
    pub standard_scan_rows: usize,
    pub flexible_scan_rows: usize,
    pub flexible_scan_columns: usize,
    pub min_date_cells: usize,
    pub locale_sample_rows: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            fixed_layout: FixedLayout::default(),
            fixed_layout_threshold: FIXED_LAYOUT_THRESHOLD,
            standard_threshold: STANDARD_HEURISTIC_THRESHOLD,
            flexible_threshold: FLEXIBLE_SCAN_THRESHOLD,
            standard_weights: StandardWeights::default(),
            flexible_weights: FlexibleWeights::default(),
            standard_scan_rows: STANDARD_SCAN_ROWS,
            flexible_scan_rows: FLEXIBLE_SCAN_ROWS,
            flexible_scan_columns: FLEXIBLE_SCAN_COLUMNS,
            min_date_cells: MIN_DATE_CELLS,
            locale_sample_rows: LOCALE_SAMPLE_ROWS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardWeights {
    pub dates: f64,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

impl Default for StandardWeights {
    fn default() -> Self {
        Self {
            dates: STANDARD_WEIGHT_DATES,
            income: STANDARD_WEIGHT_INCOME,
            expense: STANDARD_WEIGHT_EXPENSE,
            balance: STANDARD_WEIGHT_BALANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlexibleWeights {
    pub dates: f64,
    pub per_metric: f64,
    pub co_occurrence_bonus: f64,
}

impl Default for FlexibleWeights {
    fn default() -> Self {
        Self {
            dates: FLEXIBLE_WEIGHT_DATES,
            per_metric: FLEXIBLE_WEIGHT_METRIC,
            co_occurrence_bonus: FLEXIBLE_CO_OCCURRENCE_BONUS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodConfig {
    pub header_candidate_rows: usize,
    pub validation_window: usize,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            header_candidate_rows: HEADER_CANDIDATE_ROWS,
            validation_window: PERIOD_VALIDATION_WINDOW,
        }
    }
}

/// Top-level configuration. Every section falls back to its defaults, so a
/// JSON document only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IntakeConfig {
    pub detection: DetectionConfig,
    pub periods: PeriodConfig,
    /// Label column used when the detector cannot tell where names live.
    pub label_column: Option<usize>,
}

impl IntakeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: IntakeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.detection;
        let unit_values = [
            ("fixed_layout_threshold", d.fixed_layout_threshold),
            ("standard_threshold", d.standard_threshold),
            ("flexible_threshold", d.flexible_threshold),
            ("standard_weights.dates", d.standard_weights.dates),
            ("standard_weights.income", d.standard_weights.income),
            ("standard_weights.expense", d.standard_weights.expense),
            ("standard_weights.balance", d.standard_weights.balance),
            ("flexible_weights.dates", d.flexible_weights.dates),
            ("flexible_weights.per_metric", d.flexible_weights.per_metric),
            (
                "flexible_weights.co_occurrence_bonus",
                d.flexible_weights.co_occurrence_bonus,
            ),
        ];

        for (name, value) in unit_values {
            if !(0.0..=1.0).contains(&value) {
                return Err(SheetIntakeError::InvalidConfig(format!(
                    "{} must be between 0.0 and 1.0 (got {})",
                    name, value
                )));
            }
        }

        if d.min_date_cells == 0 {
            return Err(SheetIntakeError::InvalidConfig(
                "min_date_cells must be at least 1".to_string(),
            ));
        }

        if self.periods.validation_window == 0 {
            return Err(SheetIntakeError::InvalidConfig(
                "periods.validation_window must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
