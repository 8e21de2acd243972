use crate::numeric::parse_number;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A single spreadsheet cell as read from the first worksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    pub fn text<S: Into<String>>(value: S) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text content of the cell, if it holds text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The cell rendered the way a user would read it in the sheet.
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            CellValue::Empty => Cow::Borrowed(""),
            CellValue::Number(n) => Cow::Owned(n.to_string()),
            CellValue::Date(d) => Cow::Owned(d.format("%Y-%m-%d").to_string()),
            CellValue::Text(s) => Cow::Borrowed(s.trim()),
        }
    }

    /// Strict numeric view: `None` when the cell does not hold a number.
    pub fn number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => parse_number(s),
            _ => None,
        }
    }

    pub fn is_nonzero_number(&self) -> bool {
        self.number().map(|n| n != 0.0).unwrap_or(false)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

/// Row-major grid of the first worksheet. Rows may be ragged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawSheet {
    pub rows: Vec<Vec<CellValue>>,
}

impl RawSheet {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row in the sheet.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn row(&self, row: usize) -> &[CellValue] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First non-empty text cell among the first `max_cols` columns of a row.
    pub fn row_label(&self, row: usize, max_cols: usize) -> Option<(usize, &str)> {
        self.row(row)
            .iter()
            .take(max_cols)
            .enumerate()
            .find_map(|(col, cell)| match cell {
                CellValue::Text(s) if !s.trim().is_empty() && parse_number(s).is_none() => {
                    Some((col, s.trim()))
                }
                _ => None,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Mxn,
    Cop,
    Ars,
    Clp,
    Pen,
    Brl,
}

impl Currency {
    pub const ALL: [Currency; 9] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Mxn,
        Currency::Cop,
        Currency::Ars,
        Currency::Clp,
        Currency::Pen,
        Currency::Brl,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Mxn => "MXN",
            Currency::Cop => "COP",
            Currency::Ars => "ARS",
            Currency::Clp => "CLP",
            Currency::Pen => "PEN",
            Currency::Brl => "BRL",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    #[default]
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    #[default]
    CashFlow,
    ProfitAndLoss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    #[default]
    Units,
    Thousands,
    Millions,
}

impl Units {
    pub fn multiplier(&self) -> f64 {
        match self {
            Units::Units => 1.0,
            Units::Thousands => 1_000.0,
            Units::Millions => 1_000_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStrategy {
    FixedLayout,
    StandardHeuristic,
    FlexibleScan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateLocation {
    pub row: usize,
    pub columns: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricLocation {
    pub row: usize,
    pub label: String,
}

/// Where the structural pieces of a statement live, with a confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedPattern {
    pub date_location: Option<DateLocation>,
    pub income_location: Option<MetricLocation>,
    pub expense_location: Option<MetricLocation>,
    pub balance_location: Option<MetricLocation>,
    pub lowest_balance_location: Option<MetricLocation>,
    pub currency: Currency,
    pub language: Language,
    pub statement_type: StatementType,
    pub units: Units,
    pub strategy: DetectionStrategy,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Month,
    Quarter,
    Year,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeriodColumn {
    pub column_index: usize,
    #[schemars(description = "Header text exactly as it appears in the sheet")]
    pub label: String,
    pub period_type: PeriodType,
    #[serde(default)]
    #[schemars(description = "Last day of the period when the header names one")]
    pub period_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyMetric {
    pub date: NaiveDate,
    pub month: String,
    pub column_index: usize,
    pub total_inflow: f64,
    /// Always zero or negative.
    pub total_outflow: f64,
    pub final_balance: f64,
    pub lowest_balance: f64,
    pub monthly_generation: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_out_of_range_is_empty() {
        let sheet = RawSheet::new(vec![vec![CellValue::text("Revenue")]]);
        assert_eq!(sheet.cell(0, 0).display(), "Revenue");
        assert!(sheet.cell(5, 5).is_empty());
        assert!(sheet.row(3).is_empty());
    }

    #[test]
    fn test_row_label_skips_numeric_text() {
        let sheet = RawSheet::new(vec![vec![
            CellValue::Empty,
            CellValue::text("1,000"),
            CellValue::text("Ventas"),
        ]]);
        assert_eq!(sheet.row_label(0, 3), Some((2, "Ventas")));
    }

    #[test]
    fn test_cell_number_views() {
        assert_eq!(CellValue::text("$1,000").number(), Some(1000.0));
        assert_eq!(CellValue::text("Total").number(), None);
        assert!(!CellValue::Number(0.0).is_nonzero_number());
        assert!(CellValue::Number(-2.5).is_nonzero_number());
    }

    #[test]
    fn test_pattern_serializes_camel_case() {
        let pattern = DetectedPattern {
            date_location: Some(DateLocation {
                row: 0,
                columns: vec![1, 2],
            }),
            income_location: None,
            expense_location: None,
            balance_location: None,
            lowest_balance_location: None,
            currency: Currency::Mxn,
            language: Language::Es,
            statement_type: StatementType::CashFlow,
            units: Units::Units,
            strategy: DetectionStrategy::FlexibleScan,
            confidence: 0.5,
        };
        let json = serde_json::to_string(&pattern).unwrap();
        assert!(json.contains("\"dateLocation\""));
        assert!(json.contains("\"MXN\""));
        assert!(json.contains("\"es\""));
    }
}
