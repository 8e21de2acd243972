use crate::error::{Result, SheetIntakeError};
use crate::schema::MonthlyMetric;
use serde::{Deserialize, Serialize};

/// Ranges longer than this collapse into income/expense totals.
pub const MAX_MONTHLY_BARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaterfallKind {
    Start,
    Month,
    Income,
    Expense,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallBar {
    pub label: String,
    pub kind: WaterfallKind,
    pub value: f64,
    pub income: Option<f64>,
    pub expenses: Option<f64>,
    pub running_balance: f64,
}

impl WaterfallBar {
    fn anchor(label: &str, kind: WaterfallKind, balance: f64) -> Self {
        Self {
            label: label.to_string(),
            kind,
            value: balance,
            income: None,
            expenses: None,
            running_balance: balance,
        }
    }
}

/// Bridge from the balance before `start` to the balance after `end`
/// (inclusive indices).
pub fn generate_waterfall_data(
    series: &[MonthlyMetric],
    start: usize,
    end: usize,
) -> Result<Vec<WaterfallBar>> {
    if series.is_empty() {
        return Err(SheetIntakeError::EmptySeries);
    }
    if start > end || end >= series.len() {
        return Err(SheetIntakeError::InvalidRange {
            start,
            end,
            len: series.len(),
        });
    }

    let months = &series[start..=end];
    let opening = match start {
        0 => 0.0,
        _ => series[start - 1].final_balance,
    };

    let mut bars = vec![WaterfallBar::anchor("Starting Balance", WaterfallKind::Start, opening)];
    let mut running = opening;

    if months.len() <= MAX_MONTHLY_BARS {
        for month in months {
            running += month.monthly_generation;
            bars.push(WaterfallBar {
                label: month.month.clone(),
                kind: WaterfallKind::Month,
                value: month.monthly_generation,
                income: Some(month.total_inflow),
                expenses: Some(month.total_outflow.abs()),
                running_balance: running,
            });
        }
    } else {
        let income: f64 = months.iter().map(|m| m.total_inflow).sum();
        let expenses: f64 = months.iter().map(|m| m.total_outflow.abs()).sum();

        running += income;
        bars.push(WaterfallBar {
            label: "Total Income".to_string(),
            kind: WaterfallKind::Income,
            value: income,
            income: Some(income),
            expenses: None,
            running_balance: running,
        });

        running -= expenses;
        bars.push(WaterfallBar {
            label: "Total Expenses".to_string(),
            kind: WaterfallKind::Expense,
            value: -expenses,
            income: None,
            expenses: Some(expenses),
            running_balance: running,
        });
    }

    bars.push(WaterfallBar::anchor("Ending Balance", WaterfallKind::End, running));
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::series;

    #[test]
    fn test_short_range_has_monthly_bars() {
        let data = series(5_000.0, &[(1_000.0, 400.0), (800.0, 900.0), (1_200.0, 300.0)]);
        let bars = generate_waterfall_data(&data, 1, 2).unwrap();

        let kinds: Vec<WaterfallKind> = bars.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![WaterfallKind::Start, WaterfallKind::Month, WaterfallKind::Month, WaterfallKind::End]
        );
        assert_eq!(bars[0].value, 5_600.0);
        assert_eq!(bars[1].value, -100.0);
        assert_eq!(bars[1].expenses, Some(900.0));
        assert_eq!(bars[3].value, 6_400.0);
        assert_eq!(bars[3].running_balance, data[2].final_balance);
    }

    #[test]
    fn test_long_range_collapses() {
        let data = series(0.0, &[(1_000.0, 500.0); 6]);
        let bars = generate_waterfall_data(&data, 0, 5).unwrap();

        assert_eq!(bars.len(), 4);
        assert_eq!(bars[0].value, 0.0);
        assert_eq!(bars[1].label, "Total Income");
        assert_eq!(bars[1].value, 6_000.0);
        assert_eq!(bars[2].label, "Total Expenses");
        assert_eq!(bars[2].value, -3_000.0);
        assert_eq!(bars[3].running_balance, 3_000.0);
    }

    #[test]
    fn test_invalid_ranges() {
        let data = series(0.0, &[(1.0, 1.0); 3]);
        assert!(matches!(
            generate_waterfall_data(&data, 2, 1),
            Err(SheetIntakeError::InvalidRange { .. })
        ));
        assert!(matches!(
            generate_waterfall_data(&data, 0, 3),
            Err(SheetIntakeError::InvalidRange { .. })
        ));
        assert!(matches!(
            generate_waterfall_data(&[], 0, 0),
            Err(SheetIntakeError::EmptySeries)
        ));
    }
}
