//! Decision-support metrics over the monthly series.
//!
//! Everything here is a pure function of the series and a "current month"
//! index into it. The index must point inside the series.

pub mod burn_rate;
pub mod runway;
pub mod scenario;
pub mod waterfall;

pub use burn_rate::{analyze_burn_rate, BurnRateAnalysis, BurnTrend, MonthlyBurn};
pub use runway::{calculate_runway, BurnRateTrend, RunwayAnalysis, RunwayConfidence};
pub use scenario::{
    run_scenario, run_scenario_analysis, MonthlyProjection, ScenarioAnalysis, ScenarioParameters,
    ScenarioResult, ScenarioSet, ScenarioSummary,
};
pub use waterfall::{generate_waterfall_data, WaterfallBar, WaterfallKind};

use crate::error::{Result, SheetIntakeError};
use crate::schema::MonthlyMetric;
use crate::utils::mean;
use chrono::NaiveDate;

/// Index of the last month that ends on or before `today`, or 0 when the
/// whole series lies in the future.
pub fn current_month_index(series: &[MonthlyMetric], today: NaiveDate) -> usize {
    series
        .iter()
        .rposition(|m| m.date <= today)
        .unwrap_or(0)
}

pub(crate) fn check_index(series: &[MonthlyMetric], index: usize) -> Result<()> {
    if series.is_empty() {
        return Err(SheetIntakeError::EmptySeries);
    }
    if index >= series.len() {
        return Err(SheetIntakeError::InvalidMonthIndex {
            index,
            len: series.len(),
        });
    }
    Ok(())
}

/// Up to `months` entries ending at `index`, clamped to available history.
pub(crate) fn trailing(series: &[MonthlyMetric], index: usize, months: usize) -> &[MonthlyMetric] {
    let start = (index + 1).saturating_sub(months);
    &series[start..=index]
}

pub(crate) fn average_generation(window: &[MonthlyMetric]) -> f64 {
    let values: Vec<f64> = window.iter().map(|m| m.monthly_generation).collect();
    mean(&values)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::schema::MonthlyMetric;
    use crate::utils::{last_day_of_month, month_label};

    /// Series starting January 2024 with the given (inflow, outflow) pairs and
    /// an opening balance before the first month.
    pub fn series(opening: f64, flows: &[(f64, f64)]) -> Vec<MonthlyMetric> {
        let mut balance = opening;
        flows
            .iter()
            .enumerate()
            .map(|(i, (inflow, outflow))| {
                let year = 2024 + (i / 12) as i32;
                let date = last_day_of_month(year, (i % 12) as u32 + 1).unwrap();
                let generation = inflow - outflow.abs();
                balance += generation;
                MonthlyMetric {
                    date,
                    month: month_label(date),
                    column_index: i + 1,
                    total_inflow: *inflow,
                    total_outflow: -outflow.abs(),
                    final_balance: balance,
                    lowest_balance: balance,
                    monthly_generation: generation,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_month_index() {
        let series = fixtures::series(0.0, &[(10.0, 5.0); 4]);
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(current_month_index(&series, date(2024, 3, 31)), 2);
        assert_eq!(current_month_index(&series, date(2024, 3, 15)), 1);
        assert_eq!(current_month_index(&series, date(2023, 6, 1)), 0);
        assert_eq!(current_month_index(&series, date(2030, 1, 1)), 3);
    }

    #[test]
    fn test_index_preconditions() {
        let series = fixtures::series(0.0, &[(10.0, 5.0); 2]);
        assert!(check_index(&series, 1).is_ok());
        assert!(matches!(
            check_index(&series, 2),
            Err(SheetIntakeError::InvalidMonthIndex { index: 2, len: 2 })
        ));
        assert!(matches!(check_index(&[], 0), Err(SheetIntakeError::EmptySeries)));
        assert_eq!(trailing(&series, 1, 6).len(), 2);
        assert_eq!(trailing(&series, 1, 1).len(), 1);
    }
}
