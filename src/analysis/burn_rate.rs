use super::{average_generation, check_index, trailing};
use crate::error::Result;
use crate::schema::MonthlyMetric;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Month-over-month change, in percent, inside which the trend is stable.
pub const STABLE_BAND_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BurnTrend {
    Improving,
    Worsening,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBurn {
    pub date: NaiveDate,
    pub month: String,
    pub burn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnRateAnalysis {
    pub current_month_burn: f64,
    pub average_3_month: f64,
    pub average_6_month: f64,
    /// Only with a full year of history.
    pub average_12_month: Option<f64>,
    /// Percent change against the previous month's generation.
    pub month_over_month_change: Option<f64>,
    pub trend: BurnTrend,
    pub monthly_burns: Vec<MonthlyBurn>,
}

pub fn analyze_burn_rate(series: &[MonthlyMetric], index: usize) -> Result<BurnRateAnalysis> {
    check_index(series, index)?;

    let current = series[index].monthly_generation;
    let average_12_month =
        (index + 1 >= 12).then(|| average_generation(trailing(series, index, 12)));

    let month_over_month_change = index
        .checked_sub(1)
        .map(|prev| series[prev].monthly_generation)
        .filter(|prev| *prev != 0.0)
        .map(|prev| (current - prev) / prev.abs() * 100.0);

    let trend = match month_over_month_change {
        Some(change) if change > STABLE_BAND_PERCENT => BurnTrend::Improving,
        Some(change) if change < -STABLE_BAND_PERCENT => BurnTrend::Worsening,
        _ => BurnTrend::Stable,
    };

    let monthly_burns = series[..=index]
        .iter()
        .map(|m| MonthlyBurn {
            date: m.date,
            month: m.month.clone(),
            burn: m.monthly_generation,
        })
        .collect();

    Ok(BurnRateAnalysis {
        current_month_burn: current,
        average_3_month: average_generation(trailing(series, index, 3)),
        average_6_month: average_generation(trailing(series, index, 6)),
        average_12_month,
        month_over_month_change,
        trend,
        monthly_burns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::series;

    #[test]
    fn test_rolling_averages() {
        let flows: Vec<(f64, f64)> = (1..=6).map(|i| (0.0, i as f64 * 100.0)).collect();
        let data = series(10_000.0, &flows);
        let analysis = analyze_burn_rate(&data, 5).unwrap();

        assert_eq!(analysis.current_month_burn, -600.0);
        assert_eq!(analysis.average_3_month, -500.0);
        assert_eq!(analysis.average_6_month, -350.0);
        assert_eq!(analysis.average_12_month, None);
        assert_eq!(analysis.monthly_burns.len(), 6);
        assert_eq!(analysis.trend, BurnTrend::Worsening);
    }

    #[test]
    fn test_twelve_month_average_needs_a_year() {
        let data = series(0.0, &[(100.0, 200.0); 12]);
        assert_eq!(analyze_burn_rate(&data, 10).unwrap().average_12_month, None);
        assert_eq!(analyze_burn_rate(&data, 11).unwrap().average_12_month, Some(-100.0));
    }

    #[test]
    fn test_deadband() {
        let data = series(0.0, &[(0.0, 1_000.0), (0.0, 1_040.0), (0.0, 900.0)]);
        assert_eq!(analyze_burn_rate(&data, 1).unwrap().trend, BurnTrend::Stable);
        assert_eq!(analyze_burn_rate(&data, 2).unwrap().trend, BurnTrend::Improving);
        assert_eq!(analyze_burn_rate(&data, 0).unwrap().month_over_month_change, None);
    }

    #[test]
    fn test_camel_case_keys() {
        let data = series(0.0, &[(0.0, 1.0); 2]);
        let json = serde_json::to_string(&analyze_burn_rate(&data, 1).unwrap()).unwrap();
        assert!(json.contains("\"average3Month\""));
        assert!(json.contains("\"monthOverMonthChange\""));
    }
}
