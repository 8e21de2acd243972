use super::{average_generation, check_index, trailing};
use crate::error::Result;
use crate::schema::MonthlyMetric;
use crate::utils::add_month_ends;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

pub const RECENT_WEIGHT: f64 = 0.6;
pub const LONGER_WEIGHT: f64 = 0.4;
pub const CONSERVATIVE_FACTOR: f64 = 1.2;
pub const OPTIMISTIC_FACTOR: f64 = 0.8;
/// Relative change between the last two quarters below which the trend is stable.
pub const TREND_BAND: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BurnRateTrend {
    Accelerating,
    Decelerating,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunwayConfidence {
    pub conservative: Option<u32>,
    pub moderate: Option<u32>,
    pub optimistic: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunwayAnalysis {
    /// `None` when the business is not burning cash.
    pub months_remaining: Option<u32>,
    pub runway_date: Option<NaiveDate>,
    pub current_balance: f64,
    /// Weighted monthly generation; negative while burning.
    pub average_burn_rate: f64,
    pub burn_rate_trend: BurnRateTrend,
    pub confidence: RunwayConfidence,
}

fn months_at(balance: f64, burn: f64) -> Option<u32> {
    if burn >= 0.0 {
        None
    } else if balance <= 0.0 {
        Some(0)
    } else {
        Some((balance / burn.abs()).floor() as u32)
    }
}

fn trend(series: &[MonthlyMetric], index: usize) -> BurnRateTrend {
    if index < 3 {
        return BurnRateTrend::Stable;
    }
    let recent = average_generation(trailing(series, index, 3));
    let prior = average_generation(trailing(series, index - 3, 3));

    if prior == 0.0 {
        return match recent {
            r if r < 0.0 => BurnRateTrend::Accelerating,
            r if r > 0.0 => BurnRateTrend::Decelerating,
            _ => BurnRateTrend::Stable,
        };
    }

    let change = (recent - prior) / prior.abs();
    if change.abs() < TREND_BAND {
        BurnRateTrend::Stable
    } else if recent < prior {
        BurnRateTrend::Accelerating
    } else {
        BurnRateTrend::Decelerating
    }
}

pub fn calculate_runway(series: &[MonthlyMetric], index: usize) -> Result<RunwayAnalysis> {
    check_index(series, index)?;

    let current = &series[index];
    let avg3 = average_generation(trailing(series, index, 3));
    let avg6 = average_generation(trailing(series, index, 6));
    let burn = RECENT_WEIGHT * avg3 + LONGER_WEIGHT * avg6;
    let balance = current.final_balance;

    let months_remaining = months_at(balance, burn);
    let runway_date = months_remaining.and_then(|m| add_month_ends(current.date, m));

    let confidence = if burn < 0.0 {
        let heaviest = avg3.abs().max(avg6.abs());
        let lightest = avg3.abs().min(avg6.abs());
        RunwayConfidence {
            conservative: months_at(balance, -heaviest * CONSERVATIVE_FACTOR),
            moderate: months_remaining,
            optimistic: months_at(balance, -lightest * OPTIMISTIC_FACTOR),
        }
    } else {
        RunwayConfidence {
            conservative: None,
            moderate: None,
            optimistic: None,
        }
    };

    debug!(
        "Runway at {}: balance {:.2}, burn {:.2}, months {:?}",
        current.month, balance, burn, months_remaining
    );

    Ok(RunwayAnalysis {
        months_remaining,
        runway_date,
        current_balance: balance,
        average_burn_rate: burn,
        burn_rate_trend: trend(series, index),
        confidence,
    })
}
