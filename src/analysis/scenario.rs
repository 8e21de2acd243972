use super::{check_index, trailing};
use crate::error::Result;
use crate::schema::MonthlyMetric;
use crate::utils::{add_month_ends, mean, month_label};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

pub const PROJECTION_MONTHS: usize = 12;

/// Percent changes applied to inflow and outflow during
/// `[starting_month, starting_month + duration)`, counted from the first
/// projected month (0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioParameters {
    pub inflow_change: f64,
    pub outflow_change: f64,
    pub starting_month: usize,
    pub duration: usize,
}

impl ScenarioParameters {
    pub fn base() -> Self {
        Self {
            inflow_change: 0.0,
            outflow_change: 0.0,
            starting_month: 0,
            duration: 12,
        }
    }

    pub fn best() -> Self {
        Self {
            inflow_change: 25.0,
            outflow_change: -15.0,
            starting_month: 0,
            duration: 6,
        }
    }

    pub fn worst() -> Self {
        Self {
            inflow_change: -30.0,
            outflow_change: 20.0,
            starting_month: 0,
            duration: 3,
        }
    }

    fn applies_to(&self, month: usize) -> bool {
        month
            .checked_sub(self.starting_month)
            .is_some_and(|offset| offset < self.duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub base: ScenarioParameters,
    pub best: ScenarioParameters,
    pub worst: ScenarioParameters,
}

impl Default for ScenarioSet {
    fn default() -> Self {
        Self {
            base: ScenarioParameters::base(),
            best: ScenarioParameters::best(),
            worst: ScenarioParameters::worst(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyProjection {
    pub date: NaiveDate,
    pub month: String,
    pub revenue: f64,
    /// Positive magnitude.
    pub expenses: f64,
    pub net_cash_flow: f64,
    pub ending_balance: f64,
    /// Baseline taken from the series rather than the trailing average.
    pub from_history: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub ending_cash: f64,
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_cash_flow: f64,
    /// Projected months before the balance first turns negative.
    pub months_of_runway: Option<usize>,
    pub run_out_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub monthly_projections: Vec<MonthlyProjection>,
    pub summary: ScenarioSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAnalysis {
    pub base: ScenarioResult,
    pub best: ScenarioResult,
    pub worst: ScenarioResult,
}

pub fn run_scenario(
    series: &[MonthlyMetric],
    index: usize,
    params: &ScenarioParameters,
) -> Result<ScenarioResult> {
    check_index(series, index)?;

    let current = &series[index];
    let last = series.len() - 1;
    let recent = trailing(series, last, 3);
    let avg_revenue = mean(&recent.iter().map(|m| m.total_inflow).collect::<Vec<_>>());
    let avg_expenses = mean(&recent.iter().map(|m| m.total_outflow.abs()).collect::<Vec<_>>());

    let mut balance = current.final_balance;
    let mut projections = Vec::with_capacity(PROJECTION_MONTHS);
    let mut run_out: Option<(usize, NaiveDate)> = None;

    for offset in 0..PROJECTION_MONTHS {
        let source = series.get(index + 1 + offset);
        let (mut revenue, mut expenses) = match source {
            Some(m) => (m.total_inflow, m.total_outflow.abs()),
            None => (avg_revenue, avg_expenses),
        };

        if params.applies_to(offset) {
            revenue *= 1.0 + params.inflow_change / 100.0;
            expenses *= 1.0 + params.outflow_change / 100.0;
        }

        let net = revenue - expenses;
        balance += net;

        let date = source
            .map(|m| m.date)
            .or_else(|| add_month_ends(current.date, offset as u32 + 1))
            .unwrap_or(current.date);

        if balance < 0.0 && run_out.is_none() {
            run_out = Some((offset, date));
        }

        projections.push(MonthlyProjection {
            date,
            month: month_label(date),
            revenue,
            expenses,
            net_cash_flow: net,
            ending_balance: balance,
            from_history: source.is_some(),
        });
    }

    let total_revenue: f64 = projections.iter().map(|p| p.revenue).sum();
    let total_expenses: f64 = projections.iter().map(|p| p.expenses).sum();

    debug!(
        "Scenario {:+}%/{:+}% from month {} for {}: ending cash {:.2}",
        params.inflow_change, params.outflow_change, params.starting_month, params.duration, balance
    );

    Ok(ScenarioResult {
        monthly_projections: projections,
        summary: ScenarioSummary {
            ending_cash: balance,
            total_revenue,
            total_expenses,
            net_cash_flow: total_revenue - total_expenses,
            months_of_runway: run_out.map(|(offset, _)| offset),
            run_out_date: run_out.map(|(_, date)| date),
        },
    })
}

pub fn run_scenario_analysis(
    series: &[MonthlyMetric],
    index: usize,
    scenarios: &ScenarioSet,
) -> Result<ScenarioAnalysis> {
    Ok(ScenarioAnalysis {
        base: run_scenario(series, index, &scenarios.base)?,
        best: run_scenario(series, index, &scenarios.best)?,
        worst: run_scenario(series, index, &scenarios.worst)?,
    })
}
