//! Turns a detected pattern plus validated period columns into the canonical
//! monthly series consumed by the analysis engine.

use crate::schema::{
    CellValue, DetectedPattern, MetricLocation, MonthlyMetric, PeriodColumn, PeriodType, RawSheet,
};
use crate::utils::{month_label, next_month_end};
use chrono::NaiveDate;
use log::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct SeriesExtraction {
    pub metrics: Vec<MonthlyMetric>,
    /// Cells that could not be read and were counted as zero.
    pub warnings: Vec<String>,
}

struct CellReader<'a> {
    sheet: &'a RawSheet,
    warnings: Vec<String>,
}

impl<'a> CellReader<'a> {
    fn amount(&mut self, location: Option<&MetricLocation>, column: usize) -> Option<f64> {
        let location = location?;
        let cell = self.sheet.cell(location.row, column);
        match cell {
            CellValue::Empty => Some(0.0),
            _ => match cell.number() {
                Some(value) => Some(value),
                None => {
                    self.warnings.push(format!(
                        "Unparsable value '{}' for '{}' at row {}, column {}; counted as 0",
                        cell.display(),
                        location.label,
                        location.row + 1,
                        column + 1
                    ));
                    Some(0.0)
                }
            },
        }
    }
}

/// Resolves a date for every month column. Undated columns continue from the
/// previous dated one; leading undated columns cannot be placed and are skipped.
fn dated_months<'a>(
    periods: &'a [PeriodColumn],
    warnings: &mut Vec<String>,
) -> Vec<(NaiveDate, &'a PeriodColumn)> {
    let mut dated = Vec::new();
    let mut previous: Option<NaiveDate> = None;

    for period in periods.iter().filter(|p| p.period_type == PeriodType::Month) {
        let date = period.period_end.or_else(|| previous.and_then(next_month_end));
        match date {
            Some(date) => {
                dated.push((date, period));
                previous = Some(date);
            }
            None => warnings.push(format!(
                "Period '{}' has no year and no preceding dated period; skipped",
                period.label
            )),
        }
    }

    dated.sort_by_key(|(date, period)| (*date, period.column_index));
    dated
}

pub fn extract_monthly_metrics(
    sheet: &RawSheet,
    pattern: &DetectedPattern,
    periods: &[PeriodColumn],
) -> SeriesExtraction {
    let mut warnings = Vec::new();
    let months = dated_months(periods, &mut warnings);
    let mut reader = CellReader {
        sheet,
        warnings: Vec::new(),
    };

    let mut metrics = Vec::with_capacity(months.len());
    let mut running_balance = 0.0;

    for (date, period) in months {
        let column = period.column_index;
        let inflow = reader
            .amount(pattern.income_location.as_ref(), column)
            .unwrap_or(0.0)
            .abs();
        let outflow = -reader
            .amount(pattern.expense_location.as_ref(), column)
            .unwrap_or(0.0)
            .abs();
        let generation = inflow + outflow;

        let final_balance = reader
            .amount(pattern.balance_location.as_ref(), column)
            .unwrap_or(running_balance + generation);
        running_balance = final_balance;

        let lowest_balance = reader
            .amount(pattern.lowest_balance_location.as_ref(), column)
            .unwrap_or(final_balance);

        metrics.push(MonthlyMetric {
            date,
            month: month_label(date),
            column_index: column,
            total_inflow: inflow,
            total_outflow: outflow,
            final_balance,
            lowest_balance,
            monthly_generation: generation,
        });
    }

    warnings.extend(reader.warnings);
    for warning in &warnings {
        warn!("{}", warning);
    }
    debug!("Extracted {} monthly metrics", metrics.len());

    SeriesExtraction { metrics, warnings }
}
