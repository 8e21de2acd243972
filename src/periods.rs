//! Period column detection.
//!
//! Header offsets differ between exporters, so several candidate rows are
//! scored by how many cells look like period labels. Candidates from the best
//! row are then validated against the data below: a month column that is
//! structurally present but never carries a nonzero number is dropped.

use crate::config::PeriodConfig;
use crate::schema::{CellValue, PeriodColumn, PeriodType, RawSheet};
use crate::utils::{last_day_of_month, normalize_label};
use chrono::{Datelike, NaiveDate};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static MONTH_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<month>[a-z]+)\.?(?:[\s\-/']*(?P<year>\d{4}|\d{2}))?$").unwrap()
});
static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<year>\d{4})[-/\.](?P<month>\d{1,2})$").unwrap());
static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<month>\d{1,2})[-/\.](?P<year>\d{4})$").unwrap());
static QUARTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:q|t)(?P<q1>[1-4])|(?P<q2>[1-4])(?:q|t))\b(?:[\s\-/']*(?P<year>\d{4}|\d{2}))?|\b(quarter|trimestre)\b",
    )
    .unwrap()
});
static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:fy\s?|ano\s|year\s|total\s)?(?P<year>(?:19|20)\d{2})$").unwrap());

fn month_number(word: &str) -> Option<u32> {
    let month = match word {
        "january" | "jan" | "enero" | "ene" => 1,
        "february" | "feb" | "febrero" => 2,
        "march" | "mar" | "marzo" => 3,
        "april" | "apr" | "abril" | "abr" => 4,
        "may" | "mayo" => 5,
        "june" | "jun" | "junio" => 6,
        "july" | "jul" | "julio" => 7,
        "august" | "aug" | "agosto" | "ago" => 8,
        "september" | "sep" | "sept" | "septiembre" | "setiembre" | "set" => 9,
        "october" | "oct" | "octubre" => 10,
        "november" | "nov" | "noviembre" => 11,
        "december" | "dec" | "diciembre" | "dic" => 12,
        _ => return None,
    };
    Some(month)
}

fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + year } else { year })
}

/// Parses a header label into its period type and, when the label names a
/// year, the last day of the period.
pub fn parse_period_label(label: &str) -> Option<(PeriodType, Option<NaiveDate>)> {
    let normalized = normalize_label(label);
    if normalized.is_empty() {
        return None;
    }

    if let Some(caps) = MONTH_WORD.captures(&normalized) {
        if let Some(month) = month_number(&caps["month"]) {
            let end = caps
                .name("year")
                .and_then(|y| expand_year(y.as_str()))
                .and_then(|year| last_day_of_month(year, month));
            return Some((PeriodType::Month, end));
        }
    }

    for pattern in [&*YEAR_MONTH, &*MONTH_YEAR] {
        if let Some(caps) = pattern.captures(&normalized) {
            let month: u32 = caps["month"].parse().ok()?;
            let year: i32 = caps["year"].parse().ok()?;
            let end = last_day_of_month(year, month)?;
            return Some((PeriodType::Month, Some(end)));
        }
    }

    if let Some(caps) = QUARTER.captures(&normalized) {
        let quarter: Option<u32> = caps
            .name("q1")
            .or_else(|| caps.name("q2"))
            .and_then(|q| q.as_str().parse().ok());
        let end = match (quarter, caps.name("year").and_then(|y| expand_year(y.as_str()))) {
            (Some(q), Some(year)) => last_day_of_month(year, q * 3),
            _ => None,
        };
        return Some((PeriodType::Quarter, end));
    }

    if let Some(caps) = YEAR.captures(&normalized) {
        let end = expand_year(&caps["year"]).and_then(|year| last_day_of_month(year, 12));
        return Some((PeriodType::Year, end));
    }

    None
}

/// Period view of a header cell. Date cells are months.
pub fn classify_period_cell(cell: &CellValue) -> Option<(PeriodType, Option<NaiveDate>)> {
    match cell {
        CellValue::Date(date) => Some((
            PeriodType::Month,
            last_day_of_month(date.year(), date.month()),
        )),
        CellValue::Text(text) => parse_period_label(text),
        _ => None,
    }
}

/// Header row chosen for the period columns, plus the validated columns.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodHeader {
    pub row: usize,
    pub columns: Vec<PeriodColumn>,
}

fn score_row(sheet: &RawSheet, row: usize) -> usize {
    sheet
        .row(row)
        .iter()
        .filter(|cell| classify_period_cell(cell).is_some())
        .count()
}

fn has_data(sheet: &RawSheet, header_row: usize, column: usize, window: usize) -> bool {
    (header_row + 1..=header_row + window)
        .take_while(|row| *row < sheet.row_count())
        .any(|row| sheet.cell(row, column).is_nonzero_number())
}

/// Finds the best-scoring header row and returns its validated period columns.
/// `None` when no candidate row holds a single period label.
pub fn detect_period_header(sheet: &RawSheet, config: &PeriodConfig) -> Option<PeriodHeader> {
    let candidate_rows = config.header_candidate_rows.min(sheet.row_count());

    let mut best: Option<(usize, usize)> = None;
    for row in 0..candidate_rows {
        let score = score_row(sheet, row);
        if score > 0 && best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((row, score));
        }
    }

    let (header_row, score) = best?;
    debug!("Period header row {} scored {}", header_row, score);

    let candidates: Vec<PeriodColumn> = sheet
        .row(header_row)
        .iter()
        .enumerate()
        .filter_map(|(column_index, cell)| {
            classify_period_cell(cell).map(|(period_type, period_end)| PeriodColumn {
                column_index,
                label: cell.display().into_owned(),
                period_type,
                period_end,
            })
        })
        .collect();

    let columns: Vec<PeriodColumn> = candidates
        .into_iter()
        .filter(|candidate| {
            let keep = has_data(sheet, header_row, candidate.column_index, config.validation_window);
            if !keep {
                debug!(
                    "Dropping period column '{}' (column {}): no nonzero values",
                    candidate.label, candidate.column_index
                );
            }
            keep
        })
        .collect();

    Some(PeriodHeader {
        row: header_row,
        columns,
    })
}

pub fn detect_periods(sheet: &RawSheet, config: &PeriodConfig) -> Vec<PeriodColumn> {
    detect_period_header(sheet, config)
        .map(|header| header.columns)
        .unwrap_or_default()
}
