//! Structural format detection.
//!
//! Three strategies run in priority order and the first one whose confidence
//! reaches its threshold wins. Later strategies are never evaluated once an
//! earlier one is accepted. When none is accepted the sheet is reported as
//! [`SheetIntakeError::UnrecognizedFormat`] and needs a manual mapping.

use crate::config::DetectionConfig;
use crate::error::{Result, SheetIntakeError};
use crate::locale::{infer_currency, infer_language, infer_statement_type, infer_units};
use crate::periods::classify_period_cell;
use crate::schema::{DateLocation, DetectedPattern, DetectionStrategy, MetricLocation, RawSheet};
use crate::utils::normalize_label;
use crate::vocabulary::{match_metric, MatchStrength, MetricKind};
use log::{debug, info, warn};

const STANDARD_LABEL_COLUMNS: usize = 3;

const FIXED_INCOME_LABELS: &[&str] = &["total income", "total ingresos", "total revenue"];
const FIXED_EXPENSE_LABELS: &[&str] = &["total expense", "total egresos", "total gastos"];
const FIXED_BALANCE_LABELS: &[&str] = &["final balance", "saldo final", "ending balance"];

/// What a single strategy found, before locale inference.
#[derive(Debug, Clone, Default)]
struct StructureMatch {
    date_location: Option<DateLocation>,
    income: Option<MetricLocation>,
    expense: Option<MetricLocation>,
    balance: Option<MetricLocation>,
    lowest_balance: Option<MetricLocation>,
    confidence: f64,
}

impl DetectionStrategy {
    /// Evaluation order of the fallback chain.
    pub const ORDER: [DetectionStrategy; 3] = [
        DetectionStrategy::FixedLayout,
        DetectionStrategy::StandardHeuristic,
        DetectionStrategy::FlexibleScan,
    ];

    pub fn threshold(self, config: &DetectionConfig) -> f64 {
        match self {
            DetectionStrategy::FixedLayout => config.fixed_layout_threshold,
            DetectionStrategy::StandardHeuristic => config.standard_threshold,
            DetectionStrategy::FlexibleScan => config.flexible_threshold,
        }
    }

    fn run(self, sheet: &RawSheet, config: &DetectionConfig) -> StructureMatch {
        match self {
            DetectionStrategy::FixedLayout => fixed_layout(sheet, config),
            DetectionStrategy::StandardHeuristic => standard_heuristic(sheet, config),
            DetectionStrategy::FlexibleScan => flexible_scan(sheet, config),
        }
    }
}

/// Period-like cells of one row, or `None` below `min_cells`.
fn date_row(sheet: &RawSheet, row: usize, min_cells: usize) -> Option<DateLocation> {
    let columns: Vec<usize> = sheet
        .row(row)
        .iter()
        .enumerate()
        .filter(|(_, cell)| classify_period_cell(cell).is_some())
        .map(|(col, _)| col)
        .collect();

    (columns.len() >= min_cells).then_some(DateLocation { row, columns })
}

fn first_date_row(sheet: &RawSheet, rows: usize, min_cells: usize) -> Option<DateLocation> {
    (0..rows.min(sheet.row_count())).find_map(|row| date_row(sheet, row, min_cells))
}

fn row_has_numbers(sheet: &RawSheet, row: usize) -> bool {
    sheet.row(row).iter().any(|cell| cell.number().is_some())
}

/// Keeps the strongest match, the earliest among equals.
fn keep_best(
    best: &mut Option<(MatchStrength, MetricLocation)>,
    strength: MatchStrength,
    row: usize,
    label: &str,
) {
    let better = match best {
        Some((current, _)) => strength > *current,
        None => true,
    };
    if better {
        *best = Some((
            strength,
            MetricLocation {
                row,
                label: label.to_string(),
            },
        ));
    }
}

#[derive(Default)]
struct MetricScan {
    /// Keep the first row that mentions a metric instead of the strongest.
    first_match: bool,
    income: Option<(MatchStrength, MetricLocation)>,
    expense: Option<(MatchStrength, MetricLocation)>,
    balance: Option<(MatchStrength, MetricLocation)>,
    lowest_balance: Option<(MatchStrength, MetricLocation)>,
}

impl MetricScan {
    fn first_match() -> Self {
        Self {
            first_match: true,
            ..Self::default()
        }
    }

    fn offer(&mut self, row: usize, label: &str) {
        let slots = [
            (MetricKind::Income, &mut self.income),
            (MetricKind::Expense, &mut self.expense),
            (MetricKind::Balance, &mut self.balance),
            (MetricKind::LowestBalance, &mut self.lowest_balance),
        ];
        for (kind, slot) in slots {
            let Some(strength) = match_metric(label, kind) else {
                continue;
            };
            if !self.first_match {
                keep_best(slot, strength, row, label);
            } else if slot.is_none() {
                *slot = Some((
                    strength,
                    MetricLocation {
                        row,
                        label: label.to_string(),
                    },
                ));
            }
        }
    }

    fn into_match(self, date_location: Option<DateLocation>) -> StructureMatch {
        StructureMatch {
            date_location,
            income: self.income.map(|(_, loc)| loc),
            expense: self.expense.map(|(_, loc)| loc),
            balance: self.balance.map(|(_, loc)| loc),
            lowest_balance: self.lowest_balance.map(|(_, loc)| loc),
            confidence: 0.0,
        }
    }
}

fn label_contains_any(sheet: &RawSheet, row: usize, col: usize, needles: &[&str]) -> Option<MetricLocation> {
    let label = sheet.cell(row, col).display().into_owned();
    let normalized = normalize_label(&label);
    needles
        .iter()
        .any(|needle| normalized.contains(needle))
        .then_some(MetricLocation { row, label })
}

fn fixed_layout(sheet: &RawSheet, config: &DetectionConfig) -> StructureMatch {
    let layout = &config.fixed_layout;

    let date_location = date_row(sheet, layout.date_row, config.min_date_cells);
    let income = label_contains_any(sheet, layout.income_row, layout.label_column, FIXED_INCOME_LABELS);
    let expense = label_contains_any(sheet, layout.expense_row, layout.label_column, FIXED_EXPENSE_LABELS);
    let balance = label_contains_any(sheet, layout.balance_row, layout.label_column, FIXED_BALANCE_LABELS);

    let matched = [
        date_location.is_some(),
        income.is_some(),
        expense.is_some(),
        balance.is_some(),
    ]
    .iter()
    .filter(|m| **m)
    .count();

    StructureMatch {
        date_location,
        income,
        expense,
        balance,
        lowest_balance: None,
        confidence: matched as f64 / 4.0,
    }
}

fn standard_heuristic(sheet: &RawSheet, config: &DetectionConfig) -> StructureMatch {
    let date_location = first_date_row(sheet, config.standard_scan_rows, config.min_date_cells);
    let date_row_index = date_location.as_ref().map(|d| d.row);

    let mut scan = MetricScan::default();
    for row in 0..config.standard_scan_rows.min(sheet.row_count()) {
        if Some(row) == date_row_index || !row_has_numbers(sheet, row) {
            continue;
        }
        if let Some((_, label)) = sheet.row_label(row, STANDARD_LABEL_COLUMNS) {
            scan.offer(row, label);
        }
    }

    let mut found = scan.into_match(date_location);
    let w = &config.standard_weights;
    found.confidence = [
        (found.date_location.is_some(), w.dates),
        (found.income.is_some(), w.income),
        (found.expense.is_some(), w.expense),
        (found.balance.is_some(), w.balance),
    ]
    .iter()
    .filter(|(present, _)| *present)
    .map(|(_, weight)| weight)
    .sum();
    found
}

fn flexible_scan(sheet: &RawSheet, config: &DetectionConfig) -> StructureMatch {
    let date_location = first_date_row(sheet, config.flexible_scan_rows, config.min_date_cells);
    let date_row_index = date_location.as_ref().map(|d| d.row);

    let mut scan = MetricScan::first_match();
    for row in 0..config.flexible_scan_rows.min(sheet.row_count()) {
        if Some(row) == date_row_index || !row_has_numbers(sheet, row) {
            continue;
        }
        for cell in sheet.row(row).iter().take(config.flexible_scan_columns) {
            if let Some(text) = cell.as_str() {
                scan.offer(row, text.trim());
            }
        }
    }

    let mut found = scan.into_match(date_location);
    let w = &config.flexible_weights;
    let metrics = [&found.income, &found.expense, &found.balance]
        .iter()
        .filter(|m| m.is_some())
        .count();

    let mut confidence = 0.0;
    if found.date_location.is_some() {
        confidence += w.dates;
    }
    confidence += w.per_metric * metrics as f64;
    if found.date_location.is_some() && metrics > 0 {
        confidence += w.co_occurrence_bonus;
    }
    found.confidence = confidence.min(1.0);
    found
}

/// Runs the strategy chain over `sheet`.
pub fn detect_format(sheet: &RawSheet, config: &DetectionConfig) -> Result<DetectedPattern> {
    let mut best_confidence: f64 = 0.0;

    for strategy in DetectionStrategy::ORDER {
        let found = strategy.run(sheet, config);
        let threshold = strategy.threshold(config);
        debug!(
            "Strategy {:?} scored {:.2} (threshold {:.2})",
            strategy, found.confidence, threshold
        );
        best_confidence = best_confidence.max(found.confidence);

        if found.confidence >= threshold {
            let sample_rows = config.locale_sample_rows;
            let pattern = DetectedPattern {
                date_location: found.date_location,
                income_location: found.income,
                expense_location: found.expense,
                balance_location: found.balance,
                lowest_balance_location: found.lowest_balance,
                currency: infer_currency(sheet, sample_rows),
                language: infer_language(sheet, sample_rows),
                statement_type: infer_statement_type(sheet, sample_rows),
                units: infer_units(sheet, sample_rows),
                strategy,
                confidence: found.confidence,
            };
            info!(
                "Detected {:?} statement via {:?} (confidence {:.2}, {} / {:?})",
                pattern.statement_type, strategy, pattern.confidence, pattern.currency, pattern.language
            );
            return Ok(pattern);
        }
    }

    warn!(
        "No detection strategy accepted the sheet (best confidence {:.2})",
        best_confidence
    );
    Err(SheetIntakeError::UnrecognizedFormat { best_confidence })
}
