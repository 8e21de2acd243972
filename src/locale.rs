//! Currency, language, statement type and unit inference. Each runs
//! independently of the structural detection over a sampled window of rows.

use crate::schema::{Currency, Language, RawSheet, StatementType, Units};
use crate::utils::normalize_label;
use crate::vocabulary::{
    CASH_FLOW_TERMS, ENGLISH_TERMS, MILLIONS_MARKERS, PROFIT_AND_LOSS_TERMS, SPANISH_TERMS,
    THOUSANDS_MARKERS,
};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static CURRENCY_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"R\$|US\$|S/|€|£|\$|\b(USD|EUR|GBP|MXN|COP|ARS|CLP|PEN|BRL)\b").unwrap()
});

fn sampled_text(sheet: &RawSheet, sample_rows: usize) -> impl Iterator<Item = &str> {
    sheet
        .rows
        .iter()
        .take(sample_rows)
        .flat_map(|row| row.iter())
        .filter_map(|cell| cell.as_str())
}

fn currency_for_marker(marker: &str) -> Option<Currency> {
    let currency = match marker {
        "$" | "US$" | "USD" => Currency::Usd,
        "€" | "EUR" => Currency::Eur,
        "£" | "GBP" => Currency::Gbp,
        "R$" | "BRL" => Currency::Brl,
        "S/" | "PEN" => Currency::Pen,
        "MXN" => Currency::Mxn,
        "COP" => Currency::Cop,
        "ARS" => Currency::Ars,
        "CLP" => Currency::Clp,
        _ => return None,
    };
    Some(currency)
}

/// Majority vote over currency symbols and ISO codes. Defaults to USD when the
/// window carries no marker at all; ties go to the earlier entry of
/// [`Currency::ALL`].
pub fn infer_currency(sheet: &RawSheet, sample_rows: usize) -> Currency {
    let mut votes: HashMap<Currency, usize> = HashMap::new();

    for text in sampled_text(sheet, sample_rows) {
        for marker in CURRENCY_MARKERS.find_iter(text) {
            if let Some(currency) = currency_for_marker(marker.as_str()) {
                *votes.entry(currency).or_default() += 1;
            }
        }
    }

    debug!("Currency votes: {:?}", votes);

    let mut winner = Currency::default();
    let mut best = 0;
    for currency in Currency::ALL {
        let count = votes.get(&currency).copied().unwrap_or(0);
        if count > best {
            best = count;
            winner = currency;
        }
    }
    winner
}

fn count_terms(sheet: &RawSheet, sample_rows: usize, terms: &[&str]) -> usize {
    sampled_text(sheet, sample_rows)
        .map(|text| {
            let normalized = normalize_label(text);
            normalized
                .split(|c: char| !c.is_alphanumeric())
                .filter(|word| terms.contains(word))
                .count()
        })
        .sum()
}

/// English or Spanish when one side has at least twice the term hits of the
/// other, otherwise mixed.
pub fn infer_language(sheet: &RawSheet, sample_rows: usize) -> Language {
    let english = count_terms(sheet, sample_rows, ENGLISH_TERMS);
    let spanish = count_terms(sheet, sample_rows, SPANISH_TERMS);
    debug!("Language term counts: en={} es={}", english, spanish);

    if english > 0 && english >= spanish * 2 {
        Language::En
    } else if spanish > 0 && spanish >= english * 2 {
        Language::Es
    } else {
        Language::Mixed
    }
}

fn count_phrases(sheet: &RawSheet, sample_rows: usize, phrases: &[&str]) -> usize {
    sampled_text(sheet, sample_rows)
        .map(|text| {
            let normalized = normalize_label(text);
            phrases.iter().filter(|p| normalized.contains(*p)).count()
        })
        .sum()
}

pub fn infer_statement_type(sheet: &RawSheet, sample_rows: usize) -> StatementType {
    let pnl = count_phrases(sheet, sample_rows, PROFIT_AND_LOSS_TERMS);
    let cash = count_phrases(sheet, sample_rows, CASH_FLOW_TERMS);
    if pnl > cash {
        StatementType::ProfitAndLoss
    } else {
        StatementType::CashFlow
    }
}

pub fn infer_units(sheet: &RawSheet, sample_rows: usize) -> Units {
    if count_phrases(sheet, sample_rows, MILLIONS_MARKERS) > 0 {
        Units::Millions
    } else if count_phrases(sheet, sample_rows, THOUSANDS_MARKERS) > 0 {
        Units::Thousands
    } else {
        Units::Units
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CellValue;

    fn sheet_of(labels: &[&str]) -> RawSheet {
        RawSheet::new(
            labels
                .iter()
                .map(|l| vec![CellValue::from(*l), CellValue::Number(100.0)])
                .collect(),
        )
    }

    #[test]
    fn test_currency_majority_vote() {
        let sheet = sheet_of(&["Moneda: MXN", "Ventas MXN", "Costos MXN", "Nota en USD", "Total $"]);
        assert_eq!(infer_currency(&sheet, 30), Currency::Mxn);
    }

    #[test]
    fn test_currency_symbols_do_not_double_count() {
        let sheet = sheet_of(&["R$ 1.000,00", "R$ 2.000,00", "$ 5"]);
        assert_eq!(infer_currency(&sheet, 30), Currency::Brl);
    }

    #[test]
    fn test_currency_defaults_to_usd() {
        let sheet = sheet_of(&["Revenue", "Expenses"]);
        assert_eq!(infer_currency(&sheet, 30), Currency::Usd);
    }

    #[test]
    fn test_language_requires_two_to_one_majority() {
        let english = sheet_of(&["Total Income", "Total Expenses", "Ending Balance"]);
        assert_eq!(infer_language(&english, 30), Language::En);

        let spanish = sheet_of(&["TOTAL INGRESOS", "TOTAL EGRESOS", "SALDO FINAL", "Sueldos"]);
        assert_eq!(infer_language(&spanish, 30), Language::Es);

        let mixed = sheet_of(&["Total Revenue", "Total Expenses", "Ventas Productos", "Utilidad Neta"]);
        assert_eq!(infer_language(&mixed, 30), Language::Mixed);

        let empty = RawSheet::default();
        assert_eq!(infer_language(&empty, 30), Language::Mixed);
    }

    #[test]
    fn test_statement_type_and_units() {
        let pnl = sheet_of(&["Revenue", "Cost of Goods Sold", "Gross Profit", "EBITDA", "in thousands"]);
        assert_eq!(infer_statement_type(&pnl, 30), StatementType::ProfitAndLoss);
        assert_eq!(infer_units(&pnl, 30), Units::Thousands);

        let cash = sheet_of(&["Beginning Balance", "Total Income", "Ending Balance"]);
        assert_eq!(infer_statement_type(&cash, 30), StatementType::CashFlow);
        assert_eq!(infer_units(&cash, 30), Units::Units);
    }
}
