use chrono::{Datelike, Months, NaiveDate};

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

pub fn next_month_end(date: NaiveDate) -> Option<NaiveDate> {
    add_month_ends(date, 1)
}

/// Month end `months` months after the month containing `date`.
pub fn add_month_ends(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?;
    let shifted = first.checked_add_months(Months::new(months))?;
    last_day_of_month(shifted.year(), shifted.month())
}

/// Short display label for a month, e.g. "Jan 2024".
pub fn month_label(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

/// Lower-cases a label and folds Spanish accents so keyword tables can be
/// written once in plain ASCII.
pub fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Mean of the values, or 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_month_end() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap();
        assert_eq!(
            next_month_end(date),
            NaiveDate::from_ymd_opt(2023, 2, 28)
        );

        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(
            next_month_end(date),
            NaiveDate::from_ymd_opt(2024, 1, 31)
        );
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2023, 2), NaiveDate::from_ymd_opt(2023, 2, 28));
        assert_eq!(last_day_of_month(2024, 2), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(last_day_of_month(2023, 4), NaiveDate::from_ymd_opt(2023, 4, 30));
        assert_eq!(last_day_of_month(2023, 13), None);
    }

    #[test]
    fn test_add_month_ends_crosses_years() {
        let date = NaiveDate::from_ymd_opt(2024, 11, 15).unwrap();
        assert_eq!(add_month_ends(date, 3), NaiveDate::from_ymd_opt(2025, 2, 28));
        assert_eq!(add_month_ends(date, 0), NaiveDate::from_ymd_opt(2024, 11, 30));
    }

    #[test]
    fn test_normalize_label_folds_accents() {
        assert_eq!(normalize_label("  SALDO MÍNIMO "), "saldo minimo");
        assert_eq!(normalize_label("Administración"), "administracion");
        assert_eq!(normalize_label("Año"), "ano");
    }
}
