//! Loads the first worksheet of an uploaded file into a [`RawSheet`].

use crate::error::{Result, SheetIntakeError};
use crate::schema::{CellValue, RawSheet};
use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::NaiveDate;
use log::{debug, info};
use std::io::Cursor;

/// Reads `bytes` as a spreadsheet and returns its first worksheet.
///
/// The format is chosen from the extension of `file_name`: `.csv` goes through
/// the CSV reader, everything else through calamine's auto-detection
/// (xlsx, xlsm, xlsb, xls, ods).
pub fn load_first_sheet(bytes: &[u8], file_name: &str) -> Result<RawSheet> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let sheet = if extension == "csv" {
        read_csv(bytes)?
    } else {
        read_workbook(bytes)?
    };

    info!(
        "Loaded '{}': {} rows x {} columns",
        file_name,
        sheet.row_count(),
        sheet.width()
    );
    Ok(sheet)
}

fn read_workbook(bytes: &[u8]) -> Result<RawSheet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SheetIntakeError::Workbook("Workbook has no worksheets".to_string()))??;

    // Ranges start at the first used cell; pad so indices match the sheet.
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    debug!("First used cell at row {}, column {}", row_offset, col_offset);

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
    for source_row in range.rows() {
        let mut row = vec![CellValue::Empty; col_offset];
        row.extend(source_row.iter().map(convert_cell));
        rows.push(row);
    }

    Ok(RawSheet::new(rows))
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(CellValue::Date)
            .unwrap_or(CellValue::Empty),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn read_csv(bytes: &[u8]) -> Result<RawSheet> {
    let delimiter = sniff_delimiter(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(convert_csv_field).collect());
    }

    Ok(RawSheet::new(rows))
}

fn convert_csv_field(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        return CellValue::Number(n);
    }
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return CellValue::Date(d);
    }
    CellValue::Text(trimmed.to_string())
}

/// Spanish-locale exports use `;` because `,` is the decimal mark.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or(&[]);
    let semicolons = first_line.iter().filter(|b| **b == b';').count();
    let commas = first_line.iter().filter(|b| **b == b',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_cells_are_typed() {
        let csv = "Description,2024-01-31,Feb 2024\nTotal Income,1000,\"1,500.50\"\n";
        let sheet = load_first_sheet(csv.as_bytes(), "export.CSV").unwrap();
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(
            sheet.cell(0, 1),
            &CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
        );
        assert_eq!(sheet.cell(1, 1), &CellValue::Number(1000.0));
        assert_eq!(sheet.cell(1, 2).number(), Some(1500.5));
    }

    #[test]
    fn test_semicolon_csv() {
        let csv = "Concepto;Ene-24;Feb-24\nVentas;1.234,56;2.000,00\n";
        let sheet = load_first_sheet(csv.as_bytes(), "flujo.csv").unwrap();
        assert_eq!(sheet.width(), 3);
        assert_eq!(sheet.cell(1, 1).number(), Some(1234.56));
    }

    #[test]
    fn test_garbage_workbook_is_an_error() {
        let result = load_first_sheet(b"definitely not a zip archive", "report.xlsx");
        assert!(matches!(result, Err(SheetIntakeError::Workbook(_))));
    }
}
