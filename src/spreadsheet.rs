// Roster spreadsheet codec: first worksheet, header row naming the five columns.
use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use rust_xlsxwriter::{Workbook, XlsxError};
use std::io::Cursor;
use thiserror::Error;

use crate::certificate::DateValue;
use crate::roster::{StudentRecord, REQUIRED_COLUMNS};

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("could not read spreadsheet: {0}")]
    Read(String),
    #[error("could not write spreadsheet: {0}")]
    Write(#[from] XlsxError),
    #[error("Missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),
    #[error("spreadsheet has no header row")]
    EmptySheet,
}

/// Reads every non-empty data row. Columns are matched by header name, so
/// their order and any extra columns do not matter. Blank cells are kept
/// blank; validation is the roster's job.
pub fn read_records(bytes: &[u8]) -> Result<Vec<StudentRecord>, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| SpreadsheetError::Read(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::EmptySheet)?
        .map_err(|e| SpreadsheetError::Read(e.to_string()))?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or(SpreadsheetError::EmptySheet)?
        .iter()
        .map(|cell| cell_text(cell).trim().to_string())
        .collect();

    let mut columns = [0usize; 5];
    let mut missing = Vec::new();
    for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
        match header.iter().position(|h| h == name) {
            Some(index) => *slot = index,
            None => missing.push(name),
        }
    }
    if !missing.is_empty() {
        return Err(SpreadsheetError::MissingColumns(missing));
    }

    let records = rows
        .filter(|row| !row.iter().all(is_blank))
        .map(|row| {
            let text = |column: usize| row.get(columns[column]).map(cell_text).unwrap_or_default();
            StudentRecord {
                student_name: text(0),
                batch_number: text(1),
                batch_start_date: DateValue::parse(text(2).trim()),
                batch_end_date: DateValue::parse(text(3).trim()),
                sixerclass_id: text(4),
            }
        })
        .collect();
    Ok(records)
}

/// Writes the roster as a single-sheet xlsx workbook. Dates are written as
/// ISO text so they read back unchanged.
pub fn write_records(records: &[StudentRecord]) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in REQUIRED_COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }
    for (index, record) in records.iter().enumerate() {
        let row = index as u32 + 1;
        sheet.write_string(row, 0, record.student_name.as_str())?;
        sheet.write_string(row, 1, record.batch_number.as_str())?;
        sheet.write_string(row, 2, record.batch_start_date.to_string())?;
        sheet.write_string(row, 3, record.batch_end_date.to_string())?;
        sheet.write_string(row, 4, record.sixerclass_id.as_str())?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // Numeric ids and batch numbers come back as floats.
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
