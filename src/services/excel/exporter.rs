use crate::error::AppError;
use crate::models::{format_datetime, CellValue, Table};
use std::io::Cursor;

const MAX_SHEET_NAME_LEN: usize = 31;
const FORBIDDEN_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];
/// Largest integer an Excel number cell (an f64) holds exactly.
const MAX_EXACT_NUMBER: u64 = 1 << 53;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub fn validate_sheet_name(sheet_name: &str) -> Result<(), AppError> {
    let len = sheet_name.chars().count();
    if len == 0 || len > MAX_SHEET_NAME_LEN {
        return Err(AppError::InvalidInput(format!(
            "Sheet name must be 1 to {} characters, got {}",
            MAX_SHEET_NAME_LEN, len
        )));
    }
    if sheet_name.contains(&FORBIDDEN_SHEET_CHARS[..]) {
        return Err(AppError::InvalidInput(format!(
            "Sheet name '{}' contains one of {:?}",
            sheet_name, FORBIDDEN_SHEET_CHARS
        )));
    }
    Ok(())
}

/// Writes `table` into a single-sheet `.xlsx` workbook and returns its bytes.
pub fn export_table(table: &Table, sheet_name: &str) -> Result<Vec<u8>, AppError> {
    validate_sheet_name(sheet_name)?;

    let mut book = umya_spreadsheet::new_file_empty_worksheet();
    let worksheet = book
        .new_sheet(sheet_name)
        .map_err(|e| AppError::Export(format!("Failed to create sheet '{}': {}", sheet_name, e)))?;

    for (col_idx, name) in table.columns().iter().enumerate() {
        worksheet
            .get_cell_mut(((col_idx + 1) as u32, 1))
            .set_value_string(name.as_str());
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let excel_row = (row_idx + 2) as u32;
        for (col_idx, value) in row.iter().enumerate() {
            let coordinate = ((col_idx + 1) as u32, excel_row);
            match value {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    worksheet.get_cell_mut(coordinate).set_value_string(s.as_str());
                }
                CellValue::Int(i) if i.unsigned_abs() <= MAX_EXACT_NUMBER => {
                    worksheet.get_cell_mut(coordinate).set_value_number(*i as f64);
                }
                CellValue::Int(i) => {
                    worksheet.get_cell_mut(coordinate).set_value_string(i.to_string());
                }
                CellValue::Float(f) => {
                    worksheet.get_cell_mut(coordinate).set_value_number(*f);
                }
                CellValue::Bool(b) => {
                    worksheet.get_cell_mut(coordinate).set_value_bool(*b);
                }
                CellValue::DateTime(dt) => {
                    worksheet
                        .get_cell_mut(coordinate)
                        .set_value_string(format_datetime(dt));
                }
            }
        }
    }

    let mut cursor = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut cursor).map_err(|e| {
        tracing::error!("Failed to write workbook: {}", e);
        AppError::Export(format!("Failed to write workbook: {}", e))
    })?;

    let bytes = cursor.into_inner();
    tracing::info!(
        "Exported {} rows to sheet {} ({}KB)",
        table.row_count(),
        sheet_name,
        bytes.len() / 1024
    );
    Ok(bytes)
}
