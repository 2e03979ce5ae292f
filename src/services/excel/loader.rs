use super::utils::cell_from_data;
use crate::error::AppError;
use crate::models::{normalize_column_name, CellValue, Table};
use bytes::Bytes;
use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use std::collections::HashSet;
use std::io::Cursor;

/// An uploaded workbook, opened once and read sheet by sheet.
pub struct SpreadsheetFile {
    workbook: Sheets<Cursor<Bytes>>,
    sheet_names: Vec<String>,
}

impl SpreadsheetFile {
    pub fn open(file_data: Bytes) -> Result<Self, AppError> {
        let start = std::time::Instant::now();
        let workbook = open_workbook_auto_from_rs(Cursor::new(file_data)).map_err(|e| {
            tracing::error!("Failed to open spreadsheet: {}", e);
            AppError::Parse(format!("Failed to open spreadsheet: {}", e))
        })?;
        let sheet_names = workbook.sheet_names().to_vec();
        tracing::info!(
            "Workbook opened in {:?}, found {} sheets: {:?}",
            start.elapsed(),
            sheet_names.len(),
            sheet_names
        );

        Ok(Self { workbook, sheet_names })
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    /// Reads `sheet_name` into a table whose header is the first row of the
    /// sheet's used range.
    pub fn load_table(&mut self, sheet_name: &str) -> Result<Table, AppError> {
        if !self.sheet_names.iter().any(|name| name == sheet_name) {
            return Err(AppError::SheetNotFound {
                sheet: sheet_name.to_string(),
                available: self.sheet_names.clone(),
            });
        }

        let range = self.workbook.worksheet_range(sheet_name).map_err(|e| {
            tracing::error!("Failed to read worksheet {}: {}", sheet_name, e);
            AppError::Parse(format!("Failed to read worksheet '{}': {}", sheet_name, e))
        })?;

        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(header_row) => build_headers(header_row),
            None => {
                tracing::warn!("Sheet {} is empty", sheet_name);
                return Ok(Table::default());
            }
        };

        let data: Vec<Vec<CellValue>> = rows
            .map(|row| row.iter().map(cell_from_data).collect::<Vec<_>>())
            .filter(|row: &Vec<CellValue>| !row.iter().all(CellValue::is_empty))
            .collect();

        tracing::info!(
            "Loaded sheet {} with {} rows and {} columns",
            sheet_name,
            data.len(),
            headers.len()
        );
        Ok(Table::new(headers, data))
    }
}

/// Normalizes header cells, naming blanks `unnamed: <index>` and suffixing
/// repeats with `.1`, `.2`, ...
fn build_headers(header_row: &[Data]) -> Vec<String> {
    let mut existing_names = HashSet::new();
    header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let name = normalize_column_name(&cell.to_string());
            let base = if name.is_empty() {
                format!("unnamed: {}", idx)
            } else {
                name
            };

            let mut candidate = base.clone();
            let mut counter = 1;
            while !existing_names.insert(candidate.clone()) {
                candidate = format!("{}.{}", base, counter);
                counter += 1;
            }
            candidate
        })
        .collect()
}
