use super::types::*;
use super::utils::detect_column_type;
use crate::models::{CellValue, Table};
use crate::services::comparator::suggest_key;
use smallvec::SmallVec;
use std::collections::HashSet;

pub struct TableAnalyzer {
    preview_rows: usize,
}

impl TableAnalyzer {
    pub fn new(preview_rows: usize) -> Self {
        Self { preview_rows }
    }

    pub fn analyze(&self, table: &Table, sheet_names: Vec<String>) -> TablePreview {
        let start = std::time::Instant::now();

        let mut date_columns = Vec::new();
        let mut numeric_columns = Vec::new();
        let mut text_columns = Vec::new();

        let column_info: Vec<ColumnInfo> = table
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let values: Vec<&CellValue> = table.column_values(idx).collect();
                let info = self.analyze_column(&values, name);
                match info.data_type.as_str() {
                    "date" => date_columns.push(name.clone()),
                    "numeric" => numeric_columns.push(name.clone()),
                    "string" => text_columns.push(name.clone()),
                    _ => {}
                }
                info
            })
            .collect();

        let sample_rows = table
            .rows()
            .iter()
            .take(self.preview_rows)
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();

        tracing::debug!(
            "Analyzed {} columns over {} rows in {:?}",
            table.column_count(),
            table.row_count(),
            start.elapsed()
        );

        TablePreview {
            sheet_names,
            row_count: table.row_count(),
            column_count: table.column_count(),
            columns: table.columns().to_vec(),
            suggested_key: suggest_key(table, None),
            sample_rows,
            column_info,
            date_columns,
            numeric_columns,
            text_columns,
        }
    }

    fn analyze_column(&self, values: &[&CellValue], name: &str) -> ColumnInfo {
        let mut null_count = 0;
        let mut non_null_count = 0;
        let mut seen = HashSet::new();
        let mut min_value: Option<String> = None;
        let mut max_value: Option<String> = None;

        for value in values {
            if value.is_empty() {
                null_count += 1;
                continue;
            }
            non_null_count += 1;
            let text = value.to_string();
            if min_value.as_ref().map_or(true, |min| text < *min) {
                min_value = Some(text.clone());
            }
            if max_value.as_ref().map_or(true, |max| text > *max) {
                max_value = Some(text.clone());
            }
            seen.insert(text);
        }

        let sample_values: SmallVec<[String; SAMPLE_SIZE]> = values
            .iter()
            .filter(|value| !value.is_empty())
            .take(SAMPLE_SIZE)
            .map(|value| value.to_string())
            .collect();

        ColumnInfo {
            name: name.to_string(),
            data_type: detect_column_type(values.iter().copied()).to_string(),
            sample_values,
            null_count,
            unique_count: seen.len(),
            min_value,
            max_value,
            has_duplicates: seen.len() < non_null_count,
        }
    }
}
