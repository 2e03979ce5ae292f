use crate::models::CellValue;
use calamine::Data;
use chrono::{Duration, NaiveDate, NaiveDateTime};

const TYPE_DETECTION_ROWS: usize = 100;
const TYPE_THRESHOLD: f64 = 0.8;

pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

pub fn is_supported_file_name(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

pub fn is_date_string(s: &str) -> bool {
    let date_formats = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M:%S"];

    let s = s.trim();
    date_formats
        .iter()
        .any(|format| NaiveDate::parse_from_str(s, format).is_ok())
        || datetime_formats
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(s, format).is_ok())
}

/// Classifies a column as "numeric", "date", "boolean", "string" or "empty"
/// from its first non-empty values.
pub fn detect_column_type<'a, I>(values: I) -> &'static str
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let mut numeric_count = 0;
    let mut date_count = 0;
    let mut bool_count = 0;
    let mut total_count = 0;

    for value in values
        .into_iter()
        .filter(|v| !v.is_empty())
        .take(TYPE_DETECTION_ROWS)
    {
        total_count += 1;
        match value {
            CellValue::Int(_) | CellValue::Float(_) => numeric_count += 1,
            CellValue::DateTime(_) => date_count += 1,
            CellValue::Text(s) if is_date_string(s) => date_count += 1,
            CellValue::Bool(_) => bool_count += 1,
            _ => {}
        }
    }

    if total_count == 0 {
        return "empty";
    }

    let threshold = total_count as f64 * TYPE_THRESHOLD;
    match () {
        _ if numeric_count as f64 >= threshold => "numeric",
        _ if date_count as f64 >= threshold => "date",
        _ if bool_count as f64 >= threshold => "boolean",
        _ => "string",
    }
}

/// Renders an elapsed time as `[-]HH:MM:SS`, with hours allowed past 24.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = (duration.num_milliseconds() as f64 / 1000.0).round() as i64;
    let sign = if total_seconds < 0 { "-" } else { "" };
    let total_seconds = total_seconds.abs();
    format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}

pub fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(d) if d.is_duration() => match d.as_duration() {
            Some(duration) => CellValue::Text(format_duration(duration)),
            None => CellValue::Float(d.as_f64()),
        },
        Data::DateTime(d) => match d.as_datetime() {
            Some(dt) => CellValue::DateTime(dt),
            None => CellValue::Float(d.as_f64()),
        },
        other => CellValue::Text(other.to_string()),
    }
}
