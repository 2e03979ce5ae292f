use serde::Serialize;
use smallvec::SmallVec;

pub const SAMPLE_SIZE: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub sample_values: SmallVec<[String; SAMPLE_SIZE]>,
    pub null_count: usize,
    pub unique_count: usize,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub has_duplicates: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TablePreview {
    pub sheet_names: Vec<String>,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    /// Likely identifier column, for pre-filling the key choice.
    pub suggested_key: Option<String>,
    pub sample_rows: Vec<Vec<String>>,
    pub column_info: Vec<ColumnInfo>,
    pub date_columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub text_columns: Vec<String>,
}
