use axum::{
    extract::{Multipart, State},
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::AppError,
    models::{CellValue, Table},
    services::{
        comparator::{self, Comparison, ComparisonSummary, KeyWarning},
        excel::{
            exporter::XLSX_CONTENT_TYPE, export_table, utils::is_supported_file_name,
            SpreadsheetFile, TableAnalyzer, types::TablePreview,
        },
    },
    AppState,
};

const UPLOAD_FIELDS: [&str; 3] = ["file", "majors_file", "attendees_file"];

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/sheets/preview", post(preview_sheet))
        .route("/compare", post(compare_sheets))
        .route("/compare/export", post(export_comparison))
        .layer(cors)
}

#[derive(Debug)]
struct Upload {
    file_name: Option<String>,
    data: Bytes,
}

/// Multipart fields split into uploaded files and plain text values.
#[derive(Debug, Default)]
struct FormFields {
    uploads: HashMap<String, Upload>,
    values: HashMap<String, String>,
}

impl FormFields {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = FormFields::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                tracing::warn!("Skipping unnamed multipart field");
                continue;
            };

            if UPLOAD_FIELDS.contains(&name.as_str()) {
                let file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await?;
                tracing::info!(
                    "Received upload {} ({:?}), size: {}KB",
                    name,
                    file_name,
                    data.len() / 1024
                );
                form.uploads.insert(name, Upload { file_name, data });
            } else {
                let value = field.text().await?;
                form.values.insert(name, value);
            }
        }

        Ok(form)
    }

    fn take_upload(&mut self, name: &str) -> Result<Upload, AppError> {
        let upload = self
            .uploads
            .remove(name)
            .ok_or_else(|| AppError::InvalidInput(format!("No {} provided", name)))?;

        if upload.data.is_empty() {
            return Err(AppError::InvalidInput(format!("{} is empty", name)));
        }
        if let Some(file_name) = &upload.file_name {
            if !is_supported_file_name(file_name) {
                return Err(AppError::InvalidInput(format!(
                    "Unsupported file type for {}: {}; only Excel or ODS spreadsheets are accepted",
                    name, file_name
                )));
            }
        }
        Ok(upload)
    }

    /// Trimmed value of a text field; blank counts as absent.
    fn value(&self, name: &str) -> Option<String> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn value_or(&self, name: &str, default: &str) -> String {
        self.value(name).unwrap_or_else(|| default.to_string())
    }
}

/// An explicit key wins, then a detected identifier column, then `default`.
fn choose_key(
    explicit: Option<String>,
    table: &Table,
    preferred: Option<&str>,
    default: &str,
) -> String {
    explicit
        .or_else(|| comparator::suggest_key(table, preferred))
        .unwrap_or_else(|| default.to_string())
}

fn load_upload(upload: Upload, sheet: &str) -> Result<(Vec<String>, Table), AppError> {
    let mut file = SpreadsheetFile::open(upload.data)?;
    let table = file.load_table(sheet)?;
    Ok((file.sheet_names().to_vec(), table))
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    file_name: Option<String>,
    sheet: String,
    #[serde(flatten)]
    preview: TablePreview,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    summary: ComparisonSummary,
    warnings: Vec<KeyWarning>,
    all_attendees_matched: bool,
    majors_at_event_column: String,
    majors_at_event_names: Vec<String>,
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

async fn preview_sheet(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<PreviewResponse>, AppError> {
    let start = std::time::Instant::now();
    let mut form = FormFields::read(multipart).await?;
    let upload = form.take_upload("file")?;
    let file_name = upload.file_name.clone();
    let sheet = form.value_or("sheet", &state.config.default_sheet);

    tracing::info!("Previewing sheet {} of {:?}", sheet, file_name);
    let (sheet_names, table) = load_upload(upload, &sheet)?;
    let preview = TableAnalyzer::new(state.config.preview_rows).analyze(&table, sheet_names);
    tracing::info!("Preview completed in {:?}", start.elapsed());

    Ok(Json(PreviewResponse {
        file_name,
        sheet,
        preview,
    }))
}

/// Reads both uploads and runs the comparison on the requested sheets and keys.
async fn run_comparison(state: &AppState, multipart: Multipart) -> Result<Comparison, AppError> {
    let config = &state.config;
    let mut form = FormFields::read(multipart).await?;

    let majors_upload = form.take_upload("majors_file")?;
    let attendees_upload = form.take_upload("attendees_file")?;
    let majors_sheet = form.value_or("majors_sheet", &config.default_sheet);
    let attendees_sheet = form.value_or("attendees_sheet", &config.default_sheet);

    tracing::info!("Loading majors sheet {}", majors_sheet);
    let (_, majors) = load_upload(majors_upload, &majors_sheet)?;
    tracing::info!("Loaded {} majors", majors.row_count());

    tracing::info!("Loading attendees sheet {}", attendees_sheet);
    let (_, attendees) = load_upload(attendees_upload, &attendees_sheet)?;
    tracing::info!("Loaded {} attendees", attendees.row_count());

    let majors_key = choose_key(
        form.value("majors_key"),
        &majors,
        None,
        &config.default_key_column,
    );
    let attendees_key = choose_key(
        form.value("attendees_key"),
        &attendees,
        Some(&majors_key),
        &config.default_key_column,
    );
    tracing::info!("Comparing on keys {} / {}", majors_key, attendees_key);

    comparator::compare(&majors, &majors_key, &attendees, &attendees_key)
}

async fn compare_sheets(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<CompareResponse>, AppError> {
    let start = std::time::Instant::now();
    let comparison = run_comparison(&state, multipart).await?;
    tracing::info!("Comparison completed in {:?}", start.elapsed());

    let all_attendees_matched = comparison.all_attendees_matched();
    let Comparison {
        unmatched,
        summary,
        attending_majors,
        warnings,
    } = comparison;

    Ok(Json(CompareResponse {
        summary,
        warnings,
        all_attendees_matched,
        majors_at_event_column: attending_majors.column,
        majors_at_event_names: attending_majors.values,
        columns: unmatched.columns().to_vec(),
        rows: unmatched.rows().to_vec(),
    }))
}

async fn export_comparison(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let start = std::time::Instant::now();
    let comparison = run_comparison(&state, multipart).await?;
    let workbook = export_table(&comparison.unmatched, &state.config.result_sheet_name)?;

    let file_name = state.config.result_file_name.replace(['"', '\\'], "");
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .map_err(|e| AppError::InvalidInput(format!("Invalid result file name: {}", e)))?;

    tracing::info!("Export completed in {:?}", start.elapsed());
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        workbook,
    ))
}
