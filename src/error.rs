use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// A requested key column that a table does not have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingColumn {
    pub table: String,
    pub column: String,
    pub available_columns: Vec<String>,
}

impl fmt::Display for MissingColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' column not found in {}", self.column, self.table)
    }
}

fn describe_missing(missing: &[MissingColumn]) -> String {
    missing
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Sheet '{sheet}' not found")]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    #[error("{}", describe_missing(.0))]
    MissingColumns(Vec<MissingColumn>),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::Parse(_)
            | AppError::SheetNotFound { .. }
            | AppError::MissingColumns(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Export(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::Upload(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let message = self.to_string();
        let body = match self {
            AppError::SheetNotFound { sheet, available } => json!({
                "error": message,
                "sheet": sheet,
                "available_sheets": available,
            }),
            AppError::MissingColumns(missing) => json!({
                "error": message,
                "missing_columns": missing,
            }),
            _ => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_name_every_table() {
        let err = AppError::MissingColumns(vec![
            MissingColumn {
                table: "majors".to_string(),
                column: "bronco id".to_string(),
                available_columns: vec!["id".to_string()],
            },
            MissingColumn {
                table: "attendees".to_string(),
                column: "student id".to_string(),
                available_columns: vec!["name".to_string()],
            },
        ]);
        assert_eq!(
            err.to_string(),
            "'bronco id' column not found in majors; 'student id' column not found in attendees"
        );
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn io_errors_are_server_errors() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert!(matches!(err, AppError::Io(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn input_errors_are_client_errors() {
        assert_eq!(
            AppError::InvalidInput("no file".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Upload("cut".into()).status(), StatusCode::BAD_REQUEST);
    }
}
