use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use shared::constants::*;
use validator::{ValidationError, ValidationErrors};

use crate::storage::StorageError;

/// Configuration-mutating operations that are refused while the wheel spins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockedAction {
    UpdateConfig,
    Reset,
    SwitchPage,
}

impl LockedAction {
    fn message(self) -> &'static str {
        match self {
            Self::UpdateConfig => UPDATE_CONFIG_LOCKED_ERROR,
            Self::Reset => RESET_LOCKED_ERROR,
            Self::SwitchPage => SWITCH_PAGE_LOCKED_ERROR,
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    SpinInProgress { action: LockedAction, elapsed: Duration },
    SpinAlreadyInProgress,
    NoSpinsRemaining,
    NotFound(String),
    Storage(StorageError),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Invalid(message) => AppError::Validation(format!("Failed to save config: {}", message)),
            not_found @ StorageError::NotFound { .. } => AppError::NotFound(not_found.to_string()),
            other => AppError::Storage(other),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(shared::validation::message_of(&err))
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(shared::validation::describe(&errors))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request: {}", rejection.body_text()))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) | Self::NotFound(message) => f.write_str(message),
            Self::SpinInProgress { action, .. } => f.write_str(action.message()),
            Self::SpinAlreadyInProgress => f.write_str(SPIN_ALREADY_IN_PROGRESS_ERROR),
            Self::NoSpinsRemaining => f.write_str(NO_SPINS_REMAINING_ERROR),
            Self::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::SpinInProgress { action, elapsed } => (
                StatusCode::LOCKED,
                json!({
                    "error": action.message(),
                    "spinning": true,
                    "spin_time": elapsed.as_secs_f64(),
                }),
            ),
            Self::Validation(_) | Self::SpinAlreadyInProgress | Self::NoSpinsRemaining => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
            }
            Self::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": self.to_string() })),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": self.to_string() })),
        };

        (status, Json(body)).into_response()
    }
}

/// `Json` extractor whose rejections come back as 400 `{"error": ...}`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
