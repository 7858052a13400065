use crate::alerts::{AlertJobError, InboxError};
use crate::config::ConfigError;
use crate::ledger::store::StoreError;
use crate::ledger::LedgerError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Csv(csv::Error),
    Ledger(LedgerError),
    AlertJob(AlertJobError),
    Inbox(InboxError),
    Unauthorized(&'static str),
    Task(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Csv(err) => write!(f, "csv error: {}", err),
            AppError::Ledger(err) => write!(f, "{}", err),
            AppError::AlertJob(err) => write!(f, "alert job error: {}", err),
            AppError::Inbox(err) => write!(f, "{}", err),
            AppError::Unauthorized(reason) => write!(f, "unauthorized: {}", reason),
            AppError::Task(err) => write!(f, "background task failed: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Csv(err) => Some(err),
            AppError::Ledger(err) => Some(err),
            AppError::AlertJob(err) => Some(err),
            AppError::Inbox(err) => Some(err),
            AppError::Unauthorized(_) | AppError::Task(_) => None,
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Ledger(err) => ledger_status(err),
            AppError::Inbox(InboxError::AlertNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Inbox(InboxError::Store(err)) => store_status(err),
            AppError::AlertJob(AlertJobError::Ledger(err)) => match ledger_status(err) {
                StatusCode::SERVICE_UNAVAILABLE => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::AlertJob(AlertJobError::Store(err)) => store_status(err),
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Csv(_)
            | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn ledger_status(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
        LedgerError::ProviderNotFound(_)
        | LedgerError::AccountNotFound(_)
        | LedgerError::UnitNotFound(_)
        | LedgerError::RecordNotFound => StatusCode::NOT_FOUND,
        LedgerError::ProviderInactive(_)
        | LedgerError::AccountNotActive(_)
        | LedgerError::InvalidAccountTransition { .. }
        | LedgerError::UnitNotActive(_)
        | LedgerError::ListingAlreadyFloored(_)
        | LedgerError::InsufficientCredit { .. }
        | LedgerError::Conflict => StatusCode::CONFLICT,
        LedgerError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::PartialWriteDetected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::Conflict => StatusCode::CONFLICT,
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::PartialWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<LedgerError> for AppError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

impl From<AlertJobError> for AppError {
    fn from(value: AlertJobError) -> Self {
        Self::AlertJob(value)
    }
}

impl From<InboxError> for AppError {
    fn from(value: InboxError) -> Self {
        Self::Inbox(value)
    }
}
