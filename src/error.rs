// region:    --- Imports
use crate::auction::AuctionError;
use crate::bidding::commands::ValidationError;
use crate::catalog::CatalogError;
use crate::chat::{ChatDenied, ChatError};
use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

// endregion: --- Imports

/// 오류 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Forbidden,
    Fatal,
}

// region:    --- Api Error
/// HTTP 응답용 오류. 본문은 {"error": ..., "code": ...}
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, code, message)
    }

    pub fn unauthenticated() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", "Login required")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{:<12} --> {} {}", "Response", self.code, self.message);
        }
        (
            self.status,
            Json(json!({"error": self.message, "code": self.code})),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "STORAGE",
            format!("Internal Server Error: {e}"),
        )
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        let code = match e {
            ValidationError::Missing => "MISSING",
            ValidationError::InvalidPrice(_) => "INVALID_PRICE",
        };
        ApiError::bad_request(code, e.to_string())
    }
}

impl From<AuctionError> for ApiError {
    fn from(e: AuctionError) -> Self {
        let code = e.code();
        let status = match (&e, e.kind()) {
            (AuctionError::Contention { .. }, _) => StatusCode::CONFLICT,
            (_, ErrorKind::Validation | ErrorKind::Conflict) => StatusCode::BAD_REQUEST,
            (_, ErrorKind::NotFound) => StatusCode::NOT_FOUND,
            (_, ErrorKind::Forbidden) => StatusCode::FORBIDDEN,
            (_, ErrorKind::Fatal) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, code, e.to_string())
    }
}

impl From<ChatDenied> for ApiError {
    fn from(e: ChatDenied) -> Self {
        let status = match e {
            ChatDenied::NoWinnerYet => StatusCode::BAD_REQUEST,
            _ => StatusCode::FORBIDDEN,
        };
        ApiError::new(status, e.code(), e.to_string())
    }
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::Denied(denied) => denied.into(),
            ChatError::Auction(err) => err.into(),
            ChatError::EmptyMessage => ApiError::bad_request("MISSING", e.to_string()),
            ChatError::WrongReceiver => ApiError::forbidden("WRONG_RECEIVER", e.to_string()),
            ChatError::Storage(err) => err.into(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        let status = match e.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, e.code(), e.to_string())
    }
}
// endregion: --- Api Error
