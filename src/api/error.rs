//--------------------------------------------------------------------------------------------------
// ENUMS
//--------------------------------------------------------------------------------------------------
// | Name            | Description                                      | Key Methods         |
// |-----------------|--------------------------------------------------|---------------------|
// | ApiError        | Error types for the API                          | from, into_response |
//--------------------------------------------------------------------------------------------------

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::orders::OrderError;
use crate::store::StoreError;
use crate::AuthError;

/// Type alias for Result with ApiError
pub type ApiResult<T> = Result<T, ApiError>;

/// API-specific error types. Every variant renders the marketplace error envelope
/// `{success: false, error, error_message?}`; `error_message` carries store-level
/// detail for diagnostics and is omitted when there is none.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// Malformed parameters or a business-rule rejection before any mutation.
    #[error("{0}")]
    BadRequest(String),

    /// The addressed resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Sign-in rejected.
    #[error("{0}")]
    Unauthorized(String),

    /// A store precondition rejected the statement mid-flow.
    #[error("{message}")]
    PreconditionFailed {
        message: String,
        detail: Option<String>,
    },

    /// The originating order was persisted but settlement failed; callers must be able
    /// to tell this apart from a blanket failure.
    #[error("{message}")]
    SettlementFailed { message: String, detail: String },

    /// Store or transport failure.
    #[error("{message}")]
    Internal { message: String, detail: String },
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::PreconditionFailed { .. } => StatusCode::PRECONDITION_FAILED,
            Self::SettlementFailed { .. } => StatusCode::BAD_REQUEST,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Option<&str> {
        match self {
            Self::PreconditionFailed { detail, .. } => detail.as_deref(),
            Self::SettlementFailed { detail, .. } => Some(detail),
            Self::Internal { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let mut body = json!({
            "success": false,
            "error": self.to_string(),
        });
        if let Some(detail) = self.detail() {
            body["error_message"] = json!(detail);
        }

        (status, Json(body)).into_response()
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NonPositivePrice
            | OrderError::DuplicateOrder(_)
            | OrderError::TicketRequired
            | OrderError::AlreadyOwnsTicket => Self::BadRequest(err.to_string()),
            OrderError::NotFound(_) => Self::NotFound(err.to_string()),
            OrderError::ListingFailed(ref source) => Self::PreconditionFailed {
                message: err.to_string(),
                detail: Some(source.to_string()),
            },
            OrderError::Store(source) => Self::Internal {
                message: "error accessing store".to_string(),
                detail: source.to_string(),
            },
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal {
            message: "error accessing store".to_string(),
            detail: err.to_string(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Internal {
            message: "internal server error".to_string(),
            detail: err.to_string(),
        }
    }
}
