pub mod economy;
pub mod proposals;
pub mod standings;
pub mod system;

pub use economy::*;
pub use proposals::*;
pub use standings::*;
pub use system::*;

use axum::{http::StatusCode, Json};

use crate::api::types::ErrorResponse;
use crate::error::{ErrorKind, MatchbookError};

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Map a domain error onto a status code with a readable reason
pub fn api_error(err: MatchbookError) -> ApiError {
    let (status, error) = match err.kind() {
        ErrorKind::Validation => (StatusCode::BAD_REQUEST, "validation"),
        ErrorKind::Authorization => (StatusCode::FORBIDDEN, "authorization"),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        ErrorKind::Conflict => (StatusCode::CONFLICT, "conflict"),
        ErrorKind::Storage | ErrorKind::ExternalIo => {
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
        ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };
    if status.is_server_error() {
        tracing::error!("API request failed: {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            reason: err.to_string(),
        }),
    )
}

pub fn bad_request(reason: impl Into<String>) -> ApiError {
    api_error(MatchbookError::Validation(reason.into()))
}
