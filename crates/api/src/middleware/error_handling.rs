//! # Error Handling Middleware
//!
//! Maps booking-core failures and request-level problems onto HTTP status
//! codes with a `{"error": "..."}` JSON body, so every endpoint fails the
//! same way.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use slotbook_core::errors::{BookingError, ErrorKind};
use tracing::error;

/// Application error wrapper that provides HTTP status code mapping
///
/// # Example
///
/// ```ignore
/// async fn handler(
///     State(state): State<Arc<ApiState>>,
///     Path(id): Path<Uuid>,
/// ) -> Result<Json<GetSlotResponse>, AppError> {
///     let slot = state.services.slots.get_slot(id).await?;
///     Ok(Json(GetSlotResponse { slot }))
/// }
/// ```
#[derive(Debug)]
pub enum AppError {
    Booking(BookingError),
    /// The caller could not be identified.
    Unauthenticated(String),
    /// The request could not be decoded.
    BadRequest(String),
    Internal(eyre::Report),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Booking(err) => match err.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Booking(err) => err.to_string(),
            AppError::Unauthenticated(msg) => format!("Authentication error: {}", msg),
            AppError::BadRequest(msg) => format!("Bad request: {}", msg),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

/// Converts application errors to HTTP responses
///
/// Server-side failures are logged in full and answered with a generic
/// message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            match &self {
                AppError::Internal(report) => error!("Request failed: {:?}", report),
                other => error!("Request failed: {}", other.message()),
            }
        }

        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.message()
        };
        let body = Json(json!({ "error": message }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError::Booking(err)
    }
}

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError::Internal(err)
    }
}

/// Maps a BookingError straight to an HTTP response
pub fn map_error(err: BookingError) -> Response {
    AppError::from(err).into_response()
}
