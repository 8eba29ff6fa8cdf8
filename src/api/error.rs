//! Mapping of sale errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::error::{ErrorKind, SaleError};

/// A `SaleError` on its way out through the REST API.
#[derive(Debug)]
pub struct ApiError(pub SaleError);

impl From<SaleError> for ApiError {
    fn from(err: SaleError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::ClientError => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "sale request failed");
            return (status, "Internal server error.").into_response();
        }

        warn!(status = status.as_u16(), error = %self.0, "sale request rejected");
        (status, self.0.to_string()).into_response()
    }
}
