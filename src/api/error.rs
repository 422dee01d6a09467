//! HTTP mapping of [`Error`] and the JSON extractors that reject with it.

use crate::errors::Error;
use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

const INTERNAL_MESSAGE: &str = "Internal server error. Please try again.";

impl Error {
    /// HTTP status reported for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Config { .. } | Self::Database(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. }
            | Self::WrongStage { .. }
            | Self::UnknownCode
            | Self::CodeAlreadyUsed { .. }
            | Self::IncompleteBallot { .. }
            | Self::MissingCategories { .. }
            | Self::DuplicateCategory { .. }
            | Self::InvalidCategory { .. }
            | Self::InvalidCandidate { .. }
            | Self::NotAFinalist { .. }
            | Self::TooManyFinalists { .. }
            | Self::DuplicateCandidate { .. }
            | Self::WinnerNotSet
            | Self::Import { .. }
            | Self::Multipart(_)
            | Self::Json(_)
            | Self::Query(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("Request failed: {self}");
            INTERNAL_MESSAGE.to_string()
        } else {
            if status == StatusCode::UNAUTHORIZED {
                warn!("Rejected admin request with missing or wrong credentials");
            }
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// JSON body extractor whose rejection is an [`Error`], so malformed bodies get the
/// same `{"error": ...}` shape as every other failure.
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(Json), rejection(Error))]
pub struct Payload<T>(pub T);

/// Query string extractor rejecting with an [`Error`].
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(Query), rejection(Error))]
pub struct Params<T>(pub T);
