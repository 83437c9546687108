use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::api::response;

/// Failures surfaced by the wiki client.
///
/// Field-level extraction problems never show up here; they are collected into
/// `parsing_warnings` on the extracted record instead.
#[derive(Debug, thiserror::Error)]
pub enum WikiError {
    #[error("Page '{title}' not found on the wiki. Try `search` first to find the exact page title.")]
    PageNotFound { title: String },

    #[error("Network error requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Reserved for a total extraction failure; extractors degrade instead of raising it.
    #[error("Failed to parse page '{page_title}': {reason}")]
    Parse { page_title: String, reason: String },

    #[error("Page '{source_page}' is a redirect to '{target_page}', which redirects again")]
    Redirect { source_page: String, target_page: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Unexpected error: {0}")]
    Unexpected(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WikiError {
    /// Short machine-readable tag for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            WikiError::PageNotFound { .. } => "page_not_found",
            WikiError::Network { .. } => "network",
            WikiError::Parse { .. } => "parse",
            WikiError::Redirect { .. } => "redirect",
            WikiError::InvalidInput(_) => "invalid_input",
            WikiError::Cancelled => "cancelled",
            WikiError::Unexpected(_) => "unexpected",
            WikiError::Config(_) => "config",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WikiError::PageNotFound { .. } => StatusCode::NOT_FOUND,
            WikiError::Network { .. } => StatusCode::BAD_GATEWAY,
            WikiError::Parse { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            WikiError::Redirect { .. } => StatusCode::CONFLICT,
            WikiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            WikiError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            WikiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WikiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WikiError {
    fn into_response(self) -> Response {
        response::failure::<()>(&self).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WikiError>;
