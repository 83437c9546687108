use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::error::WikiError;

/// Envelope for every API response: the payload, or `None` plus an error message.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub status: &'static str,
    pub status_code: u16,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn reply<T>(
    status: StatusCode,
    data: Option<T>,
    kind: Option<&'static str>,
    message: Option<String>,
) -> Reply<T> {
    let meta = ResponseMeta {
        status: if status.is_success() { "success" } else { "error" },
        status_code: status.as_u16(),
        timestamp: Utc::now().to_rfc3339(),
        kind,
        message,
    };
    (status, Json(ApiResponse { data, meta }))
}

pub fn success<T: Serialize>(data: T) -> Reply<T> {
    reply(StatusCode::OK, Some(data), None, None)
}

pub fn error<T>(status: StatusCode, message: String) -> Reply<T> {
    reply(status, None, None, Some(message))
}

/// Error reply carrying the wiki error's status code and kind.
pub fn failure<T>(err: &WikiError) -> Reply<T> {
    reply(err.status_code(), None, Some(err.kind()), Some(err.to_string()))
}
