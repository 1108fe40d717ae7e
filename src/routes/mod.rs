mod admin;
mod api;
mod pages;

pub use admin::*;
pub use api::*;
pub use pages::*;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::certificate::{CertificateError, OutputFormat};
use crate::roster::StudentRecord;
use crate::session::{self, Session};
use crate::state::AppState;

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn certificate_failure(e: &CertificateError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": "Certificate generation failed",
            "kind": e.kind(),
            "detail": e.to_string(),
        })),
    )
        .into_response()
}

/// Token and session data for the request's cookie, when it names a live
/// session.
async fn current_session(state: &AppState, headers: &HeaderMap) -> Option<(String, Session)> {
    let token = session::token_from_headers(headers)?;
    let found = state.sessions.get(&token).await?;
    Some((token, found))
}

async fn is_admin(state: &AppState, headers: &HeaderMap) -> bool {
    matches!(current_session(state, headers).await, Some((_, s)) if s.admin)
}

fn with_session_cookie(token: &str, body: serde_json::Value) -> Response {
    (
        [(header::SET_COOKIE, session::session_cookie(token))],
        Json(body),
    )
        .into_response()
}

fn attachment(filename: &str, content_type: &str, bytes: Vec<u8>) -> Response {
    axum::response::Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(axum::body::Body::from(bytes))
        .map(IntoResponse::into_response)
        .unwrap_or_else(|e| json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Renders off the async runtime and answers with the serve URL.
async fn issue_certificate(state: &AppState, record: StudentRecord, format: OutputFormat) -> Response {
    let generator = state.generator.clone();
    let sixerclass_id = record.sixerclass_id.clone();

    match tokio::task::spawn_blocking(move || generator.issue(&record, format)).await {
        Ok(Ok(issued)) => Json(serde_json::json!({
            "success": true,
            "download_url": format!("/api/serve-certificate/{}", issued.filename),
            "filename": issued.filename,
            "format": issued.format,
        }))
        .into_response(),
        Ok(Err(e)) => {
            tracing::error!("Certificate for {} failed [{}]: {}", sixerclass_id, e.kind(), e);
            certificate_failure(&e)
        }
        Err(e) => {
            tracing::error!("Certificate task for {} aborted: {}", sixerclass_id, e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Certificate generation failed")
        }
    }
}
