use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

use super::{current_session, issue_certificate, json_error, with_session_cookie};
use crate::certificate::OutputFormat;
use crate::roster::StudentCredentials;
use crate::state::AppState;

pub async fn check_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "operational",
        "students_loaded": state.roster.len().await,
        "timestamp": chrono::Local::now().to_rfc3339(),
    }))
}

pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(credentials): Json<StudentCredentials>,
) -> Response {
    let credentials = StudentCredentials {
        student_name: credentials.student_name.trim().to_string(),
        batch_number: credentials.batch_number.trim().to_string(),
        sixerclass_id: credentials.sixerclass_id.trim().to_string(),
    };

    let Some(student) = state.roster.find(&credentials).await else {
        warn!("Failed portal login for {}", credentials.sixerclass_id);
        return json_error(StatusCode::NOT_FOUND, "Student not found");
    };

    let existing = crate::session::token_from_headers(&headers);
    let student_id = student.sixerclass_id.clone();
    let token = state
        .sessions
        .upsert(existing.as_deref(), |s| s.student_id = Some(student_id))
        .await;
    info!("Student {} authenticated", student.sixerclass_id);

    with_session_cookie(
        &token,
        serde_json::json!({
            "success": true,
            "message": "Authentication successful",
            "student": student,
        }),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadRequest {
    format: Option<OutputFormat>,
}

pub async fn download_certificate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Option<Json<DownloadRequest>>,
) -> Response {
    let student_id = match current_session(&state, &headers).await {
        Some((_, session)) => session.student_id,
        None => None,
    };
    let Some(student_id) = student_id else {
        return json_error(StatusCode::UNAUTHORIZED, "Not authenticated");
    };
    // The record may have been edited or removed since login.
    let Some(student) = state.roster.get(&student_id).await else {
        return json_error(StatusCode::UNAUTHORIZED, "Not authenticated");
    };

    let format = request
        .and_then(|Json(r)| r.format)
        .unwrap_or(state.config.certificate.default_format);
    issue_certificate(&state, student, format).await
}

fn certificate_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^certificate_[A-Za-z0-9_-]+\.(pdf|png)$").expect("static pattern compiles")
    })
}

pub async fn serve_certificate(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Response {
    if !certificate_name_pattern().is_match(&filename) {
        return json_error(StatusCode::BAD_REQUEST, "Invalid filename");
    }

    let path = state.config.results_folder.join(&filename);
    let content = match tokio::fs::read(&path).await {
        Ok(content) => content,
        Err(_) => return json_error(StatusCode::NOT_FOUND, "File not found"),
    };

    let mime = mime_guess::from_path(&filename)
        .first_raw()
        .unwrap_or("application/octet-stream");
    super::attachment(&filename, mime, content).into_response()
}
