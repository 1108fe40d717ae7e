use axum::{
    extract::{Multipart, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{attachment, current_session, is_admin, issue_certificate, json_error, with_session_cookie};
use crate::certificate::{DateValue, OutputFormat};
use crate::roster::{RosterError, StudentRecord};
use crate::session;
use crate::spreadsheet::{self, SpreadsheetError};
use crate::state::AppState;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const REPORTED_IMPORT_ERRORS: usize = 5;

#[derive(Debug, Deserialize)]
pub struct AdminLogin {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// Student fields as posted by the console. Absent fields arrive blank and
/// are rejected by the roster with the field's name.
#[derive(Debug, Default, Deserialize)]
pub struct StudentForm {
    #[serde(default)]
    student_name: String,
    #[serde(default)]
    batch_number: String,
    #[serde(default)]
    batch_start_date: String,
    #[serde(default)]
    batch_end_date: String,
    #[serde(default)]
    sixerclass_id: String,
}

impl From<StudentForm> for StudentRecord {
    fn from(form: StudentForm) -> Self {
        StudentRecord {
            student_name: form.student_name,
            batch_number: form.batch_number,
            batch_start_date: DateValue::parse(form.batch_start_date.trim()),
            batch_end_date: DateValue::parse(form.batch_end_date.trim()),
            sixerclass_id: form.sixerclass_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    #[serde(default)]
    original_sixerclass_id: String,
    #[serde(flatten)]
    student: StudentForm,
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    sixerclass_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    student: StudentForm,
    format: Option<OutputFormat>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    search: Option<String>,
}

fn unauthorized() -> Response {
    json_error(StatusCode::UNAUTHORIZED, "Unauthorized")
}

fn roster_failure(e: RosterError) -> Response {
    let status = match e {
        RosterError::NotFound => StatusCode::NOT_FOUND,
        RosterError::DuplicateId(_) | RosterError::MissingField(_) => StatusCode::BAD_REQUEST,
    };
    json_error(status, e.to_string())
}

pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(login): Json<AdminLogin>,
) -> Response {
    if login.username != state.config.admin_username || login.password != state.config.admin_password {
        warn!("Failed admin login for {:?}", login.username);
        return json_error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    let existing = session::token_from_headers(&headers);
    let token = state.sessions.upsert(existing.as_deref(), |s| s.admin = true).await;
    info!("Admin {} logged in", login.username);
    with_session_cookie(
        &token,
        serde_json::json!({ "success": true, "message": "Login successful" }),
    )
}

pub async fn admin_logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some((token, _)) = current_session(&state, &headers).await {
        state.sessions.remove(&token).await;
    }
    (
        [(header::SET_COOKIE, session::expired_cookie())],
        Json(serde_json::json!({ "success": true, "message": "Logged out" })),
    )
        .into_response()
}

pub async fn list_students(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Response {
    if !is_admin(&state, &headers).await {
        return unauthorized();
    }
    let students = state.roster.list(query.search.as_deref()).await;
    Json(serde_json::json!({
        "success": true,
        "total": students.len(),
        "students": students,
    }))
    .into_response()
}

pub async fn export_students(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if !is_admin(&state, &headers).await {
        return unauthorized();
    }
    let students = state.roster.list(None).await;
    match spreadsheet::write_records(&students) {
        Ok(bytes) => {
            let filename = format!(
                "students_export_{}.xlsx",
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            );
            info!("Exported {} students to {}", students.len(), filename);
            attachment(&filename, XLSX_MIME, bytes)
        }
        Err(e) => {
            error!("Roster export failed: {}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Export failed: {}", e))
        }
    }
}

pub async fn import_students(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !is_admin(&state, &headers).await {
        return unauthorized();
    }

    let mut upload: Option<(String, Vec<u8>)> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return json_error(StatusCode::BAD_REQUEST, format!("Upload failed: {}", e)),
        };
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("").to_string();
        match field.bytes().await {
            Ok(data) => upload = Some((filename, data.to_vec())),
            Err(e) => return json_error(StatusCode::BAD_REQUEST, format!("Upload failed: {}", e)),
        }
    }

    let (filename, data) = match upload {
        Some((name, data)) if !name.is_empty() && !data.is_empty() => (name, data),
        _ => return json_error(StatusCode::BAD_REQUEST, "No file uploaded"),
    };
    let lower = filename.to_lowercase();
    if !(lower.ends_with(".xlsx") || lower.ends_with(".xls")) {
        return json_error(
            StatusCode::BAD_REQUEST,
            "Invalid file type. Please upload an Excel file (.xlsx or .xls)",
        );
    }

    let rows = match spreadsheet::read_records(&data) {
        Ok(rows) => rows,
        Err(e @ SpreadsheetError::MissingColumns(_)) => {
            return json_error(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => return json_error(StatusCode::BAD_REQUEST, format!("Error reading file: {}", e)),
    };

    let outcome = state.roster.import(rows).await;
    info!("Imported {} students from {}", outcome.imported_count, filename);
    Json(serde_json::json!({
        "success": true,
        "message": format!("Successfully imported {} students", outcome.imported_count),
        "imported_count": outcome.imported_count,
        "total_errors": outcome.errors.len(),
        "errors": outcome.errors.iter().take(REPORTED_IMPORT_ERRORS).collect::<Vec<_>>(),
    }))
    .into_response()
}

pub async fn add_student(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(form): Json<StudentForm>,
) -> Response {
    if !is_admin(&state, &headers).await {
        return unauthorized();
    }
    match state.roster.add(form.into()).await {
        Ok(student) => Json(serde_json::json!({
            "success": true,
            "message": format!("Student {} added successfully", student.student_name),
            "student": student,
        }))
        .into_response(),
        Err(e) => roster_failure(e),
    }
}

pub async fn update_student(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(form): Json<UpdateForm>,
) -> Response {
    if !is_admin(&state, &headers).await {
        return unauthorized();
    }
    let original_id = form.original_sixerclass_id.trim().to_string();
    match state.roster.update(&original_id, form.student.into()).await {
        Ok(student) => Json(serde_json::json!({
            "success": true,
            "message": format!("Student {} updated successfully", student.student_name),
            "student": student,
        }))
        .into_response(),
        Err(e) => roster_failure(e),
    }
}

pub async fn delete_student(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(form): Json<DeleteForm>,
) -> Response {
    if !is_admin(&state, &headers).await {
        return unauthorized();
    }
    match state.roster.delete(form.sixerclass_id.trim()).await {
        Ok(student) => Json(serde_json::json!({
            "success": true,
            "message": format!("Student {} deleted successfully", student.student_name),
        }))
        .into_response(),
        Err(e) => roster_failure(e),
    }
}

pub async fn generate_certificate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> Response {
    if !is_admin(&state, &headers).await {
        return unauthorized();
    }
    let student: StudentRecord = StudentRecord::from(request.student).trimmed();
    let format = request.format.unwrap_or(state.config.certificate.default_format);
    issue_certificate(&state, student, format).await
}

pub async fn download_history(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if !is_admin(&state, &headers).await {
        return unauthorized();
    }
    Json(serde_json::json!({
        "success": true,
        "total_downloads": state.downloads.total(),
        "entries": state.downloads.entries(),
        "students": state.downloads.summary(),
    }))
    .into_response()
}
