mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use certifier::certificate::DateValue;
use certifier::roster::StudentRecord;
use certifier::spreadsheet;
use common::{body_bytes, body_json, session_cookie, TestApp};
use serde_json::json;

fn rahul_credentials() -> serde_json::Value {
    json!({
        "student_name": "Rahul Sharma",
        "batch_number": "AWS-2024-001",
        "sixerclass_id": "SIX001",
    })
}

#[tokio::test]
async fn status_reports_seeded_roster() {
    let app = TestApp::new();
    let response = app.get("/api/check-status", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "operational");
    assert_eq!(body["students_loaded"], 6);
}

#[tokio::test]
async fn portal_page_renders() {
    let app = TestApp::new();
    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(page.contains("6 students on the roster"));
}

#[tokio::test]
async fn unknown_student_is_not_found() {
    let app = TestApp::new();
    let mut credentials = rahul_credentials();
    credentials["batch_number"] = json!("AWS-2024-002");
    let response = app.post_json("/api/authenticate", credentials, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Student not found");
}

#[tokio::test]
async fn download_requires_a_student_session() {
    let app = TestApp::new();
    let response = app
        .post_json("/api/download-certificate", json!({ "format": "pdf" }), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authenticate_download_and_serve() {
    let app = TestApp::new();
    let response = app
        .post_json("/api/authenticate", rahul_credentials(), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);
    assert_eq!(body_json(response).await["student"]["sixerclass_id"], "SIX001");

    for (format, mime, magic) in [
        ("pdf", "application/pdf", &b"%PDF"[..]),
        ("png", "image/png", &b"\x89PNG"[..]),
    ] {
        let response = app
            .post_json(
                "/api/download-certificate",
                json!({ "format": format }),
                Some(&cookie),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let filename = body["filename"].as_str().unwrap().to_string();
        assert!(filename.contains("SIX001") && filename.contains("Rahul_Sharma"));

        let response = app.get(body["download_url"].as_str().unwrap(), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], mime);
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains(&filename));
        assert!(body_bytes(response).await.starts_with(magic));
    }

    assert_eq!(app.state.downloads.total(), 2);
}

#[tokio::test]
async fn serve_rejects_unexpected_names() {
    let app = TestApp::new();
    let response = app.get("/api/serve-certificate/student-data.xlsx", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app
        .get("/api/serve-certificate/certificate_..%2F..%2Fsecret.pdf", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app
        .get("/api/serve-certificate/certificate_SIX404_Nobody.pdf", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_api_requires_a_session() {
    let app = TestApp::new();
    for uri in [
        "/admin/api/students",
        "/admin/api/students/export",
        "/admin/api/downloads",
    ] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body_json(response).await["error"], "Unauthorized");
    }
    let response = app
        .post_json("/admin/api/students/delete", json!({ "sixerclass_id": "SIX001" }), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.state.roster.len().await, 6);

    // A student session is not an admin session.
    let response = app
        .post_json("/api/authenticate", rahul_credentials(), None)
        .await;
    let cookie = session_cookie(&response);
    let response = app.get("/admin/api/students", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get("/admin/students", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn admin_login_checks_the_password() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/admin/login",
            json!({ "username": "admin", "password": "wrong" }),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookie = app.admin_cookie().await;
    let response = app.get("/admin/students", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.post_json("/admin/logout", json!({}), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.get("/admin/api/students", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_manages_the_roster() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let response = app.get("/admin/api/students?search=sharma", Some(&cookie)).await;
    let body = body_json(response).await;
    assert_eq!(body["total"], 2);

    let new_student = json!({
        "student_name": "Kavya Rao",
        "batch_number": "AWS-2024-003",
        "batch_start_date": "2024-03-01",
        "batch_end_date": "2024-06-01",
        "sixerclass_id": "SIX007",
    });
    let response = app
        .post_json("/admin/api/students/add", new_student.clone(), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .post_json("/admin/api/students/add", new_student.clone(), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "SixerClass ID SIX007 already exists"
    );

    let response = app
        .post_json(
            "/admin/api/students/add",
            json!({ "student_name": "Half Filled", "sixerclass_id": "SIX008" }),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Missing field: batch_number");

    let mut renamed = new_student.clone();
    renamed["original_sixerclass_id"] = json!("SIX007");
    renamed["sixerclass_id"] = json!("SIX001");
    let response = app
        .post_json("/admin/api/students/update", renamed.clone(), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    renamed["sixerclass_id"] = json!("SIX070");
    renamed["student_name"] = json!("Kavya R Rao");
    let response = app
        .post_json("/admin/api/students/update", renamed.clone(), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.state.roster.get("SIX070").await.unwrap().student_name,
        "Kavya R Rao"
    );

    renamed["original_sixerclass_id"] = json!("SIX999");
    let response = app
        .post_json("/admin/api/students/update", renamed, Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .post_json(
            "/admin/api/students/delete",
            json!({ "sixerclass_id": "SIX070" }),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .post_json(
            "/admin/api/students/delete",
            json!({ "sixerclass_id": "SIX070" }),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let saved = std::fs::read(&app.state.config.roster_file).unwrap();
    assert_eq!(spreadsheet::read_records(&saved).unwrap().len(), 6);
}

fn multipart_upload(filename: &str, bytes: &[u8], cookie: &str) -> Request<Body> {
    let boundary = "certifier-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            b = boundary,
            f = filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/admin/api/students/import")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn import_reports_duplicates_and_export_round_trips() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let rows = vec![
        StudentRecord {
            student_name: "Meera Iyer".to_string(),
            batch_number: "AWS-2024-004".to_string(),
            batch_start_date: DateValue::parse("2024-07-01"),
            batch_end_date: DateValue::parse("2024-09-30"),
            sixerclass_id: "SIX200".to_string(),
        },
        StudentRecord {
            student_name: "Rahul Sharma".to_string(),
            batch_number: "AWS-2024-001".to_string(),
            batch_start_date: DateValue::parse("2024-01-15"),
            batch_end_date: DateValue::parse("2024-04-15"),
            sixerclass_id: "SIX001".to_string(),
        },
    ];
    let upload = spreadsheet::write_records(&rows).unwrap();

    let response = app.send(multipart_upload("roster.csv", &upload, &cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(multipart_upload("roster.xlsx", &upload, &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["imported_count"], 1);
    assert_eq!(body["errors"], json!(["Duplicate ID: SIX001"]));
    assert_eq!(app.state.roster.len().await, 7);

    let response = app.get("/admin/api/students/export", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("students_export_"));
    let exported = spreadsheet::read_records(&body_bytes(response).await).unwrap();
    assert_eq!(exported, app.state.roster.list(None).await);
}

#[tokio::test]
async fn truncated_upload_is_reported_as_a_failed_upload() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    let boundary = "certifier-test-boundary";
    // Part headers end before the blank line that closes them.
    let body = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"roster.xlsx\"\r\n",
        boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/admin/api/students/import")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .header(header::COOKIE, cookie.as_str())
        .body(Body::from(body))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Upload failed"), "{}", message);
    assert_eq!(app.state.roster.len().await, 6);
}

#[tokio::test]
async fn admin_sees_download_history() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let student = app.state.roster.get("SIX004").await.unwrap();
    let response = app
        .post_json(
            "/admin/api/generate-certificate",
            json!({ "student": student, "format": "png" }),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["filename"],
        "certificate_SIX004_Neha_Gupta_HQ.png"
    );

    let mut blank = serde_json::to_value(&student).unwrap();
    blank["student_name"] = json!("");
    let response = app
        .post_json(
            "/admin/api/generate-certificate",
            json!({ "student": blank }),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["kind"], "MissingField");

    let response = app.get("/admin/api/downloads", Some(&cookie)).await;
    let body = body_json(response).await;
    assert_eq!(body["total_downloads"], 1);
    assert_eq!(body["students"][0]["sixerclass_id"], "SIX004");
    assert_eq!(body["students"][0]["count"], 1);

    let persisted = std::fs::read_to_string(app.dir.path().join("data").join("downloads.jsonl")).unwrap();
    assert_eq!(persisted.lines().count(), 1);
}
