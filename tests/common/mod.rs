#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use certifier::certificate::{
    CertificateConfig, CertificateStyle, FontCandidate, LayoutConfig, OutputFormat,
};
use certifier::config::Config;
use certifier::state::AppState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_PASSWORD: &str = "s3cret";

/// Writes a plain light template of the given size and returns its path.
pub fn write_template(dir: &Path, width: u32, height: u32) -> PathBuf {
    let path = dir.join("certificate-template.png");
    image::RgbImage::from_pixel(width, height, image::Rgb([250, 248, 240]))
        .save(&path)
        .unwrap();
    path
}

/// Font candidates that never resolve, so rendering uses the built-in face.
pub fn unavailable_fonts(dir: &Path) -> Vec<FontCandidate> {
    vec![FontCandidate::File(dir.join("fonts").join("missing.ttf"))]
}

pub fn certificate_config(dir: &Path, template: PathBuf) -> CertificateConfig {
    let output_dir = dir.join("results");
    std::fs::create_dir_all(&output_dir).unwrap();
    CertificateConfig {
        template_candidates: vec![template],
        font_candidates: unavailable_fonts(dir),
        layout: LayoutConfig::default(),
        style: CertificateStyle::default(),
        output_dir,
        default_format: OutputFormat::Pdf,
    }
}

pub struct TestApp {
    pub dir: TempDir,
    pub state: Arc<AppState>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path(), 1056, 816);
        let certificate = certificate_config(dir.path(), template);
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            results_folder: certificate.output_dir.clone(),
            roster_file: dir.path().join("data").join("student-data.xlsx"),
            download_log_file: Some(dir.path().join("data").join("downloads.jsonl")),
            admin_username: "admin".to_string(),
            admin_password: ADMIN_PASSWORD.to_string(),
            session_idle_timeout: certifier::session::DEFAULT_IDLE_TIMEOUT,
            certificate,
        };
        let state = Arc::new(AppState::build(config).unwrap());
        let router = certifier::app(state.clone());
        Self { dir, state, router }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: serde_json::Value,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Logs in as admin and returns the cookie to send back.
    pub async fn admin_cookie(&self) -> String {
        let response = self
            .post_json(
                "/admin/login",
                serde_json::json!({ "username": "admin", "password": ADMIN_PASSWORD }),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response)
    }
}

/// `name=value` part of the response's Set-Cookie header.
pub fn session_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
