pub mod certificate;
pub mod config;
pub mod downloads;
pub mod roster;
pub mod routes;
pub mod session;
pub mod spreadsheet;
pub mod state;
pub mod storage;
pub mod templates;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn app(state: Arc<state::AppState>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/api/check-status", get(routes::check_status))
        .route("/api/authenticate", post(routes::authenticate))
        .route("/api/download-certificate", post(routes::download_certificate))
        .route("/api/serve-certificate/:filename", get(routes::serve_certificate))
        .route("/admin", get(routes::admin_root))
        .route("/admin/login", get(routes::admin_login_page).post(routes::admin_login))
        .route("/admin/logout", post(routes::admin_logout))
        .route("/admin/students", get(routes::admin_students_page))
        .route("/admin/api/students", get(routes::list_students))
        .route("/admin/api/students/export", get(routes::export_students))
        .route("/admin/api/students/import", post(routes::import_students))
        .route("/admin/api/students/add", post(routes::add_student))
        .route("/admin/api/students/update", post(routes::update_student))
        .route("/admin/api/students/delete", post(routes::delete_student))
        .route("/admin/api/generate-certificate", post(routes::generate_certificate))
        .route("/admin/api/downloads", get(routes::download_history))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
