use axum::{
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect},
};
use std::sync::Arc;
use tera::Context;

use crate::state::AppState;
use crate::templates::render;

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let mut ctx = Context::new();
    ctx.insert("students_loaded", &state.roster.len().await);
    render("index.html", &ctx)
}

pub async fn admin_root() -> Redirect {
    Redirect::to("/admin/login")
}

pub async fn admin_login_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let mut ctx = Context::new();
    ctx.insert("admin_username", &state.config.admin_username);
    render("admin_login.html", &ctx)
}

pub async fn admin_students_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !super::is_admin(&state, &headers).await {
        return Redirect::to("/admin/login").into_response();
    }
    render("admin_students.html", &Context::new()).into_response()
}
