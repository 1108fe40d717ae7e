use axum::response::Html;
use std::sync::OnceLock;
use tera::{Context, Tera};

static TERA: OnceLock<Tera> = OnceLock::new();

const PAGES: &[(&str, &str)] = &[
    ("index.html", include_str!("../templates/index.html")),
    ("admin_login.html", include_str!("../templates/admin_login.html")),
    ("admin_students.html", include_str!("../templates/admin_students.html")),
];

pub fn get_tera() -> &'static Tera {
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        if let Err(e) = tera.add_raw_templates(PAGES.iter().copied()) {
            tracing::error!("Failed to load templates: {}", e);
        }
        tera
    })
}

pub fn render(name: &str, ctx: &Context) -> Html<String> {
    match get_tera().render(name, ctx) {
        Ok(page) => Html(page),
        Err(e) => {
            tracing::error!("Template {} failed to render: {}", name, e);
            Html(format!("Template error: {}", name))
        }
    }
}
