use certifier::{config, state, storage};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certifier=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;

    let mut dirs: Vec<&Path> = vec![&config.results_folder];
    dirs.extend(config.roster_file.parent());
    dirs.extend(config.download_log_file.as_deref().and_then(Path::parent));
    storage::ensure_dirs(&dirs)?;

    let addr = format!("{}:{}", config.host, config.port);
    let state = state::AppState::build(config)?;

    let fonts = state.generator.fonts();
    if fonts.is_degraded() {
        tracing::warn!("No usable font found; certificates will use the built-in face");
    }
    tracing::info!(
        "Template {} ({}x{}), {} students loaded",
        state.generator.template().path().display(),
        state.generator.template().dimensions().width,
        state.generator.template().dimensions().height,
        state.roster.len().await
    );

    let app = certifier::app(Arc::new(state));

    tracing::info!("Certifier listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
