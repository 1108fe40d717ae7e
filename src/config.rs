use std::path::PathBuf;
use std::time::Duration;

use crate::certificate::{
    fonts, template, CertificateConfig, CertificateStyle, FontCandidate, LayoutConfig, OutputFormat,
};
use crate::session;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub results_folder: PathBuf,
    pub roster_file: PathBuf,
    pub download_log_file: Option<PathBuf>,
    pub admin_username: String,
    pub admin_password: String,
    pub session_idle_timeout: Duration,
    pub certificate: CertificateConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok();

        let admin_password = std::env::var("ADMIN_PASSWORD")
            .map_err(|_| "ADMIN_PASSWORD must be set")?;
        let admin_username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());

        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let results_folder = base_dir.join(
            std::env::var("RESULTS_FOLDER").unwrap_or_else(|_| "results".to_string())
        );
        let roster_file = base_dir.join(
            std::env::var("ROSTER_FILE").unwrap_or_else(|_| "data/student-data.xlsx".to_string())
        );
        // An empty value turns the persisted log off.
        let download_log_file = match std::env::var("DOWNLOAD_LOG_FILE") {
            Ok(v) if v.trim().is_empty() => None,
            Ok(v) => Some(base_dir.join(v)),
            Err(_) => Some(base_dir.join("data/downloads.jsonl")),
        };

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5001".to_string())
            .parse()
            .unwrap_or(5001);

        let session_idle_timeout = std::env::var("SESSION_IDLE_MINUTES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|m| *m > 0)
            .map(|m| Duration::from_secs(m * 60))
            .unwrap_or(session::DEFAULT_IDLE_TIMEOUT);

        // Overrides are tried before the built-in search paths.
        let template_override = std::env::var("TEMPLATE_PATH").unwrap_or_default();
        let template_candidates = split_list(&template_override)
            .map(PathBuf::from)
            .chain(template::DEFAULT_TEMPLATE_CANDIDATES.iter().map(PathBuf::from))
            .collect();
        let font_override = std::env::var("FONT_PATHS").unwrap_or_default();
        let font_candidates = split_list(&font_override)
            .map(FontCandidate::parse)
            .chain(fonts::default_candidates())
            .collect();
        let layout = match std::env::var("CERTIFICATE_LAYOUT") {
            Ok(v) if v == "centered" => LayoutConfig::centered_default(),
            Ok(v) if v == "fixed" => LayoutConfig::fixed_calibrated(),
            Ok(path) => LayoutConfig::from_file(&base_dir.join(path))?,
            Err(_) => LayoutConfig::default(),
        };
        let default_format: OutputFormat = match std::env::var("CERTIFICATE_FORMAT") {
            Ok(v) => v.parse()?,
            Err(_) => OutputFormat::default(),
        };

        Ok(Self {
            host,
            port,
            certificate: CertificateConfig {
                template_candidates,
                font_candidates,
                layout,
                style: CertificateStyle::default(),
                output_dir: results_folder.clone(),
                default_format,
            },
            results_folder,
            roster_file,
            download_log_file,
            admin_username,
            admin_password,
            session_idle_timeout,
        })
    }
}

/// Comma or semicolon delimited list, blanks dropped.
fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c| c == ',' || c == ';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
