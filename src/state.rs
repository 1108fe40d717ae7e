use crate::certificate::CertificateGenerator;
use crate::config::Config;
use crate::downloads::DownloadLog;
use crate::roster::RosterStore;
use crate::session::SessionStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub roster: Arc<RosterStore>,
    pub generator: Arc<CertificateGenerator>,
    pub downloads: Arc<DownloadLog>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Opens the roster and download log, then builds the generator. Fails
    /// when the roster file exists but cannot be read, or when no
    /// certificate template can be found.
    pub fn build(config: Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let roster = Arc::new(RosterStore::open(&config.roster_file)?);
        let downloads = Arc::new(match &config.download_log_file {
            Some(path) => DownloadLog::open(path),
            None => DownloadLog::in_memory(),
        });
        let generator = CertificateGenerator::from_config(&config.certificate)?
            .with_download_log(downloads.clone());

        let sessions = Arc::new(SessionStore::with_idle_timeout(config.session_idle_timeout));
        Ok(Self {
            config: Arc::new(config),
            roster,
            generator: Arc::new(generator),
            downloads,
            sessions,
        })
    }
}
