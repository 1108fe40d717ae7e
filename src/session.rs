// Cookie sessions for portal students and the admin console.
use axum::http::{header, HeaderMap};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "certifier_session";
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(8 * 60 * 60);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// SixerClass id of the authenticated student.
    pub student_id: Option<String>,
    pub admin: bool,
}

struct Entry {
    session: Session,
    last_seen: Instant,
}

/// Sessions expire after `idle` without a request. Expired entries read as
/// absent and are dropped on the next write.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Entry>>,
    idle: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn with_idle_timeout(idle: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle,
        }
    }

    /// Live session behind `token`. A hit counts as activity.
    pub async fn get(&self, token: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(token)?;
        if entry.last_seen.elapsed() > self.idle {
            sessions.remove(token);
            return None;
        }
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    /// Applies `change` to the session behind `token`, or to a fresh one when
    /// the token is absent, unknown or expired. Returns the token to hand back.
    pub async fn upsert(&self, token: Option<&str>, change: impl FnOnce(&mut Session)) -> String {
        let mut sessions = self.sessions.write().await;
        let idle = self.idle;
        sessions.retain(|_, entry| entry.last_seen.elapsed() <= idle);

        let token = match token.filter(|t| sessions.contains_key(*t)) {
            Some(existing) => existing.to_string(),
            None => new_token(),
        };
        let entry = sessions.entry(token.clone()).or_insert_with(|| Entry {
            session: Session::default(),
            last_seen: Instant::now(),
        });
        change(&mut entry.session);
        entry.last_seen = Instant::now();
        token
    }

    pub async fn remove(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Session token carried in the request's `Cookie` header, if any.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(token: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, token)
}

pub fn expired_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}
