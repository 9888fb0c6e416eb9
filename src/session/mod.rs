//! Per-browser session state: the OAuth token, the pending OAuth `state`
//! nonce and notices waiting to be shown.

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::config::SessionConfig;
use crate::connect::Notice;
use crate::models::OAuthToken;

pub const SESSION_COOKIE: &str = "gaconnect_session";

const ID_BYTES: usize = 32;

/// Identifier of the caller's session, inserted into request extensions by
/// [`session_middleware`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(random_token())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accepts only values shaped like ids we issue.
    pub fn parse(value: &str) -> Option<Self> {
        let decoded = URL_SAFE_NO_PAD.decode(value).ok()?;
        (decoded.len() == ID_BYTES).then(|| Self(value.to_string()))
    }
}

fn random_token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; ID_BYTES]>())
}

pub struct SessionStore {
    tokens: Cache<String, Arc<OAuthToken>>,
    states: Cache<String, String>,
    notices: Cache<String, Vec<Notice>>,
    ttl: Duration,
    cookie_secure: bool,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        let ttl = Duration::from_secs(config.ttl_secs);
        Self {
            tokens: Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(ttl)
                .build(),
            states: Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(ttl)
                .build(),
            notices: Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(ttl)
                .build(),
            ttl,
            cookie_secure: config.cookie_secure,
        }
    }

    pub async fn token(&self, session: &SessionId) -> Option<Arc<OAuthToken>> {
        self.tokens.get(session.as_str()).await
    }

    pub async fn store_token(&self, session: &SessionId, token: OAuthToken) {
        self.tokens
            .insert(session.as_str().to_string(), Arc::new(token))
            .await;
    }

    /// New OAuth `state` nonce for the session, replacing any previous one.
    pub async fn issue_state(&self, session: &SessionId) -> String {
        let state = random_token();
        self.states
            .insert(session.as_str().to_string(), state.clone())
            .await;
        state
    }

    /// Consumes the pending nonce; true when `state` matches it.
    pub async fn verify_state(&self, session: &SessionId, state: &str) -> bool {
        match self.states.remove(session.as_str()).await {
            Some(expected) => expected.as_bytes().ct_eq(state.as_bytes()).into(),
            None => false,
        }
    }

    /// Queues notices for the next overview; unread ones expire with the session.
    pub async fn push_notices(
        &self,
        session: &SessionId,
        notices: impl IntoIterator<Item = Notice>,
    ) {
        let notices: Vec<Notice> = notices.into_iter().collect();
        if notices.is_empty() {
            return;
        }
        self.notices
            .entry(session.as_str().to_string())
            .and_upsert_with(|pending| {
                let mut queued = pending.map(|entry| entry.into_value()).unwrap_or_default();
                queued.extend(notices);
                std::future::ready(queued)
            })
            .await;
    }

    pub async fn drain_notices(&self, session: &SessionId) -> Vec<Notice> {
        self.notices
            .remove(session.as_str())
            .await
            .unwrap_or_default()
    }

    fn cookie(&self, session: &SessionId) -> String {
        let mut cookie = format!(
            "{SESSION_COOKIE}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            session.as_str(),
            self.ttl.as_secs()
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionId::parse(value))
}

/// Attaches a [`SessionId`] to every request, issuing a cookie for new ones.
pub async fn session_middleware(
    sessions: Arc<SessionStore>,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = session_from_headers(request.headers());
    let is_new = existing.is_none();
    let session = existing.unwrap_or_else(SessionId::generate);

    request.extensions_mut().insert(session.clone());
    let mut response = next.run(request).await;

    if is_new {
        debug!("issued new session cookie");
        match HeaderValue::from_str(&sessions.cookie(&session)) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => debug!(error = %e, "session cookie is not a valid header value"),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(&SessionConfig::default())
    }

    #[test]
    fn parses_session_cookie_among_others() {
        let id = SessionId::generate();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={}", id.as_str()))
                .unwrap(),
        );
        assert_eq!(session_from_headers(&headers), Some(id));
    }

    #[test]
    fn rejects_foreign_session_values() {
        assert!(SessionId::parse("not-a-session").is_none());
        assert!(SessionId::parse("").is_none());
    }

    #[tokio::test]
    async fn state_nonce_is_single_use() {
        let sessions = store();
        let session = SessionId::generate();
        let state = sessions.issue_state(&session).await;

        assert!(!sessions.verify_state(&SessionId::generate(), &state).await);
        assert!(sessions.verify_state(&session, &state).await);
        assert!(!sessions.verify_state(&session, &state).await);
    }

    #[tokio::test]
    async fn wrong_state_is_rejected() {
        let sessions = store();
        let session = SessionId::generate();
        sessions.issue_state(&session).await;
        assert!(!sessions.verify_state(&session, "forged").await);
    }

    #[tokio::test]
    async fn notices_drain_in_order() {
        let sessions = store();
        let session = SessionId::generate();
        sessions.push_notices(&session, [Notice::connected("A")]).await;
        sessions
            .push_notices(&session, [Notice::already_connected("B")])
            .await;

        assert_eq!(
            sessions.drain_notices(&session).await,
            vec![Notice::connected("A"), Notice::already_connected("B")]
        );
        assert!(sessions.drain_notices(&session).await.is_empty());
    }

    #[tokio::test]
    async fn unread_notices_expire_with_the_session() {
        let sessions = SessionStore::new(&SessionConfig {
            ttl_secs: 1,
            ..SessionConfig::default()
        });
        let abandoned: Vec<SessionId> = (0..100).map(|_| SessionId::generate()).collect();
        for session in &abandoned {
            sessions
                .push_notices(session, [Notice::connected("Example")])
                .await;
        }
        sessions.notices.run_pending_tasks().await;
        assert_eq!(sessions.notices.entry_count(), 100);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        sessions.notices.run_pending_tasks().await;

        assert_eq!(sessions.notices.entry_count(), 0);
        assert!(sessions.drain_notices(&abandoned[0]).await.is_empty());
    }

    #[test]
    fn secure_cookie_flag_follows_config() {
        let sessions = SessionStore::new(&SessionConfig {
            cookie_secure: true,
            ..SessionConfig::default()
        });
        let cookie = sessions.cookie(&SessionId::generate());
        assert!(cookie.starts_with("gaconnect_session="));
        assert!(cookie.ends_with("; Secure"));
    }
}
