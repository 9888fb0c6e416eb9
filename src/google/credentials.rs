use crate::models::OAuthToken;

pub const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
pub const USERINFO_PROFILE_SCOPE: &str = "https://www.googleapis.com/auth/userinfo.profile";

/// Scopes requested during the consent step.
pub const SCOPES: &[&str] = &[ANALYTICS_READONLY_SCOPE, USERINFO_PROFILE_SCOPE];

/// Everything needed to call Google on behalf of a token holder.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
}

impl Credentials {
    pub fn from_token(token: &OAuthToken) -> Self {
        Self {
            client_id: token.application.app_key.clone(),
            client_secret: token.application.app_secret.clone(),
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at: token.expires_at,
        }
    }

    pub fn needs_refresh(&self) -> bool {
        let expired = self
            .expires_at
            .is_some_and(|at| chrono::Utc::now().timestamp() >= at);
        expired && self.refresh_token.is_some()
    }
}

pub fn scope_string() -> String {
    SCOPES.join(" ")
}
