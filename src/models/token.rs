use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Application;

/// Token obtained through the OAuth handshake and held in the user's session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub application: Application,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub expires_at: Option<i64>,
    pub scope: Option<String>,
}

impl OAuthToken {
    pub fn new(
        application: Application,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
        scope: Option<String>,
    ) -> Self {
        let expires_at = expires_in.map(|secs| chrono::Utc::now().timestamp() + secs);
        Self {
            application,
            access_token: access_token.into(),
            refresh_token,
            expires_in,
            expires_at,
            scope,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => chrono::Utc::now().timestamp() >= expires_at,
            None => false,
        }
    }

    /// Same grant with a newly issued access token.
    pub fn with_access_token(&self, access_token: String, expires_in: Option<i64>) -> Self {
        Self {
            access_token,
            expires_in,
            expires_at: expires_in.map(|secs| chrono::Utc::now().timestamp() + secs),
            ..self.clone()
        }
    }

    /// Copies the credentials into a row owned by `location_id`.
    pub fn bind_to(&self, location_id: i64) -> NewToken {
        NewToken {
            application_id: self.application.id,
            location_id,
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_in: self.expires_in,
            expires_at: self.expires_at,
            scope: self.scope.clone(),
        }
    }
}

/// Persisted copy of a token, bound to one location.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TokenBinding {
    pub id: i64,
    pub application_id: i64,
    pub location_id: i64,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub expires_at: Option<i64>,
    pub scope: Option<String>,
    pub created_at: i64,
}

impl TokenBinding {
    pub fn into_oauth_token(self, application: Application) -> OAuthToken {
        OAuthToken {
            application,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
            expires_at: self.expires_at,
            scope: self.scope,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewToken {
    pub application_id: i64,
    pub location_id: i64,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub expires_at: Option<i64>,
    pub scope: Option<String>,
}
