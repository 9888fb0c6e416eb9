//! Google OAuth 2.0 authorization-code handshake.
//!
//! Only the two calls the connection flow needs: building the consent URL and
//! trading a code (or a refresh token) at the token endpoint.

use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::credentials::scope_string;
use super::error::{check_status, decode_json, GatewayError, GatewayResult};
use crate::config::GoogleConfig;
use crate::models::{Application, OAuthToken};

#[derive(Clone)]
pub struct OAuthFlow {
    client: Client,
    auth_url: String,
    token_url: String,
    redirect_uri: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

/// Result of a refresh-token grant.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
}

impl OAuthFlow {
    pub fn new(config: &GoogleConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .user_agent("gaconnect-oauth/0.1.0")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    pub fn authorize_url(&self, application: &Application, state: &str) -> GatewayResult<String> {
        let scope = scope_string();
        let url = Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", application.app_key.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| GatewayError::InvalidResponse(format!("invalid authorization URL: {e}")))?;

        Ok(url.to_string())
    }

    pub async fn exchange_code(
        &self,
        application: &Application,
        code: &str,
    ) -> GatewayResult<OAuthToken> {
        let params = [
            ("client_id", application.app_key.as_str()),
            ("client_secret", application.app_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self.client.post(&self.token_url).form(&params).send().await?;
        let response = check_status(response).await.map_err(into_auth_failure)?;
        let token: TokenResponse = decode_json(response).await?;

        info!(application_id = application.id, "obtained Google access token");
        Ok(OAuthToken::new(
            application.clone(),
            token.access_token,
            token.refresh_token,
            token.expires_in,
            token.scope,
        ))
    }

    pub async fn refresh(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> GatewayResult<RefreshedToken> {
        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.client.post(&self.token_url).form(&params).send().await?;
        let response = check_status(response).await.map_err(into_auth_failure)?;
        let token: TokenResponse = decode_json(response).await?;

        debug!("refreshed Google access token");
        Ok(RefreshedToken {
            access_token: token.access_token,
            expires_in: token.expires_in,
        })
    }
}

// The token endpoint answers 400 for bad codes and revoked refresh tokens.
fn into_auth_failure(err: GatewayError) -> GatewayError {
    match err {
        GatewayError::Api { status: 400, body } => GatewayError::Unauthorized(body),
        other => other,
    }
}
