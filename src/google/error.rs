use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Google rejected the access token: {0}")]
    Unauthorized(String),
    #[error("access denied by Google: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("Google API rate limit exceeded")]
    RateLimited,
    #[error("Google API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response from Google: {0}")]
    InvalidResponse(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl GatewayError {
    /// The token is unusable and the user must run the OAuth flow again
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, GatewayError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Network("request timeout".to_string())
        } else if err.is_connect() {
            GatewayError::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Network(format!("request failed: {err}"))
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Map a non-success status to the matching error, reading the body for context.
pub(crate) async fn check_status(response: Response) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED => GatewayError::Unauthorized(body),
        StatusCode::FORBIDDEN => GatewayError::Forbidden(body),
        StatusCode::NOT_FOUND => GatewayError::NotFound(body),
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited,
        other => GatewayError::Api {
            status: other.as_u16(),
            body,
        },
    })
}

pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
}
