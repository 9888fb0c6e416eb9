//! Google Analytics Management API v3 client.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::credentials::Credentials;
use super::error::{check_status, decode_json, GatewayError, GatewayResult};
use super::gateway::AnalyticsGateway;
use super::oauth::OAuthFlow;
use super::reporting::{ProfileReporter, ReporterError};
use crate::config::GoogleConfig;
use crate::models::{OAuthToken, RemoteAccount, RemoteProfile};
use crate::storage::Storage;

const PAGE_SIZE: &str = "1000";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_link: Option<String>,
}

#[derive(Clone)]
pub struct RestClient {
    client: Client,
    management_url: String,
    reporting_url: String,
    oauth: OAuthFlow,
}

impl RestClient {
    pub fn new(config: &GoogleConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .user_agent("gaconnect/0.1.0")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            management_url: config.management_url.clone(),
            reporting_url: config.reporting_url.clone(),
            oauth: OAuthFlow::new(config)?,
        })
    }

    /// A usable access token for `token`, refreshing it first when it expired.
    pub async fn access_token(&self, token: &OAuthToken) -> GatewayResult<String> {
        Ok(self.refreshed(token).await?.access_token)
    }

    async fn refreshed(&self, token: &OAuthToken) -> GatewayResult<OAuthToken> {
        let credentials = Credentials::from_token(token);
        let Some(refresh_token) = credentials.refresh_token.as_deref() else {
            return Ok(token.clone());
        };
        if !credentials.needs_refresh() {
            return Ok(token.clone());
        }

        let refreshed = self
            .oauth
            .refresh(&credentials.client_id, &credentials.client_secret, refresh_token)
            .await?;
        Ok(token.with_access_token(refreshed.access_token, refreshed.expires_in))
    }

    /// Authenticate with the token bound to a connected location.
    pub async fn connect_by_location(
        &self,
        storage: &dyn Storage,
        location_id: i64,
    ) -> Result<ProfileReporter, ReporterError> {
        let binding = storage
            .get_token_for_location(location_id)
            .await
            .map_err(ReporterError::Storage)?
            .ok_or(ReporterError::MissingToken(location_id))?;

        let profile = storage
            .get_profile_by_location(location_id)
            .await
            .map_err(ReporterError::Storage)?
            .ok_or(ReporterError::MissingProfile(location_id))?;

        let application = storage
            .get_application_by_id(binding.application_id)
            .await
            .map_err(ReporterError::Storage)?
            .ok_or(ReporterError::MissingApplication(binding.application_id))?;

        let token = binding.into_oauth_token(application);
        let access_token = self.access_token(&token).await?;

        Ok(ProfileReporter::new(
            self.client.clone(),
            self.reporting_url.clone(),
            access_token,
            profile,
        ))
    }

    fn endpoint(&self, segments: &[&str]) -> GatewayResult<Url> {
        let mut url = Url::parse(&self.management_url)
            .map_err(|e| GatewayError::InvalidResponse(format!("invalid management URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidResponse("management URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, access_token: &str, url: Url) -> GatewayResult<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;
        decode_json(check_status(response).await?).await
    }

    /// Follow `nextLink` until the collection is exhausted.
    async fn get_all<T: DeserializeOwned>(
        &self,
        access_token: &str,
        mut url: Url,
    ) -> GatewayResult<Vec<T>> {
        url.query_pairs_mut().append_pair("max-results", PAGE_SIZE);

        let mut items = Vec::new();
        let mut next = Some(url);
        while let Some(page_url) = next.take() {
            debug!(url = %page_url, "fetching management API page");
            let page: ListResponse<T> = self.get_json(access_token, page_url).await?;
            items.extend(page.items);

            next = match page.next_link {
                Some(link) => Some(Url::parse(&link).map_err(|e| {
                    GatewayError::InvalidResponse(format!("invalid nextLink '{link}': {e}"))
                })?),
                None => None,
            };
        }

        Ok(items)
    }
}

#[async_trait]
impl AnalyticsGateway for RestClient {
    async fn fresh_token(&self, token: &OAuthToken) -> GatewayResult<OAuthToken> {
        self.refreshed(token).await
    }

    async fn list_accounts(&self, token: &OAuthToken) -> GatewayResult<Vec<RemoteAccount>> {
        let access_token = self.access_token(token).await?;
        let url = self.endpoint(&["management", "accounts"])?;
        self.get_all(&access_token, url).await
    }

    async fn list_profiles(
        &self,
        token: &OAuthToken,
        account_id: &str,
        web_property_id: &str,
    ) -> GatewayResult<Vec<RemoteProfile>> {
        let access_token = self.access_token(token).await?;
        let url = self.endpoint(&[
            "management",
            "accounts",
            account_id,
            "webproperties",
            web_property_id,
            "profiles",
        ])?;
        self.get_all(&access_token, url).await
    }

    async fn get_profile(
        &self,
        token: &OAuthToken,
        account_id: &str,
        web_property_id: &str,
        profile_id: &str,
    ) -> GatewayResult<RemoteProfile> {
        let access_token = self.access_token(token).await?;
        let url = self.endpoint(&[
            "management",
            "accounts",
            account_id,
            "webproperties",
            web_property_id,
            "profiles",
            profile_id,
        ])?;
        self.get_json(&access_token, url).await
    }
}
