use async_trait::async_trait;

use super::error::{GatewayError, GatewayResult};
use crate::models::{OAuthToken, RemoteAccount, RemoteProfile, RemoteProfileRef, ALL_PROPERTIES};

/// Read access to the accounts and views a token can see.
#[async_trait]
pub trait AnalyticsGateway: Send + Sync {
    /// `token` with a usable access token. Callers making several requests
    /// refresh once up front and pass the result on.
    async fn fresh_token(&self, token: &OAuthToken) -> GatewayResult<OAuthToken> {
        Ok(token.clone())
    }

    async fn list_accounts(&self, token: &OAuthToken) -> GatewayResult<Vec<RemoteAccount>>;

    /// Views under one web property, or under all of them with `~all`
    async fn list_profiles(
        &self,
        token: &OAuthToken,
        account_id: &str,
        web_property_id: &str,
    ) -> GatewayResult<Vec<RemoteProfile>>;

    async fn get_profile(
        &self,
        token: &OAuthToken,
        account_id: &str,
        web_property_id: &str,
        profile_id: &str,
    ) -> GatewayResult<RemoteProfile>;

    /// Fetch the view a selection key points at. Keys without a property are
    /// matched against every view of the account.
    async fn resolve_profile(
        &self,
        token: &OAuthToken,
        reference: &RemoteProfileRef,
    ) -> GatewayResult<RemoteProfile> {
        match &reference.property_id {
            Some(property_id) => {
                self.get_profile(token, &reference.account_id, property_id, &reference.profile_id)
                    .await
            }
            None => self
                .list_profiles(token, &reference.account_id, ALL_PROPERTIES)
                .await?
                .into_iter()
                .find(|profile| profile.id == reference.profile_id)
                .ok_or_else(|| {
                    GatewayError::NotFound(format!(
                        "profile {} in account {}",
                        reference.profile_id, reference.account_id
                    ))
                }),
        }
    }
}
