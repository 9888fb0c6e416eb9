use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::catalog::ProfileCatalog;
use super::ConnectError;
use crate::google::AnalyticsGateway;
use crate::models::{OAuthToken, RemoteProfile, ALL_PROPERTIES};

#[derive(Debug, Clone, Serialize)]
pub struct ListedProfile {
    #[serde(flatten)]
    pub profile: RemoteProfile,
    /// Value to submit back when selecting this view
    pub selection_key: String,
    pub connected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyListing {
    pub profiles: Vec<ListedProfile>,
    /// True when every listed view is already connected (also for no views)
    pub all_connected: bool,
}

/// Lists every view the token can see, flagged against the local catalog.
#[derive(Clone)]
pub struct PropertyLister {
    gateway: Arc<dyn AnalyticsGateway>,
    catalog: ProfileCatalog,
}

impl PropertyLister {
    pub fn new(gateway: Arc<dyn AnalyticsGateway>, catalog: ProfileCatalog) -> Self {
        Self { gateway, catalog }
    }

    pub async fn list(&self, token: &OAuthToken) -> Result<PropertyListing, ConnectError> {
        let connected_ids = self.catalog.connected_ids().await?;
        let token = &self.gateway.fresh_token(token).await?;

        let mut profiles = Vec::new();
        for account in self.gateway.list_accounts(token).await? {
            let account_profiles = self
                .gateway
                .list_profiles(token, &account.id, ALL_PROPERTIES)
                .await?;
            debug!(
                account_id = %account.id,
                count = account_profiles.len(),
                "listed Google Analytics profiles"
            );

            profiles.extend(account_profiles.into_iter().map(|profile| ListedProfile {
                selection_key: profile.selection_key(),
                connected: connected_ids.contains(&profile.id),
                profile,
            }));
        }

        let all_connected = profiles.iter().all(|listed| listed.connected);
        Ok(PropertyListing {
            profiles,
            all_connected,
        })
    }
}
