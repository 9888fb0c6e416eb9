//! Turns a selection of remote views into local locations, channels,
//! profiles and token bindings.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::notice::Notice;
use super::website::TitleFetcher;
use super::wizard::{ChannelWithLocations, ChannelWizard};
use super::ConnectError;
use crate::google::AnalyticsGateway;
use crate::models::{
    Channel, Location, Module, NewLocation, NewProfile, OAuthToken, Profile, RemoteProfile,
    RemoteProfileRef,
};
use crate::storage::{Storage, StorageError};

const OVERVIEW_BASE_URL: &str = "https://www.google.com/analytics/web/#report/visitors-overview";

/// Link to the visitors overview report of a view.
pub fn overview_url(profile: &RemoteProfile) -> String {
    format!(
        "{OVERVIEW_BASE_URL}/a{}w{}p{}",
        profile.account_id, profile.internal_web_property_id, profile.id
    )
}

/// Everything written for one connected view.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectedProfile {
    pub location: Location,
    pub channel: Channel,
    pub profile: Profile,
    pub website: Option<Location>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionReport {
    /// In selection order, one per item
    pub notices: Vec<Notice>,
    pub connected: Vec<ConnectedProfile>,
}

#[derive(Debug, Clone)]
pub enum ConnectionOutcome {
    /// Nothing was selected; nothing was written.
    EmptySelection(Notice),
    Processed(ConnectionReport),
}

impl ConnectionOutcome {
    pub fn notices(&self) -> &[Notice] {
        match self {
            ConnectionOutcome::EmptySelection(notice) => std::slice::from_ref(notice),
            ConnectionOutcome::Processed(report) => &report.notices,
        }
    }
}

#[derive(Clone)]
pub struct ConnectionWorkflow {
    storage: Arc<dyn Storage>,
    gateway: Arc<dyn AnalyticsGateway>,
    titles: Arc<dyn TitleFetcher>,
}

impl ConnectionWorkflow {
    pub fn new(
        storage: Arc<dyn Storage>,
        gateway: Arc<dyn AnalyticsGateway>,
        titles: Arc<dyn TitleFetcher>,
    ) -> Self {
        Self {
            storage,
            gateway,
            titles,
        }
    }

    /// Connect every selected view.
    ///
    /// Items are processed in order, each with its own writes. A view whose
    /// location already exists is skipped with a warning; any other failure
    /// aborts the request and leaves earlier items in place.
    ///
    /// The website lookup is a read followed by an insert. Two requests
    /// resolving the same new website at the same time can both miss the
    /// lookup; the slower insert then fails with `StorageError::Conflict`.
    pub async fn connect(
        &self,
        token: &OAuthToken,
        selection: &[String],
    ) -> Result<ConnectionOutcome, ConnectError> {
        if selection.is_empty() {
            return Ok(ConnectionOutcome::EmptySelection(Notice::empty_selection()));
        }

        let references = selection
            .iter()
            .map(|key| key.parse::<RemoteProfileRef>())
            .collect::<Result<Vec<_>, _>>()?;

        let application_id = token.application.id;
        if self
            .storage
            .get_application_by_id(application_id)
            .await?
            .is_none()
        {
            return Err(ConnectError::UnknownApplication(application_id));
        }

        let token = &self.gateway.fresh_token(token).await?;
        let mut report = ConnectionReport::default();
        for reference in &references {
            let remote = self.gateway.resolve_profile(token, reference).await?;

            match self.connect_profile(token, &remote).await? {
                Some(connected) => {
                    info!(
                        profile_id = %remote.id,
                        location_id = connected.location.id,
                        "connected Google Analytics profile"
                    );
                    report.notices.push(Notice::connected(&remote.name));
                    report.connected.push(connected);
                }
                None => {
                    warn!(profile_id = %remote.id, "Google Analytics profile already connected");
                    report.notices.push(Notice::already_connected(&remote.name));
                }
            }
        }

        Ok(ConnectionOutcome::Processed(report))
    }

    /// `None` when the view's location already exists.
    async fn connect_profile(
        &self,
        token: &OAuthToken,
        remote: &RemoteProfile,
    ) -> Result<Option<ConnectedProfile>, ConnectError> {
        let mut wizard = ChannelWizard::start(Module::GoogleAnalytics);
        wizard.set_name(remote.name.clone())?;

        let location = match self
            .storage
            .create_location(&NewLocation {
                identifier: remote.id.clone(),
                name: remote.name.clone(),
                url: overview_url(remote),
                module: Module::GoogleAnalytics,
            })
            .await
        {
            Ok(location) => location,
            Err(StorageError::Conflict) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        wizard.add_location(location)?;
        wizard.persist(self.storage.as_ref()).await?;
        let ChannelWithLocations {
            channel,
            mut locations,
        } = wizard.end()?;
        let location = locations.remove(0);

        let website = match remote.website_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Some(self.resolve_website(url).await?),
            _ => {
                debug!(profile_id = %remote.id, "profile has no website URL");
                None
            }
        };

        self.storage.create_token(&token.bind_to(location.id)).await?;

        let profile = self
            .storage
            .create_profile(&NewProfile {
                account_id: remote.account_id.clone(),
                property_id: remote.web_property_id.clone(),
                profile_id: remote.id.clone(),
                display_name: remote.name.clone(),
                location_id: location.id,
                belonging_location_id: website.as_ref().map(|website| website.id),
            })
            .await?;

        Ok(Some(ConnectedProfile {
            location,
            channel,
            profile,
            website,
        }))
    }

    /// The website location for `url`, created with its own channel on first use.
    async fn resolve_website(&self, url: &str) -> Result<Location, ConnectError> {
        if let Some(existing) = self.storage.find_location_by_url(url).await? {
            debug!(url, location_id = existing.id, "reusing website location");
            return Ok(existing);
        }

        let name = self
            .titles
            .fetch_title(url)
            .await
            .unwrap_or_else(|| url.to_string());

        let mut wizard = ChannelWizard::start(Module::Website);
        wizard.set_name(name.clone())?;

        let location = self
            .storage
            .create_location(&NewLocation {
                identifier: url.to_string(),
                name,
                url: url.to_string(),
                module: Module::Website,
            })
            .await?;

        wizard.add_location(location)?;
        wizard.persist(self.storage.as_ref()).await?;
        let mut built = wizard.end()?;

        info!(url, location_id = built.locations[0].id, "created website location");
        Ok(built.locations.remove(0))
    }
}
