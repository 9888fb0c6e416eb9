//! Connecting Google Analytics views as local locations and channels.

pub mod catalog;
pub mod lister;
pub mod notice;
pub mod website;
pub mod wizard;
pub mod workflow;

use thiserror::Error;

use crate::google::GatewayError;
use crate::models::remote::InvalidProfileKey;
use crate::storage::StorageError;

pub use catalog::ProfileCatalog;
pub use lister::{ListedProfile, PropertyLister, PropertyListing};
pub use notice::{Notice, NoticeKind};
pub use website::{HttpTitleFetcher, TitleFetcher};
pub use wizard::{ChannelWithLocations, ChannelWizard, WizardError};
pub use workflow::{
    overview_url, ConnectedProfile, ConnectionOutcome, ConnectionReport, ConnectionWorkflow,
};

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    InvalidSelection(#[from] InvalidProfileKey),
    #[error("application {0} is no longer registered; run the OAuth flow again")]
    UnknownApplication(i64),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Wizard(#[from] WizardError),
}

impl From<anyhow::Error> for ConnectError {
    fn from(err: anyhow::Error) -> Self {
        ConnectError::Storage(StorageError::Other(err))
    }
}
