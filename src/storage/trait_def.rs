use crate::models::{
    Application, Channel, Location, Module, NewChannel, NewLocation, NewProfile, NewToken,
    Profile, TokenBinding,
};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("a location with this identifier already exists for the module")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Other(err.into())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;

    /// Register or replace the OAuth application for a resource owner
    async fn upsert_application(
        &self,
        resource_owner: &str,
        app_key: &str,
        app_secret: &str,
    ) -> Result<Application>;

    async fn get_application(&self, resource_owner: &str) -> Result<Option<Application>>;

    async fn get_application_by_id(&self, id: i64) -> Result<Option<Application>>;

    /// Insert a location. Fails with `StorageError::Conflict` when the
    /// `(module, identifier)` pair is already taken.
    async fn create_location(&self, location: &NewLocation) -> StorageResult<Location>;

    async fn get_location(&self, id: i64) -> Result<Option<Location>>;

    /// Exact URL match across all modules
    async fn find_location_by_url(&self, url: &str) -> Result<Option<Location>>;

    async fn list_locations(&self, module: Option<Module>) -> Result<Vec<Location>>;

    /// Insert a channel and attach the given locations to it atomically
    async fn create_channel(
        &self,
        channel: &NewChannel,
        location_ids: &[i64],
    ) -> StorageResult<Channel>;

    async fn list_channels(&self) -> Result<Vec<Channel>>;

    async fn create_profile(&self, profile: &NewProfile) -> StorageResult<Profile>;

    async fn get_profile_by_location(&self, location_id: i64) -> Result<Option<Profile>>;

    async fn list_profiles(&self) -> Result<Vec<Profile>>;

    /// Remote profile ids that already have a local profile record
    async fn connected_profile_ids(&self) -> Result<HashSet<String>>;

    async fn create_token(&self, token: &NewToken) -> StorageResult<TokenBinding>;

    async fn get_token_for_location(&self, location_id: i64) -> Result<Option<TokenBinding>>;

    async fn list_tokens(&self) -> Result<Vec<TokenBinding>>;
}
