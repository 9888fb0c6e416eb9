use std::collections::HashSet;
use std::sync::Arc;

use crate::storage::Storage;

/// Which remote views already have a local profile.
#[derive(Clone)]
pub struct ProfileCatalog {
    storage: Arc<dyn Storage>,
}

impl ProfileCatalog {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn connected_ids(&self) -> anyhow::Result<HashSet<String>> {
        self.storage.connected_profile_ids().await
    }
}
