//! Shared fixtures for the integration tests: in-memory storage and fake
//! Google collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use gaconnect::connect::TitleFetcher;
use gaconnect::google::{AnalyticsGateway, GatewayError, GatewayResult, RESOURCE_OWNER};
use gaconnect::models::{OAuthToken, RemoteAccount, RemoteProfile, ALL_PROPERTIES};
use gaconnect::storage::{SqliteStorage, Storage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory SQLite. A single connection keeps every query on the same database.
pub async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

/// Register the Google application and hand out a session token for it.
pub async fn registered_token(storage: &dyn Storage) -> OAuthToken {
    let application = storage
        .upsert_application(RESOURCE_OWNER, "client-id", "client-secret")
        .await
        .unwrap();
    OAuthToken::new(
        application,
        "session-access-token",
        Some("session-refresh-token".to_string()),
        Some(3600),
        Some("https://www.googleapis.com/auth/analytics.readonly".to_string()),
    )
}

pub fn remote_profile(
    account_id: &str,
    web_property_id: &str,
    id: &str,
    name: &str,
    website_url: Option<&str>,
) -> RemoteProfile {
    RemoteProfile {
        id: id.to_string(),
        account_id: account_id.to_string(),
        web_property_id: web_property_id.to_string(),
        internal_web_property_id: format!("9{id}"),
        name: name.to_string(),
        website_url: website_url.map(str::to_string),
    }
}

/// Management API stand-in backed by a fixed list of views.
#[derive(Default)]
pub struct FakeGateway {
    accounts: Vec<RemoteAccount>,
    profiles: Vec<RemoteProfile>,
    unavailable_account: Option<String>,
    calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new(profiles: Vec<RemoteProfile>) -> Self {
        let mut accounts: Vec<RemoteAccount> = Vec::new();
        for profile in &profiles {
            if !accounts.iter().any(|account| account.id == profile.account_id) {
                accounts.push(RemoteAccount {
                    id: profile.account_id.clone(),
                    name: format!("Account {}", profile.account_id),
                });
            }
        }

        Self {
            accounts,
            profiles,
            unavailable_account: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Listing the views of `account_id` fails with a server error.
    pub fn failing_profiles_for(mut self, account_id: &str) -> Self {
        self.unavailable_account = Some(account_id.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalyticsGateway for FakeGateway {
    async fn list_accounts(&self, _token: &OAuthToken) -> GatewayResult<Vec<RemoteAccount>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.clone())
    }

    async fn list_profiles(
        &self,
        _token: &OAuthToken,
        account_id: &str,
        web_property_id: &str,
    ) -> GatewayResult<Vec<RemoteProfile>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable_account.as_deref() == Some(account_id) {
            return Err(GatewayError::Api {
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }
        Ok(self
            .profiles
            .iter()
            .filter(|profile| profile.account_id == account_id)
            .filter(|profile| {
                web_property_id == ALL_PROPERTIES || profile.web_property_id == web_property_id
            })
            .cloned()
            .collect())
    }

    async fn get_profile(
        &self,
        _token: &OAuthToken,
        account_id: &str,
        web_property_id: &str,
        profile_id: &str,
    ) -> GatewayResult<RemoteProfile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.profiles
            .iter()
            .find(|profile| {
                profile.account_id == account_id
                    && profile.web_property_id == web_property_id
                    && profile.id == profile_id
            })
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("profile {profile_id}")))
    }
}

/// Title lookup answering from a map and recording every URL it was asked for.
#[derive(Default)]
pub struct FakeTitles {
    titles: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl FakeTitles {
    pub fn new(titles: &[(&str, &str)]) -> Self {
        Self {
            titles: titles
                .iter()
                .map(|(url, title)| (url.to_string(), title.to_string()))
                .collect(),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl TitleFetcher for FakeTitles {
    async fn fetch_title(&self, url: &str) -> Option<String> {
        self.requested.lock().unwrap().push(url.to_string());
        self.titles.get(url).cloned()
    }
}
