//! Integration tests for the storage backends
//!
//! Tests can be filtered by database backend using the DATABASE_BACKEND environment variable:
//! - `DATABASE_BACKEND=sqlite cargo test` - Run only SQLite tests
//! - `DATABASE_BACKEND=postgres cargo test` - Run only PostgreSQL tests
//! - By default, both backends are tested; PostgreSQL needs DATABASE_URL

use gaconnect::models::{Module, NewChannel, NewLocation, NewProfile};
use gaconnect::storage::{PostgresStorage, SqliteStorage, Storage, StorageError};
use std::sync::Arc;

/// Get the database backend to test from environment variable
fn should_test_backend(backend: &str) -> bool {
    match std::env::var("DATABASE_BACKEND") {
        Ok(val) => val.to_lowercase() == backend.to_lowercase(),
        Err(_) => true,
    }
}

async fn create_sqlite_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

async fn create_postgres_storage() -> Option<Arc<dyn Storage>> {
    let db_url = std::env::var("DATABASE_URL").ok()?;
    let storage = PostgresStorage::new(&db_url, 5).await.ok()?;
    storage.init().await.ok()?;
    Some(Arc::new(storage))
}

/// Identifiers unique to one test run so a shared PostgreSQL database can be reused.
fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", rand::random::<u64>())
}

fn analytics_location(identifier: &str) -> NewLocation {
    NewLocation {
        identifier: identifier.to_string(),
        name: format!("View {identifier}"),
        url: format!("https://www.google.com/analytics/web/#report/visitors-overview/a1w2p{identifier}"),
        module: Module::GoogleAnalytics,
    }
}

async fn check_application_upsert(storage: Arc<dyn Storage>) {
    let owner = unique("Owner");
    assert!(storage.get_application(&owner).await.unwrap().is_none());

    let first = storage.upsert_application(&owner, "key-1", "secret-1").await.unwrap();
    let second = storage.upsert_application(&owner, "key-2", "secret-2").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.app_key, "key-2");
    assert_eq!(second.app_secret, "secret-2");

    let loaded = storage.get_application_by_id(first.id).await.unwrap().unwrap();
    assert_eq!(loaded.resource_owner, owner);
    assert_eq!(loaded.app_key, "key-2");
}

async fn check_location_conflict(storage: Arc<dyn Storage>) {
    let identifier = unique("profile");
    let created = storage
        .create_location(&analytics_location(&identifier))
        .await
        .unwrap();
    assert_eq!(created.module().unwrap(), Module::GoogleAnalytics);
    assert_eq!(created.channel_id, None);

    let duplicate = storage.create_location(&analytics_location(&identifier)).await;
    assert!(matches!(duplicate, Err(StorageError::Conflict)));

    // Same identifier under another module is a different location.
    let website = storage
        .create_location(&NewLocation {
            identifier: identifier.clone(),
            name: "Site".to_string(),
            url: unique("https://site.example"),
            module: Module::Website,
        })
        .await
        .unwrap();
    assert_ne!(website.id, created.id);
}

async fn check_channel_attaches_locations(storage: Arc<dyn Storage>) {
    let first = storage
        .create_location(&analytics_location(&unique("profile")))
        .await
        .unwrap();
    let second = storage
        .create_location(&analytics_location(&unique("profile")))
        .await
        .unwrap();

    let channel = storage
        .create_channel(
            &NewChannel {
                name: "All Web Site Data".to_string(),
                module: Module::GoogleAnalytics,
            },
            &[first.id, second.id],
        )
        .await
        .unwrap();
    assert_eq!(channel.module, "google-analytics");

    for id in [first.id, second.id] {
        let location = storage.get_location(id).await.unwrap().unwrap();
        assert_eq!(location.channel_id, Some(channel.id));
    }
    assert!(storage
        .list_channels()
        .await
        .unwrap()
        .iter()
        .any(|listed| listed.id == channel.id));
}

async fn check_find_by_url_and_module_filter(storage: Arc<dyn Storage>) {
    let url = unique("https://example.com");
    let website = storage
        .create_location(&NewLocation {
            identifier: url.clone(),
            name: "Example".to_string(),
            url: url.clone(),
            module: Module::Website,
        })
        .await
        .unwrap();

    let found = storage.find_location_by_url(&url).await.unwrap().unwrap();
    assert_eq!(found.id, website.id);
    assert!(storage
        .find_location_by_url(&format!("{url}/other"))
        .await
        .unwrap()
        .is_none());

    let websites = storage.list_locations(Some(Module::Website)).await.unwrap();
    assert!(websites.iter().all(|l| l.module == "website"));
    assert!(websites.iter().any(|l| l.id == website.id));

    let all = storage.list_locations(None).await.unwrap();
    assert!(all.len() >= websites.len());
}

async fn check_profiles_and_tokens(storage: Arc<dyn Storage>) {
    let application = storage
        .upsert_application(&unique("Owner"), "key", "secret")
        .await
        .unwrap();
    let profile_id = unique("view");
    let location = storage
        .create_location(&analytics_location(&profile_id))
        .await
        .unwrap();

    let profile = storage
        .create_profile(&NewProfile {
            account_id: "111".to_string(),
            property_id: "UA-111-1".to_string(),
            profile_id: profile_id.clone(),
            display_name: "All Web Site Data".to_string(),
            location_id: location.id,
            belonging_location_id: None,
        })
        .await
        .unwrap();
    assert_eq!(profile.identifier, profile_id);
    assert_eq!(profile.belonging_location_id, None);

    let connected = storage.connected_profile_ids().await.unwrap();
    assert!(connected.contains(&profile_id));

    let loaded = storage
        .get_profile_by_location(location.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.id, profile.id);

    let token = gaconnect::models::NewToken {
        application_id: application.id,
        location_id: location.id,
        access_token: "access".to_string(),
        refresh_token: Some("refresh".to_string()),
        expires_in: Some(3600),
        expires_at: Some(1_700_000_000),
        scope: None,
    };
    let binding = storage.create_token(&token).await.unwrap();
    assert_eq!(binding.location_id, location.id);

    let loaded = storage
        .get_token_for_location(location.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.access_token, "access");
    assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));
    assert_eq!(loaded.expires_at, Some(1_700_000_000));
}

#[tokio::test]
async fn test_application_upsert_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    check_application_upsert(create_sqlite_storage().await).await;
}

#[tokio::test]
async fn test_location_conflict_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    check_location_conflict(create_sqlite_storage().await).await;
}

#[tokio::test]
async fn test_channel_attaches_locations_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    check_channel_attaches_locations(create_sqlite_storage().await).await;
}

#[tokio::test]
async fn test_find_by_url_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    check_find_by_url_and_module_filter(create_sqlite_storage().await).await;
}

#[tokio::test]
async fn test_profiles_and_tokens_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    check_profiles_and_tokens(create_sqlite_storage().await).await;
}

#[tokio::test]
async fn test_channel_with_unknown_location_rolls_back_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    let storage = create_sqlite_storage().await;
    let location = storage
        .create_location(&analytics_location("222"))
        .await
        .unwrap();

    // Attaching is all or nothing: the missing id fails the transaction.
    let result = storage
        .create_channel(
            &NewChannel {
                name: "Broken".to_string(),
                module: Module::GoogleAnalytics,
            },
            &[location.id, 9_999],
        )
        .await;

    assert!(result.is_err());
    assert!(storage.list_channels().await.unwrap().is_empty());
    let location = storage.get_location(location.id).await.unwrap().unwrap();
    assert_eq!(location.channel_id, None);
}

#[tokio::test]
async fn test_application_upsert_postgres() {
    if !should_test_backend("postgres") {
        return;
    }
    let Some(storage) = create_postgres_storage().await else {
        return;
    };
    check_application_upsert(storage).await;
}

#[tokio::test]
async fn test_location_conflict_postgres() {
    if !should_test_backend("postgres") {
        return;
    }
    let Some(storage) = create_postgres_storage().await else {
        return;
    };
    check_location_conflict(storage).await;
}

#[tokio::test]
async fn test_channel_attaches_locations_postgres() {
    if !should_test_backend("postgres") {
        return;
    }
    let Some(storage) = create_postgres_storage().await else {
        return;
    };
    check_channel_attaches_locations(storage).await;
}

#[tokio::test]
async fn test_find_by_url_postgres() {
    if !should_test_backend("postgres") {
        return;
    }
    let Some(storage) = create_postgres_storage().await else {
        return;
    };
    check_find_by_url_and_module_filter(storage).await;
}

#[tokio::test]
async fn test_profiles_and_tokens_postgres() {
    if !should_test_backend("postgres") {
        return;
    }
    let Some(storage) = create_postgres_storage().await else {
        return;
    };
    check_profiles_and_tokens(storage).await;
}
