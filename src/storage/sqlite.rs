use crate::models::{
    Application, Channel, Location, Module, NewChannel, NewLocation, NewProfile, NewToken,
    Profile, TokenBinding,
};
use crate::storage::{unix_now, Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;

const APPLICATION_COLUMNS: &str = "id, resource_owner, app_key, app_secret, created_at";
const LOCATION_COLUMNS: &str = "id, identifier, name, url, module, channel_id, created_at";
const CHANNEL_COLUMNS: &str = "id, name, module, created_at";
const PROFILE_COLUMNS: &str = "id, identifier, account_id, property_id, profile_id, display_name, location_id, belonging_location_id, created_at";
const TOKEN_COLUMNS: &str = "id, application_id, location_id, access_token, refresh_token, expires_in, expires_at, scope, created_at";

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_owner TEXT NOT NULL UNIQUE,
                app_key TEXT NOT NULL,
                app_secret TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS channels (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                module TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identifier TEXT NOT NULL,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                module TEXT NOT NULL,
                channel_id INTEGER REFERENCES channels(id),
                created_at INTEGER NOT NULL,
                UNIQUE (module, identifier)
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_locations_url ON locations(url)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identifier TEXT NOT NULL,
                account_id TEXT NOT NULL,
                property_id TEXT NOT NULL,
                profile_id TEXT NOT NULL,
                display_name TEXT NOT NULL,
                location_id INTEGER NOT NULL REFERENCES locations(id),
                belonging_location_id INTEGER REFERENCES locations(id),
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_profiles_location ON profiles(location_id)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                application_id INTEGER NOT NULL REFERENCES applications(id),
                location_id INTEGER NOT NULL REFERENCES locations(id),
                access_token TEXT NOT NULL,
                refresh_token TEXT,
                expires_in INTEGER,
                expires_at INTEGER,
                scope TEXT,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tokens_location ON tokens(location_id)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn upsert_application(
        &self,
        resource_owner: &str,
        app_key: &str,
        app_secret: &str,
    ) -> Result<Application> {
        let sql = format!(
            r#"
            INSERT INTO applications (resource_owner, app_key, app_secret, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (resource_owner) DO UPDATE SET
                app_key = excluded.app_key,
                app_secret = excluded.app_secret
            RETURNING {APPLICATION_COLUMNS}
            "#
        );

        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(resource_owner)
            .bind(app_key)
            .bind(app_secret)
            .bind(unix_now())
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(application)
    }

    async fn get_application(&self, resource_owner: &str) -> Result<Option<Application>> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE resource_owner = ?");
        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(resource_owner)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(application)
    }

    async fn get_application_by_id(&self, id: i64) -> Result<Option<Application>> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?");
        let application = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(application)
    }

    async fn create_location(&self, location: &NewLocation) -> StorageResult<Location> {
        let sql = format!(
            r#"
            INSERT INTO locations (identifier, name, url, module, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (module, identifier) DO NOTHING
            RETURNING {LOCATION_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, Location>(&sql)
            .bind(&location.identifier)
            .bind(&location.name)
            .bind(&location.url)
            .bind(location.module.identifier())
            .bind(unix_now())
            .fetch_optional(self.pool.as_ref())
            .await?;

        created.ok_or(StorageError::Conflict)
    }

    async fn get_location(&self, id: i64) -> Result<Option<Location>> {
        let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?");
        let location = sqlx::query_as::<_, Location>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(location)
    }

    async fn find_location_by_url(&self, url: &str) -> Result<Option<Location>> {
        let sql = format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE url = ? ORDER BY id LIMIT 1"
        );
        let location = sqlx::query_as::<_, Location>(&sql)
            .bind(url)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(location)
    }

    async fn list_locations(&self, module: Option<Module>) -> Result<Vec<Location>> {
        let sql = format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE (?1 IS NULL OR module = ?1) ORDER BY id"
        );
        let locations = sqlx::query_as::<_, Location>(&sql)
            .bind(module.map(Module::identifier))
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(locations)
    }

    async fn create_channel(
        &self,
        channel: &NewChannel,
        location_ids: &[i64],
    ) -> StorageResult<Channel> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO channels (name, module, created_at) VALUES (?, ?, ?) RETURNING {CHANNEL_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Channel>(&sql)
            .bind(&channel.name)
            .bind(channel.module.identifier())
            .bind(unix_now())
            .fetch_one(&mut *tx)
            .await?;

        for location_id in location_ids {
            let updated = sqlx::query("UPDATE locations SET channel_id = ? WHERE id = ?")
                .bind(created.id)
                .bind(location_id)
                .execute(&mut *tx)
                .await?;
            if updated.rows_affected() == 0 {
                return Err(anyhow::anyhow!("location {location_id} does not exist").into());
            }
        }

        tx.commit().await?;

        Ok(created)
    }

    async fn list_channels(&self) -> Result<Vec<Channel>> {
        let sql = format!("SELECT {CHANNEL_COLUMNS} FROM channels ORDER BY id");
        let channels = sqlx::query_as::<_, Channel>(&sql)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(channels)
    }

    async fn create_profile(&self, profile: &NewProfile) -> StorageResult<Profile> {
        let sql = format!(
            r#"
            INSERT INTO profiles (
                identifier, account_id, property_id, profile_id, display_name,
                location_id, belonging_location_id, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {PROFILE_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, Profile>(&sql)
            .bind(&profile.profile_id)
            .bind(&profile.account_id)
            .bind(&profile.property_id)
            .bind(&profile.profile_id)
            .bind(&profile.display_name)
            .bind(profile.location_id)
            .bind(profile.belonging_location_id)
            .bind(unix_now())
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(created)
    }

    async fn get_profile_by_location(&self, location_id: i64) -> Result<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE location_id = ?");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(location_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(profile)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY id");
        let profiles = sqlx::query_as::<_, Profile>(&sql)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(profiles)
    }

    async fn connected_profile_ids(&self) -> Result<HashSet<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT profile_id FROM profiles")
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(ids.into_iter().collect())
    }

    async fn create_token(&self, token: &NewToken) -> StorageResult<TokenBinding> {
        let sql = format!(
            r#"
            INSERT INTO tokens (
                application_id, location_id, access_token, refresh_token,
                expires_in, expires_at, scope, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {TOKEN_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, TokenBinding>(&sql)
            .bind(token.application_id)
            .bind(token.location_id)
            .bind(&token.access_token)
            .bind(&token.refresh_token)
            .bind(token.expires_in)
            .bind(token.expires_at)
            .bind(&token.scope)
            .bind(unix_now())
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(created)
    }

    async fn get_token_for_location(&self, location_id: i64) -> Result<Option<TokenBinding>> {
        let sql = format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE location_id = ? ORDER BY id DESC LIMIT 1"
        );
        let token = sqlx::query_as::<_, TokenBinding>(&sql)
            .bind(location_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(token)
    }

    async fn list_tokens(&self) -> Result<Vec<TokenBinding>> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM tokens ORDER BY id");
        let tokens = sqlx::query_as::<_, TokenBinding>(&sql)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(tokens)
    }
}
