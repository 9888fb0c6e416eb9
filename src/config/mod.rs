use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub google: GoogleConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// When both are set, the Google application is registered at startup
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub management_url: String,
    pub reporting_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub ttl_secs: u64,
    pub max_entries: u64,
    pub cookie_secure: bool,
}

impl GoogleConfig {
    pub const DEFAULT_AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    pub const DEFAULT_TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";
    pub const DEFAULT_MANAGEMENT_URL: &'static str = "https://www.googleapis.com/analytics/v3";
    pub const DEFAULT_REPORTING_URL: &'static str =
        "https://analyticsreporting.googleapis.com/v4";

    /// Configuration pointing every endpoint at `base_url`, for tests
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: "http://127.0.0.1:8080/channels/google-analytics/callback".to_string(),
            auth_url: format!("{base}/o/oauth2/v2/auth"),
            token_url: format!("{base}/token"),
            management_url: format!("{base}/analytics/v3"),
            reporting_url: format!("{base}/v4"),
            timeout_secs: 5,
        }
    }
}

impl SessionConfig {
    const fn default_ttl_secs() -> u64 {
        3600
    }

    const fn default_max_entries() -> u64 {
        10_000
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: Self::default_ttl_secs(),
            max_entries: Self::default_max_entries(),
            cookie_secure: false,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./gaconnect.db?mode=rwc".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let client_id = std::env::var("GOOGLE_CLIENT_ID").ok();
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").ok();
        if client_id.is_some() != client_secret.is_some() {
            tracing::warn!(
                "Only one of GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET is set; the application will not be registered at startup"
            );
        }

        let redirect_uri = std::env::var("GOOGLE_REDIRECT_URI").unwrap_or_else(|_| {
            format!("http://{api_host}:{api_port}/channels/google-analytics/callback")
        });

        let timeout_secs = std::env::var("GOOGLE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let google = GoogleConfig {
            client_id,
            client_secret,
            redirect_uri,
            auth_url: std::env::var("GOOGLE_AUTH_URL")
                .unwrap_or_else(|_| GoogleConfig::DEFAULT_AUTH_URL.to_string()),
            token_url: std::env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| GoogleConfig::DEFAULT_TOKEN_URL.to_string()),
            management_url: std::env::var("GOOGLE_MANAGEMENT_URL")
                .unwrap_or_else(|_| GoogleConfig::DEFAULT_MANAGEMENT_URL.to_string()),
            reporting_url: std::env::var("GOOGLE_REPORTING_URL")
                .unwrap_or_else(|_| GoogleConfig::DEFAULT_REPORTING_URL.to_string()),
            timeout_secs,
        };

        let session = SessionConfig {
            ttl_secs: std::env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or_else(SessionConfig::default_ttl_secs),
            max_entries: std::env::var("SESSION_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or_else(SessionConfig::default_max_entries),
            cookie_secure: std::env::var("SESSION_COOKIE_SECURE")
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
        };

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            google,
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_config_routes_every_endpoint_to_the_mock() {
        let google = GoogleConfig::with_base_url("http://127.0.0.1:9999/");
        assert_eq!(google.token_url, "http://127.0.0.1:9999/token");
        assert_eq!(google.management_url, "http://127.0.0.1:9999/analytics/v3");
        assert_eq!(google.reporting_url, "http://127.0.0.1:9999/v4");
    }

    #[test]
    fn bool_flags_accept_common_spellings() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(parse_bool("yes"));
        assert!(!parse_bool("off"));
    }
}
