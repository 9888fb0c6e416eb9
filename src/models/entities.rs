use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Capability descriptor shared by channels and locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Module {
    GoogleAnalytics,
    Website,
}

impl Module {
    pub const fn identifier(self) -> &'static str {
        match self {
            Module::GoogleAnalytics => "google-analytics",
            Module::Website => "website",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for Module {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google-analytics" => Ok(Module::GoogleAnalytics),
            "website" => Ok(Module::Website),
            other => Err(anyhow::anyhow!("unknown module '{other}'")),
        }
    }
}

/// Registered OAuth client for a resource owner.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: i64,
    pub resource_owner: String,
    pub app_key: String,
    #[serde(skip_serializing)]
    pub app_secret: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    pub module: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewChannel {
    pub name: String,
    pub module: Module,
}

/// A connectable endpoint: an Analytics view or the website it measures.
///
/// `identifier` is unique per module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: i64,
    pub identifier: String,
    pub name: String,
    pub url: String,
    pub module: String,
    pub channel_id: Option<i64>,
    pub created_at: i64,
}

impl Location {
    pub fn module(&self) -> anyhow::Result<Module> {
        self.module.parse()
    }
}

#[derive(Debug, Clone)]
pub struct NewLocation {
    pub identifier: String,
    pub name: String,
    pub url: String,
    pub module: Module,
}

/// Local mirror of a remote Analytics view.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: i64,
    pub identifier: String,
    pub account_id: String,
    pub property_id: String,
    pub profile_id: String,
    pub display_name: String,
    pub location_id: i64,
    pub belonging_location_id: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub account_id: String,
    pub property_id: String,
    pub profile_id: String,
    pub display_name: String,
    pub location_id: i64,
    pub belonging_location_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_identifiers_parse_back() {
        for module in [Module::GoogleAnalytics, Module::Website] {
            assert_eq!(module.identifier().parse::<Module>().unwrap(), module);
        }
        assert!("twitter".parse::<Module>().is_err());
    }
}
