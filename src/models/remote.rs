//! Shapes returned by the Google Analytics Management API and the composite
//! key the listing hands back to the browser.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Web property wildcard accepted by the Management API.
pub const ALL_PROPERTIES: &str = "~all";

const KEY_DELIMITER: char = '|';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAccount {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// An Analytics view (profile) as reported by the Management API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProfile {
    pub id: String,
    pub account_id: String,
    pub web_property_id: String,
    #[serde(default)]
    pub internal_web_property_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub website_url: Option<String>,
}

impl RemoteProfile {
    pub fn selection_key(&self) -> String {
        RemoteProfileRef {
            account_id: self.account_id.clone(),
            property_id: Some(self.web_property_id.clone()),
            profile_id: self.id.clone(),
        }
        .to_string()
    }
}

/// Composite key identifying a remote view.
///
/// The canonical form is `accountId|propertyId|profileId`. The short form
/// `accountId|profileId` leaves `property_id` unset and the view is looked up
/// among all of the account's properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteProfileRef {
    pub account_id: String,
    pub property_id: Option<String>,
    pub profile_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid profile selection '{key}': {reason}")]
pub struct InvalidProfileKey {
    pub key: String,
    pub reason: &'static str,
}

impl FromStr for RemoteProfileRef {
    type Err = InvalidProfileKey;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| InvalidProfileKey {
            key: key.to_string(),
            reason,
        };

        let parts: Vec<&str> = key.split(KEY_DELIMITER).map(str::trim).collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(invalid("empty segment"));
        }

        match parts.as_slice() {
            [account_id, property_id, profile_id] => Ok(Self {
                account_id: account_id.to_string(),
                property_id: Some(property_id.to_string()),
                profile_id: profile_id.to_string(),
            }),
            [account_id, profile_id] => Ok(Self {
                account_id: account_id.to_string(),
                property_id: None,
                profile_id: profile_id.to_string(),
            }),
            _ => Err(invalid("expected accountId|propertyId|profileId")),
        }
    }
}

impl fmt::Display for RemoteProfileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.property_id {
            Some(property_id) => write!(
                f,
                "{}{KEY_DELIMITER}{}{KEY_DELIMITER}{}",
                self.account_id, property_id, self.profile_id
            ),
            None => write!(f, "{}{KEY_DELIMITER}{}", self.account_id, self.profile_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_part_keys() {
        let parsed: RemoteProfileRef = "111|UA-111-1|222".parse().unwrap();
        assert_eq!(parsed.account_id, "111");
        assert_eq!(parsed.property_id.as_deref(), Some("UA-111-1"));
        assert_eq!(parsed.profile_id, "222");
        assert_eq!(parsed.to_string(), "111|UA-111-1|222");
    }

    #[test]
    fn parses_short_keys_without_property() {
        let parsed: RemoteProfileRef = "111|333".parse().unwrap();
        assert_eq!(parsed.property_id, None);
        assert_eq!(parsed.profile_id, "333");
    }

    #[test]
    fn rejects_malformed_keys() {
        for key in ["", "111", "111||222", "a|b|c|d", "|222", " | "] {
            let err = key.parse::<RemoteProfileRef>().unwrap_err();
            assert_eq!(err.key, key);
        }
    }

    #[test]
    fn deserializes_management_profile() {
        let json = r#"{
            "id": "222",
            "kind": "analytics#profile",
            "accountId": "111",
            "webPropertyId": "UA-111-1",
            "internalWebPropertyId": "999",
            "name": "All Web Site Data",
            "websiteUrl": "http://example.com"
        }"#;
        let profile: RemoteProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.internal_web_property_id, "999");
        assert_eq!(profile.website_url.as_deref(), Some("http://example.com"));
        assert_eq!(profile.selection_key(), "111|UA-111-1|222");
    }
}
