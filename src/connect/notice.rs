use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Warning,
}

/// User-facing message surfaced after a request completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            message: message.into(),
        }
    }

    pub fn empty_selection() -> Self {
        Self::warning("Please select at least one Google Analytics property.")
    }

    pub fn already_connected(profile_name: &str) -> Self {
        Self::warning(format!(
            "The Google Analytics property '{profile_name}' is already connected."
        ))
    }

    pub fn connected(profile_name: &str) -> Self {
        Self::success(format!(
            "The Google Analytics property '{profile_name}' was connected successfully."
        ))
    }
}
