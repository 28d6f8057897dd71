//! Targeting rules that override a link's destination for a visitor segment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Visitor attribute a targeting rule is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Device,
    Os,
    Browser,
    Country,
    Language,
}

impl TargetType {
    pub const ALL: [TargetType; 5] = [
        TargetType::Device,
        TargetType::Os,
        TargetType::Browser,
        TargetType::Country,
        TargetType::Language,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Device => "DEVICE",
            TargetType::Os => "OS",
            TargetType::Browser => "BROWSER",
            TargetType::Country => "COUNTRY",
            TargetType::Language => "LANGUAGE",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEVICE" => Ok(TargetType::Device),
            "OS" => Ok(TargetType::Os),
            "BROWSER" => Ok(TargetType::Browser),
            "COUNTRY" => Ok(TargetType::Country),
            "LANGUAGE" => Ok(TargetType::Language),
            other => Err(format!("unknown target type: {other}")),
        }
    }
}

/// Canonical form of a targeting value: trimmed and lower-cased.
///
/// Applied both when a rule is stored and when a detected attribute is compared,
/// so matching is an exact string comparison.
pub fn normalize_target_value(value: &str) -> String {
    value.trim().to_lowercase()
}

/// A stored targeting rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkTarget {
    pub id: i64,
    pub link_id: i64,
    pub target_type: TargetType,
    pub value: String,
    pub target_url: String,
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input data for creating a targeting rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLinkTarget {
    pub link_id: i64,
    pub target_type: TargetType,
    pub value: String,
    pub target_url: String,
    pub priority: i32,
}

impl NewLinkTarget {
    /// Builds a rule with its value already normalized.
    pub fn new(
        link_id: i64,
        target_type: TargetType,
        value: &str,
        target_url: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            link_id,
            target_type,
            value: normalize_target_value(value),
            target_url: target_url.into(),
            priority,
        }
    }
}
