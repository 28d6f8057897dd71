//! Link entity representing a short link and its redirect policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a cloaked link presents its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloakType {
    /// Destination rendered inside a full-page iframe.
    Iframe,
    /// `<meta http-equiv="refresh">` page.
    MetaRefresh,
    /// Page that navigates via `window.location.replace`.
    JsRedirect,
}

impl CloakType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloakType::Iframe => "IFRAME",
            CloakType::MetaRefresh => "META_REFRESH",
            CloakType::JsRedirect => "JS_REDIRECT",
        }
    }
}

impl fmt::Display for CloakType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloakType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IFRAME" => Ok(CloakType::Iframe),
            "META_REFRESH" => Ok(CloakType::MetaRefresh),
            "JS_REDIRECT" => Ok(CloakType::JsRedirect),
            other => Err(format!("unknown cloak type: {other}")),
        }
    }
}

/// Cloaking settings attached to a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloakingConfig {
    pub cloak_type: CloakType,
    pub title: Option<String>,
    pub favicon: Option<String>,
}

impl CloakingConfig {
    pub fn new(cloak_type: CloakType) -> Self {
        Self {
            cloak_type,
            title: None,
            favicon: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_favicon(mut self, favicon: impl Into<String>) -> Self {
        self.favicon = Some(favicon.into());
        self
    }
}

/// A short link.
///
/// Addressed either by its generated `short_code` or by an optional `custom_alias`.
/// Serializable so resolved links can be kept in the lookup cache. The password
/// hash is never written out; protected links are not cached at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub short_code: String,
    pub custom_alias: Option<String>,
    pub original_url: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub cloaking: Option<CloakingConfig>,
    pub created_at: DateTime<Utc>,
}

impl Link {
    /// Creates an active, unprotected, non-expiring link.
    pub fn new(id: i64, short_code: impl Into<String>, original_url: impl Into<String>) -> Self {
        Self {
            id,
            short_code: short_code.into(),
            custom_alias: None,
            original_url: original_url.into(),
            is_active: true,
            expires_at: None,
            password_hash: None,
            cloaking: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.custom_alias = Some(alias.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    pub fn with_cloaking(mut self, cloaking: CloakingConfig) -> Self {
        self.cloaking = Some(cloaking);
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Returns true once `expires_at` has been reached. A link expiring exactly at
    /// `now` is already expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| e <= now)
    }

    /// Returns true while the link is active and not expired.
    pub fn is_resolvable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }

    pub fn is_password_protected(&self) -> bool {
        self.password_hash.as_deref().is_some_and(|h| !h.is_empty())
    }
}
