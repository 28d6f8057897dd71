//! Click event model for asynchronous click tracking.

use chrono::{DateTime, Utc};

/// A resolved visit waiting to be written to the analytics table.
///
/// Created by the resolver after a redirect or cloaked decision and pushed onto
/// a bounded channel, so the HTTP response never waits for the insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub link_id: i64,
    /// Set when the visit was routed through an A/B variant.
    pub variant_id: Option<i64>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub clicked_at: DateTime<Utc>,
}

impl ClickEvent {
    pub fn new(link_id: i64, clicked_at: DateTime<Utc>) -> Self {
        Self {
            link_id,
            variant_id: None,
            ip: None,
            user_agent: None,
            referrer: None,
            clicked_at,
        }
    }

    pub fn with_variant(mut self, variant_id: Option<i64>) -> Self {
        self.variant_id = variant_id;
        self
    }

    pub fn with_client(
        mut self,
        ip: Option<String>,
        user_agent: Option<&str>,
        referrer: Option<&str>,
    ) -> Self {
        self.ip = ip;
        self.user_agent = user_agent.map(str::to_string);
        self.referrer = referrer.map(str::to_string);
        self
    }
}
