//! In-process store implementing every repository trait.
//!
//! Used by the HTTP handler tests and handy for running the service without a
//! database. State lives behind a single async mutex, so every operation is
//! atomic with respect to the others, including counter increments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::Mutex;

use crate::domain::click_event::ClickEvent;
use crate::domain::entities::{
    AbTest, AbVariant, ConversionOutcome, Link, LinkTarget, NewAbTest, NewAbVariant,
    NewLinkTarget, VariantDeletion, VariantPatch,
};
use crate::domain::repositories::{
    ApiToken, ClickRepository, ExperimentRepository, LinkRepository, TargetRepository,
    TokenRepository,
};
use crate::error::AppError;

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    links: Vec<Link>,
    targets: Vec<LinkTarget>,
    tests: Vec<AbTest>,
    clicks: Vec<ClickEvent>,
    tokens: Vec<ApiToken>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn variant_mut(&mut self, variant_id: i64) -> Option<&mut AbVariant> {
        self.tests
            .iter_mut()
            .flat_map(|t| t.variants.iter_mut())
            .find(|v| v.id == variant_id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a link as-is. Links are provisioned elsewhere, so there is no
    /// trait method for this.
    pub async fn insert_link(&self, link: Link) {
        let mut state = self.state.lock().await;
        state.next_id = state.next_id.max(link.id);
        state.links.retain(|l| l.id != link.id);
        state.links.push(link);
    }

    /// Clicks recorded so far, in arrival order.
    pub async fn clicks(&self) -> Vec<ClickEvent> {
        self.state.lock().await.clicks.clone()
    }
}

#[async_trait]
impl LinkRepository for MemoryStore {
    async fn find_by_code_or_alias(&self, code: &str) -> Result<Option<Link>, AppError> {
        let state = self.state.lock().await;

        let by_code = state.links.iter().find(|l| l.short_code == code);
        let link = by_code.or_else(|| {
            state
                .links
                .iter()
                .find(|l| l.custom_alias.as_deref() == Some(code))
        });

        Ok(link.cloned())
    }
}

#[async_trait]
impl TargetRepository for MemoryStore {
    async fn list_active(&self, link_id: i64) -> Result<Vec<LinkTarget>, AppError> {
        let mut targets = self.list(link_id).await?;
        targets.retain(|t| t.is_active);
        Ok(targets)
    }

    async fn list(&self, link_id: i64) -> Result<Vec<LinkTarget>, AppError> {
        let state = self.state.lock().await;

        let mut targets: Vec<LinkTarget> = state
            .targets
            .iter()
            .filter(|t| t.link_id == link_id)
            .cloned()
            .collect();
        targets.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });

        Ok(targets)
    }

    async fn create(&self, new_target: NewLinkTarget) -> Result<LinkTarget, AppError> {
        let mut state = self.state.lock().await;

        let duplicate = state.targets.iter().any(|t| {
            t.link_id == new_target.link_id
                && t.target_type == new_target.target_type
                && t.value == new_target.value
        });
        if duplicate {
            return Err(AppError::conflict(
                "Resource already exists",
                json!({
                    "target_type": new_target.target_type,
                    "value": new_target.value,
                }),
            ));
        }

        let target = LinkTarget {
            id: state.next_id(),
            link_id: new_target.link_id,
            target_type: new_target.target_type,
            value: new_target.value,
            target_url: new_target.target_url,
            priority: new_target.priority,
            is_active: true,
            created_at: Utc::now(),
        };
        state.targets.push(target.clone());

        Ok(target)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        let before = state.targets.len();
        state.targets.retain(|t| t.id != id);
        Ok(state.targets.len() < before)
    }
}

fn new_variant(id: i64, test_id: i64, variant: NewAbVariant) -> AbVariant {
    AbVariant {
        id,
        test_id,
        name: variant.name,
        url: variant.url,
        weight: variant.weight,
        clicks: 0,
        conversions: 0,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl ExperimentRepository for MemoryStore {
    async fn find_active_for_link(&self, link_id: i64) -> Result<Option<AbTest>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .tests
            .iter()
            .find(|t| t.link_id == link_id && t.is_active)
            .cloned())
    }

    async fn find_by_id(&self, test_id: i64) -> Result<Option<AbTest>, AppError> {
        let state = self.state.lock().await;
        Ok(state.tests.iter().find(|t| t.id == test_id).cloned())
    }

    async fn create(&self, new_test: NewAbTest) -> Result<AbTest, AppError> {
        let mut state = self.state.lock().await;

        if state
            .tests
            .iter()
            .any(|t| t.link_id == new_test.link_id && t.is_active)
        {
            return Err(AppError::conflict(
                "Link already has an active A/B test",
                json!({ "link_id": new_test.link_id }),
            ));
        }

        let test_id = state.next_id();
        let mut variants = Vec::with_capacity(new_test.variants.len());
        for variant in new_test.variants {
            let id = state.next_id();
            variants.push(new_variant(id, test_id, variant));
        }

        let created_at = Utc::now();
        let test = AbTest {
            id: test_id,
            link_id: new_test.link_id,
            name: new_test.name,
            is_active: true,
            created_at,
            started_at: created_at,
            variants,
        };
        state.tests.push(test.clone());

        Ok(test)
    }

    async fn deactivate(&self, test_id: i64) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        match state.tests.iter_mut().find(|t| t.id == test_id) {
            Some(test) => {
                test.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_variant(
        &self,
        test_id: i64,
        variant: NewAbVariant,
    ) -> Result<AbVariant, AppError> {
        let mut state = self.state.lock().await;
        let id = state.next_id();

        let Some(test) = state.tests.iter_mut().find(|t| t.id == test_id) else {
            return Err(AppError::not_found(
                "A/B test not found",
                json!({ "test_id": test_id }),
            ));
        };

        let created = new_variant(id, test_id, variant);
        test.variants.push(created.clone());

        Ok(created)
    }

    async fn find_variant(&self, variant_id: i64) -> Result<Option<AbVariant>, AppError> {
        let mut state = self.state.lock().await;
        Ok(state.variant_mut(variant_id).map(|v| v.clone()))
    }

    async fn update_variant(
        &self,
        variant_id: i64,
        patch: VariantPatch,
    ) -> Result<Option<AbVariant>, AppError> {
        let mut state = self.state.lock().await;
        let Some(variant) = state.variant_mut(variant_id) else {
            return Ok(None);
        };

        if let Some(name) = patch.name {
            variant.name = name;
        }
        if let Some(url) = patch.url {
            variant.url = url;
        }
        if let Some(weight) = patch.weight {
            variant.weight = weight;
        }

        Ok(Some(variant.clone()))
    }

    async fn delete_variant(
        &self,
        variant_id: i64,
        min_remaining: i64,
    ) -> Result<VariantDeletion, AppError> {
        let mut state = self.state.lock().await;

        let Some(test) = state
            .tests
            .iter_mut()
            .find(|t| t.variants.iter().any(|v| v.id == variant_id))
        else {
            return Ok(VariantDeletion::NotFound);
        };

        if (test.variants.len() as i64) - 1 < min_remaining {
            return Ok(VariantDeletion::BelowMinimum);
        }

        test.variants.retain(|v| v.id != variant_id);
        Ok(VariantDeletion::Deleted)
    }

    async fn increment_clicks(&self, variant_id: i64) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        Ok(state
            .variant_mut(variant_id)
            .map(|v| v.clicks += 1)
            .is_some())
    }

    async fn increment_conversions(
        &self,
        variant_id: i64,
    ) -> Result<ConversionOutcome, AppError> {
        let mut state = self.state.lock().await;
        let Some(test) = state
            .tests
            .iter_mut()
            .find(|t| t.variants.iter().any(|v| v.id == variant_id))
        else {
            return Ok(ConversionOutcome::UnknownVariant);
        };

        let is_active = test.is_active;
        let Some(variant) = test.variants.iter_mut().find(|v| v.id == variant_id) else {
            return Ok(ConversionOutcome::UnknownVariant);
        };

        if !is_active || variant.conversions >= variant.clicks {
            return Ok(ConversionOutcome::NotEligible);
        }

        variant.conversions += 1;
        Ok(ConversionOutcome::Counted)
    }

    async fn reset_counters(
        &self,
        test_id: i64,
        started_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        let Some(test) = state.tests.iter_mut().find(|t| t.id == test_id) else {
            return Ok(false);
        };

        test.started_at = started_at;

        for variant in &mut test.variants {
            variant.clicks = 0;
            variant.conversions = 0;
        }

        Ok(true)
    }
}

#[async_trait]
impl ClickRepository for MemoryStore {
    async fn record_click(&self, event: ClickEvent) -> Result<(), AppError> {
        let mut state = self.state.lock().await;

        if !state.links.iter().any(|l| l.id == event.link_id) {
            return Err(AppError::bad_request(
                "Link no longer exists",
                json!({ "link_id": event.link_id }),
            ));
        }

        state.clicks.push(event);
        Ok(())
    }
}

#[async_trait]
impl TokenRepository for MemoryStore {
    async fn validate_token(&self, token_hash: &str) -> Result<bool, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .tokens
            .iter()
            .any(|t| t.token_hash == token_hash && !t.is_revoked()))
    }

    async fn update_last_used(&self, token_hash: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if let Some(token) = state
            .tokens
            .iter_mut()
            .find(|t| t.token_hash == token_hash && !t.is_revoked())
        {
            token.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn create_token(&self, name: &str, token_hash: &str) -> Result<ApiToken, AppError> {
        let mut state = self.state.lock().await;

        if state
            .tokens
            .iter()
            .any(|t| t.name == name || t.token_hash == token_hash)
        {
            return Err(AppError::conflict(
                "Resource already exists",
                json!({ "name": name }),
            ));
        }

        let token = ApiToken {
            id: state.next_id(),
            name: name.to_string(),
            token_hash: token_hash.to_string(),
            created_at: Utc::now(),
            last_used_at: None,
            revoked_at: None,
        };
        state.tokens.push(token.clone());

        Ok(token)
    }

    async fn list_tokens(&self) -> Result<Vec<ApiToken>, AppError> {
        let state = self.state.lock().await;
        let mut tokens = state.tokens.clone();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tokens)
    }

    async fn revoke_token(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        match state
            .tokens
            .iter_mut()
            .find(|t| t.id == id && !t.is_revoked())
        {
            Some(token) => {
                token.revoked_at = Some(Utc::now());
                Ok(())
            }
            None => Err(AppError::not_found(
                "Token not found",
                json!({ "id": id, "reason": "Unknown or already revoked" }),
            )),
        }
    }
}
