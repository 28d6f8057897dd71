//! Targeting rule management.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::domain::entities::{Link, LinkTarget, NewLinkTarget, TargetType};
use crate::domain::repositories::{LinkRepository, TargetRepository};
use crate::error::AppError;
use crate::utils::url_normalizer::normalize_url;

pub struct TargetService {
    links: Arc<dyn LinkRepository>,
    targets: Arc<dyn TargetRepository>,
}

impl TargetService {
    pub fn new(links: Arc<dyn LinkRepository>, targets: Arc<dyn TargetRepository>) -> Self {
        Self { links, targets }
    }

    /// Lists every rule of a link in evaluation order.
    pub async fn list(&self, code: &str) -> Result<Vec<LinkTarget>, AppError> {
        let link = self.link(code).await?;
        self.targets.list(link.id).await
    }

    /// Adds a rule to a link. The value is stored in canonical form.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the link does not exist
    /// - [`AppError::Validation`] for an empty value or an invalid target URL
    /// - [`AppError::Conflict`] if the link already has a rule for this type and value
    pub async fn create(
        &self,
        code: &str,
        target_type: TargetType,
        value: &str,
        target_url: &str,
        priority: i32,
    ) -> Result<LinkTarget, AppError> {
        let link = self.link(code).await?;
        let target_url = normalize_url(target_url)?;

        let new_target = NewLinkTarget::new(link.id, target_type, value, target_url, priority);
        if new_target.value.is_empty() {
            return Err(AppError::bad_request(
                "Target value must not be empty",
                json!({ "type": target_type.as_str() }),
            ));
        }

        let target = self.targets.create(new_target).await?;
        info!(
            link_id = link.id,
            target_id = target.id,
            target_type = %target.target_type,
            "Targeting rule added"
        );
        Ok(target)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if self.targets.delete(id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(
                "Targeting rule not found",
                json!({ "target_id": id }),
            ))
        }
    }

    async fn link(&self, code: &str) -> Result<Link, AppError> {
        self.links
            .find_by_code_or_alias(code)
            .await?
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "code": code })))
    }
}
