//! Visit writes and their counter / cache side effects

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::affiliates::AffiliateDirectory;
use crate::config::TrackingConfig;
use crate::errors::{Result, VisitError};
use crate::services::hooks::{PostCommitHook, VisitMutation};
use crate::storage::{NewVisit, VisitChanges, VisitStore};
use crate::utils::{TimeParser, VisitUrlSanitizer, sanitize_key, truncate_chars};

/// campaign / context 的最大长度（字符）
pub const MAX_TAG_LEN: usize = 50;

pub struct VisitMutator {
    store: Arc<dyn VisitStore>,
    directory: Arc<dyn AffiliateDirectory>,
    hooks: Vec<Arc<dyn PostCommitHook>>,
    sanitizer: VisitUrlSanitizer,
}

impl VisitMutator {
    pub fn new(
        store: Arc<dyn VisitStore>,
        directory: Arc<dyn AffiliateDirectory>,
        tracking: &TrackingConfig,
    ) -> Self {
        Self {
            store,
            directory,
            hooks: Vec::new(),
            sanitizer: VisitUrlSanitizer::new(tracking.referral_var.clone()),
        }
    }

    /// 按注册顺序在提交后执行
    pub fn with_hook(mut self, hook: Arc<dyn PostCommitHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn hook_names(&self) -> Vec<&'static str> {
        self.hooks.iter().map(|hook| hook.name()).collect()
    }

    pub async fn add_visit(&self, visit: NewVisit) -> Result<i64> {
        if visit.affiliate_id <= 0 {
            return Err(VisitError::validation(format!(
                "Invalid affiliate_id: {}",
                visit.affiliate_id
            )));
        }

        let visit = self.normalize_new(visit);
        let visit_id = match self.store.insert(&visit).await {
            Ok(id) => id,
            Err(e) => {
                error!(
                    "Failed to add visit for affiliate {}: {}",
                    visit.affiliate_id, e
                );
                return Err(e);
            }
        };

        info!(
            "Visit {} recorded for affiliate {}",
            visit_id, visit.affiliate_id
        );
        self.run_hooks(VisitMutation::Inserted {
            visit_id,
            affiliate_id: visit.affiliate_id,
        })
        .await;
        Ok(visit_id)
    }

    pub async fn update_visit(&self, visit_id: i64, changes: VisitChanges) -> Result<i64> {
        let Some(prior) = self.store.get(visit_id).await? else {
            return Err(VisitError::invalid_reference(format!(
                "Visit {} does not exist",
                visit_id
            )));
        };

        let mut changes = self.normalize_changes(changes);

        // affiliate 改派：目标不存在时保留原 affiliate
        match changes.affiliate_id {
            Some(0) => changes.affiliate_id = None,
            Some(new_id) if new_id == prior.affiliate_id => changes.affiliate_id = None,
            Some(new_id) => {
                if !self.directory.exists(new_id).await? {
                    warn!(
                        "Visit {}: affiliate {} does not exist, keeping affiliate {}",
                        visit_id, new_id, prior.affiliate_id
                    );
                    changes.affiliate_id = None;
                }
            }
            None => {}
        }

        if changes.is_empty() {
            debug!("Visit {}: nothing to update", visit_id);
            return Ok(visit_id);
        }

        if let Err(e) = self.store.update(visit_id, &changes).await {
            error!("Failed to update visit {}: {}", visit_id, e);
            return Err(e);
        }

        let affiliate_id = changes.affiliate_id.unwrap_or(prior.affiliate_id);
        info!("Visit {} updated", visit_id);
        self.run_hooks(VisitMutation::Updated {
            visit_id,
            previous_affiliate_id: prior.affiliate_id,
            affiliate_id,
        })
        .await;
        Ok(visit_id)
    }

    async fn run_hooks(&self, mutation: VisitMutation) {
        for hook in &self.hooks {
            if let Err(e) = hook.after_commit(&mutation).await {
                warn!(
                    "Post-commit hook '{}' failed for visit {}: {:#}",
                    hook.name(),
                    mutation.visit_id(),
                    e
                );
            }
        }
    }

    fn normalize_new(&self, mut visit: NewVisit) -> NewVisit {
        if !visit.url.is_empty() {
            visit.url = self.sanitizer.sanitize(&visit.url);
        }
        visit.campaign = truncate_chars(&visit.campaign, MAX_TAG_LEN);
        visit.context = normalize_context(&visit.context);
        visit.referral_id = Some(visit.referral_id.unwrap_or(0));
        visit.date = Some(TimeParser::truncate_to_second(
            visit.date.unwrap_or_else(Utc::now),
        ));
        visit
    }

    fn normalize_changes(&self, mut changes: VisitChanges) -> VisitChanges {
        if let Some(url) = changes.url.as_deref().filter(|url| !url.is_empty()) {
            changes.url = Some(self.sanitizer.sanitize(url));
        }
        changes.campaign = changes
            .campaign
            .map(|campaign| truncate_chars(&campaign, MAX_TAG_LEN));
        changes.context = changes.context.map(|context| normalize_context(&context));
        changes.date = changes.date.map(TimeParser::truncate_to_second);
        changes
    }
}

/// 先截断再做 slug 规范化
fn normalize_context(context: &str) -> String {
    sanitize_key(&truncate_chars(context, MAX_TAG_LEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_context() {
        assert_eq!(normalize_context("Sidebar Banner"), "sidebarbanner");
        assert_eq!(normalize_context(&"x".repeat(80)).len(), 50);
    }
}
