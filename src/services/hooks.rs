//! Post-commit hooks
//!
//! Side effects that run only after a visit write has been persisted.
//! A failing hook is logged and never undoes or fails the write.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::affiliates::AffiliateDirectory;
use crate::cache::GenerationCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitMutation {
    Inserted {
        visit_id: i64,
        affiliate_id: i64,
    },
    Updated {
        visit_id: i64,
        previous_affiliate_id: i64,
        affiliate_id: i64,
    },
}

impl VisitMutation {
    pub fn visit_id(&self) -> i64 {
        match self {
            VisitMutation::Inserted { visit_id, .. } | VisitMutation::Updated { visit_id, .. } => {
                *visit_id
            }
        }
    }
}

#[async_trait]
pub trait PostCommitHook: Send + Sync {
    fn name(&self) -> &'static str;

    async fn after_commit(&self, mutation: &VisitMutation) -> anyhow::Result<()>;
}

/// 维护 affiliate 的 visits 计数
pub struct AffiliateCounterHook {
    directory: Arc<dyn AffiliateDirectory>,
}

impl AffiliateCounterHook {
    pub fn new(directory: Arc<dyn AffiliateDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl PostCommitHook for AffiliateCounterHook {
    fn name(&self) -> &'static str {
        "affiliate_counter"
    }

    async fn after_commit(&self, mutation: &VisitMutation) -> anyhow::Result<()> {
        match *mutation {
            VisitMutation::Inserted { affiliate_id, .. } => {
                self.directory.increment_visits(affiliate_id).await?;
            }
            VisitMutation::Updated {
                previous_affiliate_id,
                affiliate_id,
                ..
            } if previous_affiliate_id != affiliate_id => {
                self.directory
                    .decrement_visits(previous_affiliate_id)
                    .await?;
                self.directory.increment_visits(affiliate_id).await?;
                debug!(
                    "Visit {} moved from affiliate {} to {}",
                    mutation.visit_id(),
                    previous_affiliate_id,
                    affiliate_id
                );
            }
            VisitMutation::Updated { .. } => {}
        }
        Ok(())
    }
}

/// 推进 generation token，使已缓存的查询全部失效
pub struct GenerationAdvanceHook {
    cache: Arc<GenerationCache>,
}

impl GenerationAdvanceHook {
    pub fn new(cache: Arc<GenerationCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl PostCommitHook for GenerationAdvanceHook {
    fn name(&self) -> &'static str {
        "generation_advance"
    }

    async fn after_commit(&self, _mutation: &VisitMutation) -> anyhow::Result<()> {
        self.cache.advance().await?;
        Ok(())
    }
}
