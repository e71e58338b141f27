use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::trace;

use super::AffiliateDirectory;
use crate::errors::Result;

/// 进程内 affiliate 目录（DashMap + 原子计数）
#[derive(Default)]
pub struct MemoryAffiliateDirectory {
    counters: DashMap<i64, AtomicI64>,
}

impl MemoryAffiliateDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_affiliates(ids: impl IntoIterator<Item = i64>) -> Self {
        let directory = Self::new();
        for id in ids {
            directory.register(id);
        }
        directory
    }

    /// 已存在时保留原计数
    pub fn register(&self, affiliate_id: i64) {
        self.counters
            .entry(affiliate_id)
            .or_insert_with(|| AtomicI64::new(0));
    }
}

#[async_trait]
impl AffiliateDirectory for MemoryAffiliateDirectory {
    async fn exists(&self, affiliate_id: i64) -> Result<bool> {
        Ok(self.counters.contains_key(&affiliate_id))
    }

    async fn increment_visits(&self, affiliate_id: i64) -> Result<()> {
        if let Some(counter) = self.counters.get(&affiliate_id) {
            let visits = counter.fetch_add(1, Ordering::AcqRel) + 1;
            trace!("affiliate {} visits -> {}", affiliate_id, visits);
        }
        Ok(())
    }

    async fn decrement_visits(&self, affiliate_id: i64) -> Result<()> {
        if let Some(counter) = self.counters.get(&affiliate_id) {
            counter
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                    (current > 0).then(|| current - 1)
                })
                .ok();
        }
        Ok(())
    }

    async fn visit_count(&self, affiliate_id: i64) -> Result<Option<i64>> {
        Ok(self
            .counters
            .get(&affiliate_id)
            .map(|counter| counter.load(Ordering::Acquire)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unknown_affiliate() {
        let directory = MemoryAffiliateDirectory::new();
        assert!(!directory.exists(1).await.unwrap());
        directory.increment_visits(1).await.unwrap();
        assert_eq!(directory.visit_count(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_decrement_floors_at_zero() {
        let directory = MemoryAffiliateDirectory::with_affiliates([5]);
        directory.increment_visits(5).await.unwrap();
        directory.decrement_visits(5).await.unwrap();
        directory.decrement_visits(5).await.unwrap();
        assert_eq!(directory.visit_count(5).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_register_keeps_existing_count() {
        let directory = MemoryAffiliateDirectory::with_affiliates([2]);
        directory.increment_visits(2).await.unwrap();
        directory.register(2);
        assert_eq!(directory.visit_count(2).await.unwrap(), Some(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments() {
        let directory = Arc::new(MemoryAffiliateDirectory::with_affiliates([9]));
        let mut handles = Vec::new();
        for _ in 0..50 {
            let directory = directory.clone();
            handles.push(tokio::spawn(async move {
                directory.increment_visits(9).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(directory.visit_count(9).await.unwrap(), Some(50));
    }
}
