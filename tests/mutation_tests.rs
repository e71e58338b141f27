//! Visit write-path tests
//!
//! add / update through VisitService against a temporary SQLite database,
//! checking normalization, affiliate counters and reassignment.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use visitrack::affiliates::{AffiliateDirectory, MemoryAffiliateDirectory, SeaOrmAffiliateDirectory};
use visitrack::cache::GenerationCache;
use visitrack::cache::backends::MokaCacheBackend;
use visitrack::config::{CacheConfig, DatabaseConfig, StaticConfig};
use visitrack::errors::{Result, VisitError};
use visitrack::query::{NormalizedQuery, ReferralStatus, VisitQuery};
use visitrack::services::{MAX_TAG_LEN, VisitService};
use visitrack::storage::{
    NewVisit, RowSet, SeaOrmVisitStore, Visit, VisitChanges, VisitStore,
};

struct Harness {
    service: Arc<VisitService>,
    directory: SeaOrmAffiliateDirectory,
    _dir: TempDir,
}

async fn harness() -> Harness {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = StaticConfig {
        database: DatabaseConfig {
            database_url: format!("sqlite://{}?mode=rwc", dir.path().join("visits.db").display()),
            ..Default::default()
        },
        ..Default::default()
    };

    let store = SeaOrmVisitStore::new(&config.database)
        .await
        .expect("Failed to create store");
    let directory = store.affiliate_directory();
    for id in [1, 2, 3] {
        directory.register(id).await.unwrap();
    }

    let backend = Arc::new(MokaCacheBackend::new(&CacheConfig::default()));
    let cache = Arc::new(GenerationCache::from_config(backend, &config.cache));
    let service = VisitService::new(
        Arc::new(store),
        cache,
        Arc::new(directory.clone()),
        &config,
    );

    Harness {
        service: Arc::new(service),
        directory,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_add_visit_normalizes_fields() {
    let h = harness().await;
    let long_campaign = "c".repeat(80);

    let id = h
        .service
        .add_visit(NewVisit {
            url: "https://shop.test/item?ref=12&color=red".to_string(),
            referrer: "https://blog.test/".to_string(),
            campaign: long_campaign,
            context: "Header Banner!".to_string(),
            ip: "198.51.100.4".to_string(),
            ..NewVisit::new(1)
        })
        .await
        .unwrap();

    let visit = h.service.get_visit(id).await.unwrap().unwrap();
    assert_eq!(visit.url, "https://shop.test/item?color=red");
    assert_eq!(visit.campaign.chars().count(), MAX_TAG_LEN);
    assert_eq!(visit.context, "headerbanner");
    assert_eq!(visit.referral_id, 0);
    assert!(!visit.is_converted());
    assert!((Utc::now() - visit.date).num_seconds() < 60);
}

#[tokio::test]
async fn test_add_visit_keeps_explicit_date_and_referral() {
    let h = harness().await;
    let date = Utc.with_ymd_and_hms(2023, 6, 1, 12, 30, 45).unwrap();

    let id = h
        .service
        .add_visit(NewVisit {
            referral_id: Some(55),
            date: Some(date),
            ..NewVisit::new(2)
        })
        .await
        .unwrap();

    let visit = h.service.get_visit(id).await.unwrap().unwrap();
    assert_eq!(visit.date, date);
    assert_eq!(visit.referral_id, 55);
    assert!(visit.is_converted());
}

#[tokio::test]
async fn test_add_visit_rejects_invalid_affiliate() {
    let h = harness().await;
    for affiliate_id in [0, -4] {
        let err = h
            .service
            .add_visit(NewVisit::new(affiliate_id))
            .await
            .unwrap_err();
        assert!(matches!(err, VisitError::Validation(_)));
    }
    assert_eq!(h.service.count_visits(&VisitQuery::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_add_visit_increments_counter() {
    let h = harness().await;
    h.service.add_visit(NewVisit::new(1)).await.unwrap();
    h.service.add_visit(NewVisit::new(1)).await.unwrap();
    h.service.add_visit(NewVisit::new(2)).await.unwrap();

    assert_eq!(h.directory.visit_count(1).await.unwrap(), Some(2));
    assert_eq!(h.directory.visit_count(2).await.unwrap(), Some(1));
    assert_eq!(h.directory.visit_count(3).await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_concurrent_adds_increment_counter_exactly() {
    let h = harness().await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let service = h.service.clone();
        handles.push(tokio::spawn(async move {
            service.add_visit(NewVisit::new(3)).await.unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort_unstable();
    ids.dedup();

    assert_eq!(ids.len(), 20);
    assert_eq!(h.directory.visit_count(3).await.unwrap(), Some(20));
    assert_eq!(
        h.service
            .count_visits(&VisitQuery::new().affiliate_ids(3))
            .await
            .unwrap(),
        20
    );
}

#[tokio::test]
async fn test_update_reassigns_affiliate_and_moves_counter() {
    let h = harness().await;
    let id = h.service.add_visit(NewVisit::new(1)).await.unwrap();

    let changes = VisitChanges {
        affiliate_id: Some(2),
        ..Default::default()
    };
    assert_eq!(h.service.update_visit(id, changes).await.unwrap(), id);

    let visit = h.service.get_visit(id).await.unwrap().unwrap();
    assert_eq!(visit.affiliate_id, 2);
    assert_eq!(h.directory.visit_count(1).await.unwrap(), Some(0));
    assert_eq!(h.directory.visit_count(2).await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_update_to_unknown_affiliate_keeps_prior() {
    let h = harness().await;
    let id = h.service.add_visit(NewVisit::new(1)).await.unwrap();

    let changes = VisitChanges {
        affiliate_id: Some(404),
        campaign: Some("autumn".to_string()),
        ..Default::default()
    };
    h.service.update_visit(id, changes).await.unwrap();

    let visit = h.service.get_visit(id).await.unwrap().unwrap();
    assert_eq!(visit.affiliate_id, 1);
    assert_eq!(visit.campaign, "autumn");
    assert_eq!(h.directory.visit_count(1).await.unwrap(), Some(1));
    assert_eq!(h.directory.visit_count(404).await.unwrap(), None);
}

#[tokio::test]
async fn test_update_with_same_or_zero_affiliate_leaves_counters() {
    let h = harness().await;
    let id = h.service.add_visit(NewVisit::new(1)).await.unwrap();

    for affiliate_id in [1, 0] {
        let changes = VisitChanges {
            affiliate_id: Some(affiliate_id),
            ..Default::default()
        };
        h.service.update_visit(id, changes).await.unwrap();
    }

    let visit = h.service.get_visit(id).await.unwrap().unwrap();
    assert_eq!(visit.affiliate_id, 1);
    assert_eq!(h.directory.visit_count(1).await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_update_missing_visit_is_invalid_reference() {
    let h = harness().await;
    let err = h
        .service
        .update_visit(9999, VisitChanges::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VisitError::InvalidReference(_)));
}

#[tokio::test]
async fn test_update_normalizes_tags_and_url() {
    let h = harness().await;
    let id = h.service.add_visit(NewVisit::new(1)).await.unwrap();

    let changes = VisitChanges {
        url: Some("https://shop.test/landing/ref/77/".to_string()),
        context: Some(format!("Side Bar {}", "x".repeat(60))),
        campaign: Some("é".repeat(60)),
        ..Default::default()
    };
    h.service.update_visit(id, changes).await.unwrap();

    let visit = h.service.get_visit(id).await.unwrap().unwrap();
    assert_eq!(visit.url, "https://shop.test/landing/");
    assert!(visit.context.starts_with("sidebar"));
    assert!(visit.context.chars().count() <= MAX_TAG_LEN);
    assert_eq!(visit.campaign.chars().count(), MAX_TAG_LEN);
}

#[tokio::test]
async fn test_conversion_moves_visit_between_status_filters() {
    let h = harness().await;
    let id = h.service.add_visit(NewVisit::new(1)).await.unwrap();

    let converted = VisitQuery::new().referral_status(ReferralStatus::Converted);
    let unconverted = VisitQuery::new().referral_status(ReferralStatus::Unconverted);
    assert_eq!(h.service.count_visits(&converted).await.unwrap(), 0);
    assert_eq!(h.service.count_visits(&unconverted).await.unwrap(), 1);

    let changes = VisitChanges {
        referral_id: Some(31),
        ..Default::default()
    };
    h.service.update_visit(id, changes).await.unwrap();

    assert_eq!(h.service.count_visits(&converted).await.unwrap(), 1);
    assert_eq!(h.service.count_visits(&unconverted).await.unwrap(), 0);
    let by_referral = h
        .service
        .list_visits(&VisitQuery::new().referral_ids(31))
        .await
        .unwrap();
    assert_eq!(by_referral.len(), 1);
    assert_eq!(by_referral[0].visit_id, id);
}

#[tokio::test]
async fn test_date_filters_through_service() {
    let h = harness().await;
    for (day, hour) in [(14, 23), (15, 0), (15, 18), (16, 1)] {
        h.service
            .add_visit(NewVisit {
                date: Some(Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()),
                ..NewVisit::new(1)
            })
            .await
            .unwrap();
    }

    let same_day = VisitQuery::new().on_day("2024-03-15");
    assert_eq!(h.service.count_visits(&same_day).await.unwrap(), 2);

    let range = VisitQuery::new().between(Some("2024-03-15"), Some("2024-03-16 00:30:00"));
    assert_eq!(h.service.count_visits(&range).await.unwrap(), 2);

    let open_start = VisitQuery::new().between(Some("2024-03-15 12:00:00"), None);
    assert_eq!(h.service.count_visits(&open_start).await.unwrap(), 2);
}

/// 读正常、写入全部失败的存储
struct RejectingStore;

#[async_trait]
impl VisitStore for RejectingStore {
    fn backend_name(&self) -> &str {
        "rejecting"
    }

    async fn select(&self, _query: &NormalizedQuery) -> Result<RowSet> {
        Ok(RowSet::Ids(Vec::new()))
    }

    async fn count(&self, _query: &NormalizedQuery) -> Result<u64> {
        Ok(0)
    }

    async fn get(&self, visit_id: i64) -> Result<Option<Visit>> {
        Ok(Some(Visit {
            visit_id,
            affiliate_id: 1,
            referral_id: 0,
            url: String::new(),
            referrer: String::new(),
            campaign: String::new(),
            context: String::new(),
            ip: String::new(),
            date: Utc::now(),
        }))
    }

    async fn insert(&self, _visit: &NewVisit) -> Result<i64> {
        Err(VisitError::database_operation("disk I/O error"))
    }

    async fn update(&self, _visit_id: i64, _changes: &VisitChanges) -> Result<()> {
        Err(VisitError::database_operation("disk I/O error"))
    }
}

#[tokio::test]
async fn test_failed_writes_leave_counters_and_generation() {
    let directory = Arc::new(MemoryAffiliateDirectory::with_affiliates([1, 2]));
    let backend = Arc::new(MokaCacheBackend::new(&CacheConfig::default()));
    let config = StaticConfig::default();
    let cache = Arc::new(GenerationCache::from_config(backend, &config.cache));
    let service = VisitService::new(
        Arc::new(RejectingStore),
        cache.clone(),
        directory.clone(),
        &config,
    );

    let token = cache.token().await.unwrap();

    let err = service.add_visit(NewVisit::new(1)).await.unwrap_err();
    assert!(err.is_storage());

    let changes = VisitChanges {
        affiliate_id: Some(2),
        ..Default::default()
    };
    let err = service.update_visit(5, changes).await.unwrap_err();
    assert!(err.is_storage());

    assert_eq!(directory.visit_count(1).await.unwrap(), Some(0));
    assert_eq!(directory.visit_count(2).await.unwrap(), Some(0));
    assert_eq!(cache.token().await.unwrap(), token);
}
