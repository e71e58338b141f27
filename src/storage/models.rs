use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::TimeParser;
use migration::entities::visit;

/// 一次被追踪的访问
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub visit_id: i64,
    pub affiliate_id: i64,
    /// 0 = 尚未转化
    pub referral_id: i64,
    pub url: String,
    pub referrer: String,
    pub campaign: String,
    pub context: String,
    pub ip: String,
    pub date: DateTime<Utc>,
}

impl Visit {
    pub fn is_converted(&self) -> bool {
        self.referral_id > 0
    }

    pub fn date_string(&self) -> String {
        TimeParser::format_canonical(&self.date)
    }
}

/// 新访问的写入参数
///
/// `date` 为空时使用当前时间，`referral_id` 为空时为 0。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewVisit {
    pub affiliate_id: i64,
    pub referral_id: Option<i64>,
    pub url: String,
    pub referrer: String,
    pub campaign: String,
    pub context: String,
    pub ip: String,
    pub date: Option<DateTime<Utc>>,
}

impl NewVisit {
    pub fn new(affiliate_id: i64) -> Self {
        Self {
            affiliate_id,
            ..Default::default()
        }
    }
}

/// 部分更新，None 表示保持原值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitChanges {
    pub affiliate_id: Option<i64>,
    pub referral_id: Option<i64>,
    pub url: Option<String>,
    pub referrer: Option<String>,
    pub campaign: Option<String>,
    pub context: Option<String>,
    pub ip: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl VisitChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// 存储层返回的原始结果，由 hydrator 转换为对外结构
#[derive(Debug, Clone, PartialEq)]
pub enum RowSet {
    Visits(Vec<visit::Model>),
    Ids(Vec<i64>),
    Integers(Vec<i64>),
    Texts(Vec<String>),
    Timestamps(Vec<DateTime<Utc>>),
}

impl RowSet {
    pub fn len(&self) -> usize {
        match self {
            RowSet::Visits(rows) => rows.len(),
            RowSet::Ids(ids) | RowSet::Integers(ids) => ids.len(),
            RowSet::Texts(values) => values.len(),
            RowSet::Timestamps(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_converted_flag() {
        let mut visit = Visit {
            visit_id: 1,
            affiliate_id: 2,
            referral_id: 0,
            url: String::new(),
            referrer: String::new(),
            campaign: String::new(),
            context: String::new(),
            ip: String::new(),
            date: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 5).unwrap(),
        };
        assert!(!visit.is_converted());
        visit.referral_id = 9;
        assert!(visit.is_converted());
        assert_eq!(visit.date_string(), "2024-03-01 08:00:05");
    }

    #[test]
    fn test_changes_is_empty() {
        assert!(VisitChanges::default().is_empty());
        let changes = VisitChanges {
            campaign: Some("x".to_string()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
