use xxhash_rust::xxh64::xxh64;

use super::builder::NormalizedQuery;
use crate::errors::Result;

/// 查询种类，计数与列表使用不同前缀，避免指纹碰撞
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Rows,
    Count,
}

impl QueryKind {
    fn prefix(&self) -> &'static str {
        match self {
            QueryKind::Rows => "visits_",
            QueryKind::Count => "visits_count_",
        }
    }
}

/// 规范化查询的稳定指纹
///
/// 结构体字段顺序固定，serde_json 输出也就固定，相同语义的请求得到相同指纹。
pub fn fingerprint(query: &NormalizedQuery, kind: QueryKind) -> Result<String> {
    let payload = match kind {
        QueryKind::Rows => serde_json::to_vec(query)?,
        QueryKind::Count => serde_json::to_vec(&query.for_count())?,
    };
    Ok(format!("{}{:016x}", kind.prefix(), xxh64(&payload, 0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{PredicateBuilder, VisitQuery};

    fn fp(query: VisitQuery, kind: QueryKind) -> String {
        let normalized = PredicateBuilder::normalize(&query).unwrap();
        fingerprint(&normalized, kind).unwrap()
    }

    #[test]
    fn test_equivalent_requests_share_fingerprint() {
        assert_eq!(
            fp(VisitQuery::new().affiliate_ids([2, 1, 2]), QueryKind::Rows),
            fp(VisitQuery::new().affiliate_ids(vec![1, 2]), QueryKind::Rows)
        );
    }

    #[test]
    fn test_kind_changes_fingerprint() {
        let rows = fp(VisitQuery::new(), QueryKind::Rows);
        let count = fp(VisitQuery::new(), QueryKind::Count);
        assert_ne!(rows, count);
        assert!(rows.starts_with("visits_"));
        assert!(count.starts_with("visits_count_"));
    }

    #[test]
    fn test_different_filters_differ() {
        assert_ne!(
            fp(VisitQuery::new().affiliate_ids(1), QueryKind::Rows),
            fp(VisitQuery::new().affiliate_ids(2), QueryKind::Rows)
        );
        assert_ne!(
            fp(VisitQuery::new().paginate(20, 0), QueryKind::Rows),
            fp(VisitQuery::new().paginate(20, 20), QueryKind::Rows)
        );
    }

    #[test]
    fn test_count_ignores_pagination() {
        assert_eq!(
            fp(VisitQuery::new().paginate(20, 0), QueryKind::Count),
            fp(VisitQuery::new().paginate(5, 40), QueryKind::Count)
        );
    }
}
