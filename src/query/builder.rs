//! Predicate builder
//!
//! Turns a `VisitQuery` into a `NormalizedQuery`: the canonical form used both
//! for fingerprinting and for emitting the ordered predicate list. Two requests
//! that select the same rows in the same order normalize to equal values.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::predicate::{CompareOp, FilterValue, Predicate};
use super::request::{
    Comparator, DateFilter, ReferralStatus, TextFilter, VisitColumn, VisitQuery,
};
use crate::errors::{Result, VisitError};
use crate::utils::{TimeParser, is_ip_literal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// 只有 DESC（不区分大小写）为降序
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("DESC") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

/// 结果投影
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    All,
    Ids,
    Column(VisitColumn),
}

impl Projection {
    /// 无法识别的字段名按完整对象处理
    pub fn parse(fields: &str) -> Self {
        match fields.trim() {
            "" | "*" => Projection::All,
            "ids" => Projection::Ids,
            other => other
                .parse::<VisitColumn>()
                .map(Projection::Column)
                .unwrap_or(Projection::All),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TextOperand {
    One(String),
    Many(Vec<String>),
}

/// 规范化后的 campaign / context 条件，`op` 只会是 Eq 或 NotEq
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextCondition {
    pub op: CompareOp,
    pub value: TextOperand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateCondition {
    Day(NaiveDate),
    Range {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "term", rename_all = "snake_case")]
pub enum SearchTerm {
    Ip(String),
    Text(String),
}

/// 规范化查询（指纹计算与谓词生成的唯一输入）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedQuery {
    pub visit_ids: Vec<i64>,
    pub affiliate_ids: Vec<i64>,
    pub referral_ids: Vec<i64>,
    pub campaign: Option<TextCondition>,
    pub context: Option<TextCondition>,
    pub status: ReferralStatus,
    pub date: Option<DateCondition>,
    pub search: Option<SearchTerm>,
    pub projection: Projection,
    pub order_by: VisitColumn,
    pub order: SortOrder,
    /// None 表示不限条数
    pub limit: Option<u64>,
    pub offset: u64,
}

impl NormalizedQuery {
    /// 计数与分页、排序、投影无关，去掉这些字段后多页请求可共享同一个计数缓存
    pub fn for_count(&self) -> Self {
        Self {
            projection: Projection::All,
            order_by: VisitColumn::VisitId,
            order: SortOrder::Desc,
            limit: None,
            offset: 0,
            ..self.clone()
        }
    }

    /// 按固定顺序生成谓词：ID 集合、campaign、context、转化状态、日期、搜索
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();

        for (column, ids) in [
            (VisitColumn::VisitId, &self.visit_ids),
            (VisitColumn::AffiliateId, &self.affiliate_ids),
            (VisitColumn::ReferralId, &self.referral_ids),
        ] {
            if !ids.is_empty() {
                predicates.push(Predicate::In {
                    column,
                    values: ids.iter().copied().map(FilterValue::Int).collect(),
                });
            }
        }

        for (column, condition) in [
            (VisitColumn::Campaign, &self.campaign),
            (VisitColumn::Context, &self.context),
        ] {
            if let Some(condition) = condition {
                predicates.push(text_predicate(column, condition));
            }
        }

        match self.status {
            ReferralStatus::Converted => predicates.push(Predicate::compare(
                VisitColumn::ReferralId,
                CompareOp::Gt,
                0,
            )),
            ReferralStatus::Unconverted => predicates.push(Predicate::compare(
                VisitColumn::ReferralId,
                CompareOp::Eq,
                0,
            )),
            ReferralStatus::Any => {}
        }

        match &self.date {
            Some(DateCondition::Day(day)) => predicates.push(Predicate::SameDay {
                column: VisitColumn::Date,
                day: *day,
            }),
            Some(DateCondition::Range { start, end }) => {
                if let Some(start) = start {
                    predicates.push(Predicate::compare(
                        VisitColumn::Date,
                        CompareOp::Gte,
                        *start,
                    ));
                }
                if let Some(end) = end {
                    predicates.push(Predicate::compare(VisitColumn::Date, CompareOp::Lte, *end));
                }
            }
            None => {}
        }

        match &self.search {
            Some(SearchTerm::Ip(term)) => {
                predicates.push(Predicate::contains(VisitColumn::Ip, term));
            }
            Some(SearchTerm::Text(term)) => predicates.push(Predicate::Any(vec![
                Predicate::contains(VisitColumn::Referrer, term),
                Predicate::contains(VisitColumn::Url, term),
            ])),
            None => {}
        }

        predicates
    }
}

fn text_predicate(column: VisitColumn, condition: &TextCondition) -> Predicate {
    match &condition.value {
        TextOperand::One(value) => Predicate::compare(column, condition.op, value.as_str()),
        TextOperand::Many(values) => {
            let values = values.iter().cloned().map(FilterValue::Text).collect();
            if condition.op == CompareOp::NotEq {
                Predicate::NotIn { column, values }
            } else {
                Predicate::In { column, values }
            }
        }
    }
}

pub struct PredicateBuilder;

impl PredicateBuilder {
    /// 校验并规范化请求
    ///
    /// 只有无法解析的日期会返回 `Validation` 错误，其余不合法的取值都回退到默认语义。
    pub fn normalize(query: &VisitQuery) -> Result<NormalizedQuery> {
        Ok(NormalizedQuery {
            visit_ids: query.visit_id.normalized(),
            affiliate_ids: query.affiliate_id.normalized(),
            referral_ids: query.referral_id.normalized(),
            campaign: normalize_text(&query.campaign, query.campaign_compare),
            context: normalize_text(&query.context, query.context_compare),
            status: query.referral_status,
            date: normalize_date(query.date.as_ref())?,
            search: normalize_search(&query.search),
            projection: Projection::parse(&query.fields),
            order_by: query
                .orderby
                .trim()
                .parse::<VisitColumn>()
                .unwrap_or(VisitColumn::VisitId),
            order: SortOrder::parse(&query.order),
            limit: (query.number >= 1).then_some(query.number as u64),
            offset: query.offset,
        })
    }

    pub fn build(query: &VisitQuery) -> Result<(NormalizedQuery, Vec<Predicate>)> {
        let normalized = Self::normalize(query)?;
        let predicates = normalized.predicates();
        Ok((normalized, predicates))
    }
}

fn normalize_text(filter: &TextFilter, compare: Comparator) -> Option<TextCondition> {
    // EMPTY / NOT EMPTY 忽略传入值
    let (op, value) = match compare {
        Comparator::Empty => {
            return Some(TextCondition {
                op: CompareOp::Eq,
                value: TextOperand::One(String::new()),
            });
        }
        Comparator::NotEmpty => {
            return Some(TextCondition {
                op: CompareOp::NotEq,
                value: TextOperand::One(String::new()),
            });
        }
        Comparator::Eq => (CompareOp::Eq, filter),
        Comparator::NotEq => (CompareOp::NotEq, filter),
    };

    let value = match value {
        TextFilter::One(value) => TextOperand::One(value.clone()),
        TextFilter::Many(values) => {
            let mut values = values.clone();
            values.sort();
            values.dedup();
            // 空集合：IN () 与 NOT IN () 都没有过滤意义
            if values.is_empty() {
                return None;
            }
            TextOperand::Many(values)
        }
    };

    if op == CompareOp::Eq && value == TextOperand::One(String::new()) {
        return None;
    }

    Some(TextCondition { op, value })
}

fn normalize_date(filter: Option<&DateFilter>) -> Result<Option<DateCondition>> {
    let parse = |raw: &str| {
        TimeParser::parse_filter_datetime(raw)
            .map_err(|e| VisitError::validation(format!("Invalid date filter: {}", e)))
    };

    match filter {
        None => Ok(None),
        Some(DateFilter::Day(day)) if day.trim().is_empty() => Ok(None),
        Some(DateFilter::Day(day)) => Ok(Some(DateCondition::Day(parse(day)?.date_naive()))),
        Some(DateFilter::Range { start, end }) => {
            let bound = |raw: &Option<String>| -> Result<Option<DateTime<Utc>>> {
                match raw.as_deref().map(str::trim) {
                    None | Some("") => Ok(None),
                    Some(raw) => parse(raw).map(Some),
                }
            };
            let start = bound(start)?;
            let end = bound(end)?;
            if start.is_none() && end.is_none() {
                Ok(None)
            } else {
                Ok(Some(DateCondition::Range { start, end }))
            }
        }
    }
}

fn normalize_search(search: &str) -> Option<SearchTerm> {
    let term = search.trim();
    if term.is_empty() {
        None
    } else if is_ip_literal(term) {
        Some(SearchTerm::Ip(term.to_string()))
    } else {
        Some(SearchTerm::Text(term.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(query: VisitQuery) -> (NormalizedQuery, Vec<Predicate>) {
        PredicateBuilder::build(&query).unwrap()
    }

    #[test]
    fn test_empty_request_has_no_predicates() {
        let (normalized, predicates) = build(VisitQuery::default());
        assert!(predicates.is_empty());
        assert_eq!(normalized.order_by, VisitColumn::VisitId);
        assert_eq!(normalized.order, SortOrder::Desc);
        assert_eq!(normalized.limit, Some(20));
        assert_eq!(normalized.projection, Projection::All);
    }

    #[test]
    fn test_identity_sets_normalize_identically() {
        let a = PredicateBuilder::normalize(&VisitQuery::new().affiliate_ids([3, 1, 3])).unwrap();
        let b = PredicateBuilder::normalize(&VisitQuery::new().affiliate_ids(vec![1, 3])).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.affiliate_ids, vec![1, 3]);
    }

    #[test]
    fn test_scalar_id_becomes_membership() {
        let (_, predicates) = build(VisitQuery::new().affiliate_ids(7));
        assert_eq!(
            predicates,
            vec![Predicate::In {
                column: VisitColumn::AffiliateId,
                values: vec![FilterValue::Int(7)],
            }]
        );
    }

    #[test]
    fn test_empty_comparator_ignores_value() {
        let (_, predicates) = build(VisitQuery::new().campaign("spring", Comparator::Empty));
        assert_eq!(
            predicates,
            vec![Predicate::compare(VisitColumn::Campaign, CompareOp::Eq, "")]
        );
    }

    #[test]
    fn test_not_empty_comparator_ignores_value() {
        let (_, predicates) = build(VisitQuery::new().context("x", Comparator::NotEmpty));
        assert_eq!(
            predicates,
            vec![Predicate::compare(VisitColumn::Context, CompareOp::NotEq, "")]
        );
    }

    #[test]
    fn test_equals_empty_value_is_omitted() {
        let (_, predicates) = build(VisitQuery::new().campaign("", Comparator::Eq));
        assert!(predicates.is_empty());
    }

    #[test]
    fn test_not_equals_empty_value_is_kept() {
        let (_, predicates) = build(VisitQuery::new().campaign("", Comparator::NotEq));
        assert_eq!(
            predicates,
            vec![Predicate::compare(VisitColumn::Campaign, CompareOp::NotEq, "")]
        );
    }

    #[test]
    fn test_set_values_use_membership() {
        let (_, predicates) = build(
            VisitQuery::new().campaign(vec!["b", "a", "b"], Comparator::NotEq),
        );
        assert_eq!(
            predicates,
            vec![Predicate::NotIn {
                column: VisitColumn::Campaign,
                values: vec![FilterValue::from("a"), FilterValue::from("b")],
            }]
        );

        let (_, predicates) = build(VisitQuery::new().context(vec!["a"], Comparator::Eq));
        assert!(matches!(predicates[0], Predicate::In { .. }));
    }

    #[test]
    fn test_referral_status() {
        let (_, converted) = build(VisitQuery::new().referral_status(ReferralStatus::Converted));
        assert_eq!(
            converted,
            vec![Predicate::compare(VisitColumn::ReferralId, CompareOp::Gt, 0)]
        );

        let (_, unconverted) =
            build(VisitQuery::new().referral_status(ReferralStatus::Unconverted));
        assert_eq!(
            unconverted,
            vec![Predicate::compare(VisitColumn::ReferralId, CompareOp::Eq, 0)]
        );

        let (_, any) = build(VisitQuery::new().referral_status(ReferralStatus::Any));
        assert!(any.is_empty());
    }

    #[test]
    fn test_status_combines_with_referral_ids() {
        let (_, predicates) = build(
            VisitQuery::new()
                .referral_ids([4, 5])
                .referral_status(ReferralStatus::Converted),
        );
        assert_eq!(predicates.len(), 2);
    }

    #[test]
    fn test_date_range_bounds() {
        let (normalized, predicates) =
            build(VisitQuery::new().between(Some("2024-01-01"), Some("2024-01-31 23:59:59")));
        assert_eq!(predicates.len(), 2);
        match normalized.date {
            Some(DateCondition::Range { start, end }) => {
                assert_eq!(
                    TimeParser::format_canonical(&start.unwrap()),
                    "2024-01-01 00:00:00"
                );
                assert_eq!(
                    TimeParser::format_canonical(&end.unwrap()),
                    "2024-01-31 23:59:59"
                );
            }
            other => panic!("unexpected date condition: {:?}", other),
        }
    }

    #[test]
    fn test_date_range_single_side() {
        let (_, predicates) = build(VisitQuery::new().between(None, Some("2024-02-01")));
        assert_eq!(predicates.len(), 1);
        assert!(matches!(
            predicates[0],
            Predicate::Compare {
                op: CompareOp::Lte,
                ..
            }
        ));
    }

    #[test]
    fn test_scalar_date_is_same_day() {
        let (_, predicates) = build(VisitQuery::new().on_day("2024-01-15 18:45:00"));
        assert_eq!(
            predicates,
            vec![Predicate::SameDay {
                column: VisitColumn::Date,
                day: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            }]
        );
    }

    #[test]
    fn test_unparseable_date_is_validation_error() {
        let result = PredicateBuilder::normalize(&VisitQuery::new().on_day("yesterday-ish"));
        assert!(matches!(result, Err(VisitError::Validation(_))));
    }

    #[test]
    fn test_search_ip_literal() {
        let (_, predicates) = build(VisitQuery::new().search("10.0.0.1"));
        assert_eq!(
            predicates,
            vec![Predicate::contains(VisitColumn::Ip, "10.0.0.1")]
        );
    }

    #[test]
    fn test_search_text_matches_referrer_or_url() {
        let (_, predicates) = build(VisitQuery::new().search("100%"));
        assert_eq!(
            predicates,
            vec![Predicate::Any(vec![
                Predicate::contains(VisitColumn::Referrer, "100%"),
                Predicate::contains(VisitColumn::Url, "100%"),
            ])]
        );
    }

    #[test]
    fn test_sort_fallbacks() {
        let normalized =
            PredicateBuilder::normalize(&VisitQuery::new().order_by("password", "sideways"))
                .unwrap();
        assert_eq!(normalized.order_by, VisitColumn::VisitId);
        assert_eq!(normalized.order, SortOrder::Asc);

        let normalized =
            PredicateBuilder::normalize(&VisitQuery::new().order_by("date", "desc")).unwrap();
        assert_eq!(normalized.order_by, VisitColumn::Date);
        assert_eq!(normalized.order, SortOrder::Desc);
    }

    #[test]
    fn test_unbounded_number() {
        let normalized = PredicateBuilder::normalize(&VisitQuery::new().paginate(0, 5)).unwrap();
        assert_eq!(normalized.limit, None);
        assert_eq!(normalized.offset, 5);
    }

    #[test]
    fn test_projection_parse() {
        assert_eq!(Projection::parse("*"), Projection::All);
        assert_eq!(Projection::parse("ids"), Projection::Ids);
        assert_eq!(
            Projection::parse("campaign"),
            Projection::Column(VisitColumn::Campaign)
        );
        assert_eq!(Projection::parse("nonsense"), Projection::All);
    }

    #[test]
    fn test_predicate_order_is_stable() {
        let (_, predicates) = build(
            VisitQuery::new()
                .search("example.com")
                .on_day("2024-01-01")
                .referral_status(ReferralStatus::Unconverted)
                .context("banner", Comparator::Eq)
                .campaign("spring", Comparator::Eq)
                .visit_ids(9),
        );
        let kinds: Vec<_> = predicates
            .iter()
            .map(|p| match p {
                Predicate::In { column, .. } | Predicate::Compare { column, .. } => {
                    column.to_string()
                }
                Predicate::SameDay { .. } => "day".to_string(),
                Predicate::Any(_) => "search".to_string(),
                other => format!("{:?}", other),
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["visit_id", "campaign", "context", "referral_id", "day", "search"]
        );
    }

    #[test]
    fn test_count_form_drops_pagination() {
        let a = PredicateBuilder::normalize(&VisitQuery::new().paginate(10, 0)).unwrap();
        let b = PredicateBuilder::normalize(
            &VisitQuery::new().paginate(50, 100).order_by("date", "ASC").fields("ids"),
        )
        .unwrap();
        assert_ne!(a, b);
        assert_eq!(a.for_count(), b.for_count());
    }
}
