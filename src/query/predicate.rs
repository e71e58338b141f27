use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::request::VisitColumn;

/// 谓词中的字面值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lte,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lte => "<=",
        }
    }
}

/// 过滤谓词树
///
/// 顶层列表之间为 AND 关系，`Any` 内部为 OR 关系。
/// 渲染为 SQL 的工作由存储后端完成。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    In {
        column: VisitColumn,
        values: Vec<FilterValue>,
    },
    NotIn {
        column: VisitColumn,
        values: Vec<FilterValue>,
    },
    Compare {
        column: VisitColumn,
        op: CompareOp,
        value: FilterValue,
    },
    /// 按年、月、日三个分量精确匹配
    SameDay { column: VisitColumn, day: NaiveDate },
    /// LIKE 匹配，`pattern` 已完成转义并包含通配符
    Like { column: VisitColumn, pattern: String },
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn compare(column: VisitColumn, op: CompareOp, value: impl Into<FilterValue>) -> Self {
        Predicate::Compare {
            column,
            op,
            value: value.into(),
        }
    }

    /// `%term%`，其中 `\`、`%`、`_` 以 `\` 转义
    pub fn contains(column: VisitColumn, term: &str) -> Self {
        Predicate::Like {
            column,
            pattern: format!("%{}%", escape_like(term)),
        }
    }
}

/// LIKE 转义字符
pub const LIKE_ESCAPE: char = '\\';

pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}
