//! Row hydrator
//!
//! Converts what the store returned into the shape the caller asked for.
//! The output is what gets cached, so it must round-trip through JSON.

use serde::{Deserialize, Serialize};

use crate::storage::models::{RowSet, Visit};
use crate::utils::TimeParser;

/// 单列投影的取值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum QueryOutput {
    Visits(Vec<Visit>),
    Ids(Vec<i64>),
    Values(Vec<ColumnValue>),
}

impl QueryOutput {
    pub fn len(&self) -> usize {
        match self {
            QueryOutput::Visits(rows) => rows.len(),
            QueryOutput::Ids(ids) => ids.len(),
            QueryOutput::Values(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 完整对象以外的投影返回 None
    pub fn into_visits(self) -> Option<Vec<Visit>> {
        match self {
            QueryOutput::Visits(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn into_ids(self) -> Option<Vec<i64>> {
        match self {
            QueryOutput::Ids(ids) => Some(ids),
            QueryOutput::Visits(rows) => Some(rows.into_iter().map(|v| v.visit_id).collect()),
            QueryOutput::Values(_) => None,
        }
    }
}

pub fn hydrate(rows: RowSet) -> QueryOutput {
    match rows {
        RowSet::Visits(models) => QueryOutput::Visits(models.into_iter().map(Visit::from).collect()),
        RowSet::Ids(ids) => QueryOutput::Ids(ids),
        RowSet::Integers(values) => {
            QueryOutput::Values(values.into_iter().map(ColumnValue::Int).collect())
        }
        RowSet::Texts(values) => {
            QueryOutput::Values(values.into_iter().map(ColumnValue::Text).collect())
        }
        RowSet::Timestamps(values) => QueryOutput::Values(
            values
                .iter()
                .map(|ts| ColumnValue::Text(TimeParser::format_canonical(ts)))
                .collect(),
        ),
    }
}
