//! Visit filter request
//!
//! `VisitQuery` is the only accepted shape of a visit query. Unknown fields
//! are rejected at deserialization time; every field has a default so an
//! empty object means "first page of all visits, newest first".

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::{Result, VisitError};

/// 默认每页条数
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// visits 表的列（同时作为排序白名单与单列投影白名单）
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VisitColumn {
    VisitId,
    AffiliateId,
    ReferralId,
    Url,
    Referrer,
    Campaign,
    Context,
    Ip,
    Date,
}

impl VisitColumn {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            VisitColumn::VisitId | VisitColumn::AffiliateId | VisitColumn::ReferralId
        )
    }
}

/// 单值或集合形式的 ID 过滤，按集合成员语义匹配
///
/// 单值 `0` 等价于"不过滤"。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdFilter {
    One(i64),
    Many(Vec<i64>),
}

impl Default for IdFilter {
    fn default() -> Self {
        IdFilter::One(0)
    }
}

impl IdFilter {
    /// 排序去重后的集合，空集合表示不过滤
    pub fn normalized(&self) -> Vec<i64> {
        match self {
            IdFilter::One(0) => Vec::new(),
            IdFilter::One(id) => vec![*id],
            IdFilter::Many(ids) => {
                let mut ids = ids.clone();
                ids.sort_unstable();
                ids.dedup();
                ids
            }
        }
    }
}

impl From<i64> for IdFilter {
    fn from(id: i64) -> Self {
        IdFilter::One(id)
    }
}

impl From<Vec<i64>> for IdFilter {
    fn from(ids: Vec<i64>) -> Self {
        IdFilter::Many(ids)
    }
}

impl<const N: usize> From<[i64; N]> for IdFilter {
    fn from(ids: [i64; N]) -> Self {
        IdFilter::Many(ids.to_vec())
    }
}

/// campaign / context 的过滤值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextFilter {
    One(String),
    Many(Vec<String>),
}

impl Default for TextFilter {
    fn default() -> Self {
        TextFilter::One(String::new())
    }
}

impl TextFilter {
    pub fn is_empty(&self) -> bool {
        match self {
            TextFilter::One(value) => value.is_empty(),
            TextFilter::Many(values) => values.is_empty(),
        }
    }
}

impl From<&str> for TextFilter {
    fn from(value: &str) -> Self {
        TextFilter::One(value.to_string())
    }
}

impl From<String> for TextFilter {
    fn from(value: String) -> Self {
        TextFilter::One(value)
    }
}

impl From<Vec<String>> for TextFilter {
    fn from(values: Vec<String>) -> Self {
        TextFilter::Many(values)
    }
}

impl From<Vec<&str>> for TextFilter {
    fn from(values: Vec<&str>) -> Self {
        TextFilter::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// campaign / context 的比较方式
///
/// 反序列化走 `FromStr`，大小写与首尾空白都不敏感。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Comparator {
    #[default]
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    /// 忽略传入值，匹配空列
    #[serde(rename = "EMPTY")]
    Empty,
    /// 忽略传入值，匹配非空列
    #[serde(rename = "NOT EMPTY")]
    NotEmpty,
}

impl std::str::FromStr for Comparator {
    type Err = VisitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "" | "=" => Ok(Self::Eq),
            "!=" | "<>" => Ok(Self::NotEq),
            "EMPTY" => Ok(Self::Empty),
            "NOT EMPTY" => Ok(Self::NotEmpty),
            _ => Err(VisitError::validation(format!(
                "Invalid comparator: '{}'. Valid: =, !=, EMPTY, NOT EMPTY",
                s
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Comparator {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// 转化状态过滤；无法识别的值等价于不过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Converted,
    Unconverted,
    #[default]
    #[serde(other)]
    Any,
}

impl ReferralStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "converted" => Self::Converted,
            "unconverted" => Self::Unconverted,
            _ => Self::Any,
        }
    }
}

/// 日期过滤：单日（按年月日精确匹配）或区间（两端可选，闭区间）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateFilter {
    Day(String),
    Range {
        #[serde(default)]
        start: Option<String>,
        #[serde(default)]
        end: Option<String>,
    },
}

/// Visit 查询请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisitQuery {
    /// 每页条数，`< 1` 表示不限
    pub number: i64,
    pub offset: u64,
    pub visit_id: IdFilter,
    pub affiliate_id: IdFilter,
    pub referral_id: IdFilter,
    pub referral_status: ReferralStatus,
    pub campaign: TextFilter,
    pub campaign_compare: Comparator,
    pub context: TextFilter,
    pub context_compare: Comparator,
    pub date: Option<DateFilter>,
    pub search: String,
    /// 不在列白名单中时回退为主键
    pub orderby: String,
    /// 只有 DESC（不区分大小写）为降序，其余均为升序
    pub order: String,
    /// `*` / 空：完整对象；`ids`：只返回主键；列名：只返回该列
    pub fields: String,
}

impl Default for VisitQuery {
    fn default() -> Self {
        Self {
            number: DEFAULT_PAGE_SIZE,
            offset: 0,
            visit_id: IdFilter::default(),
            affiliate_id: IdFilter::default(),
            referral_id: IdFilter::default(),
            referral_status: ReferralStatus::Any,
            campaign: TextFilter::default(),
            campaign_compare: Comparator::Eq,
            context: TextFilter::default(),
            context_compare: Comparator::Eq,
            date: None,
            search: String::new(),
            orderby: VisitColumn::VisitId.to_string(),
            order: "DESC".to_string(),
            fields: String::new(),
        }
    }
}

impl VisitQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从松散的 JSON 参数构造查询，未知字段直接拒绝
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| VisitError::validation(format!("Invalid visit query: {}", e)))
    }

    pub fn visit_ids(mut self, ids: impl Into<IdFilter>) -> Self {
        self.visit_id = ids.into();
        self
    }

    pub fn affiliate_ids(mut self, ids: impl Into<IdFilter>) -> Self {
        self.affiliate_id = ids.into();
        self
    }

    pub fn referral_ids(mut self, ids: impl Into<IdFilter>) -> Self {
        self.referral_id = ids.into();
        self
    }

    pub fn referral_status(mut self, status: ReferralStatus) -> Self {
        self.referral_status = status;
        self
    }

    pub fn campaign(mut self, value: impl Into<TextFilter>, compare: Comparator) -> Self {
        self.campaign = value.into();
        self.campaign_compare = compare;
        self
    }

    pub fn context(mut self, value: impl Into<TextFilter>, compare: Comparator) -> Self {
        self.context = value.into();
        self.context_compare = compare;
        self
    }

    pub fn on_day(mut self, day: impl Into<String>) -> Self {
        self.date = Some(DateFilter::Day(day.into()));
        self
    }

    pub fn between(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        self.date = Some(DateFilter::Range {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
        });
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = term.into();
        self
    }

    pub fn paginate(mut self, number: i64, offset: u64) -> Self {
        self.number = number;
        self.offset = offset;
        self
    }

    /// 取消分页上限（offset 保留）
    pub fn unbounded(mut self) -> Self {
        self.number = -1;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: impl Into<String>) -> Self {
        self.orderby = column.into();
        self.order = order.into();
        self
    }

    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = fields.into();
        self
    }
}
