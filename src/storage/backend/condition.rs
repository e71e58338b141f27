//! Predicate → SeaORM `Condition`
//!
//! Everything is expressed through `ColumnTrait` except the calendar-day
//! match, which needs backend specific date functions.

use chrono::Datelike;
use sea_orm::sea_query::{Expr, LikeExpr, SimpleExpr};
use sea_orm::{ColumnTrait, Condition, DbBackend, Value};

use crate::query::{CompareOp, FilterValue, LIKE_ESCAPE, Predicate, VisitColumn};
use migration::entities::visit;

pub fn entity_column(column: VisitColumn) -> visit::Column {
    match column {
        VisitColumn::VisitId => visit::Column::VisitId,
        VisitColumn::AffiliateId => visit::Column::AffiliateId,
        VisitColumn::ReferralId => visit::Column::ReferralId,
        VisitColumn::Url => visit::Column::Url,
        VisitColumn::Referrer => visit::Column::Referrer,
        VisitColumn::Campaign => visit::Column::Campaign,
        VisitColumn::Context => visit::Column::Context,
        VisitColumn::Ip => visit::Column::Ip,
        VisitColumn::Date => visit::Column::Date,
    }
}

impl From<&FilterValue> for Value {
    fn from(value: &FilterValue) -> Self {
        match value {
            FilterValue::Int(v) => (*v).into(),
            FilterValue::Text(v) => v.clone().into(),
            FilterValue::Timestamp(v) => (*v).into(),
        }
    }
}

/// 顶层谓词按 AND 组合
pub fn render_condition(predicates: &[Predicate], backend: DbBackend) -> Condition {
    predicates
        .iter()
        .fold(Condition::all(), |condition, predicate| {
            condition.add(render_predicate(predicate, backend))
        })
}

fn render_predicate(predicate: &Predicate, backend: DbBackend) -> Condition {
    let expr = match predicate {
        Predicate::In { column, values } => {
            entity_column(*column).is_in(values.iter().map(Value::from))
        }
        Predicate::NotIn { column, values } => {
            entity_column(*column).is_not_in(values.iter().map(Value::from))
        }
        Predicate::Compare { column, op, value } => {
            let col = entity_column(*column);
            let value = Value::from(value);
            match op {
                CompareOp::Eq => col.eq(value),
                CompareOp::NotEq => col.ne(value),
                CompareOp::Gt => col.gt(value),
                CompareOp::Gte => col.gte(value),
                CompareOp::Lte => col.lte(value),
            }
        }
        Predicate::SameDay { column, day } => same_day(*column, *day, backend),
        Predicate::Like { column, pattern } => {
            entity_column(*column).like(LikeExpr::new(pattern.as_str()).escape(LIKE_ESCAPE))
        }
        Predicate::Any(children) => {
            return children
                .iter()
                .fold(Condition::any(), |condition, child| {
                    condition.add(render_predicate(child, backend))
                });
        }
    };
    Condition::all().add(expr)
}

/// 年、月、日三个分量分别相等
///
/// 分量来自 `NaiveDate`，直接写成整数字面量，各后端无需处理占位符编号。
fn same_day(column: VisitColumn, day: chrono::NaiveDate, backend: DbBackend) -> SimpleExpr {
    let name = column.as_ref();
    let (year, month, dom) = (day.year(), day.month(), day.day());
    let sql = match backend {
        DbBackend::MySql => format!(
            "YEAR(`{name}`) = {year} AND MONTH(`{name}`) = {month} AND DAY(`{name}`) = {dom}"
        ),
        DbBackend::Postgres => format!(
            "CAST(EXTRACT(YEAR FROM \"{name}\" AT TIME ZONE 'UTC') AS INTEGER) = {year} \
             AND CAST(EXTRACT(MONTH FROM \"{name}\" AT TIME ZONE 'UTC') AS INTEGER) = {month} \
             AND CAST(EXTRACT(DAY FROM \"{name}\" AT TIME ZONE 'UTC') AS INTEGER) = {dom}"
        ),
        _ => format!(
            "CAST(strftime('%Y', \"{name}\") AS INTEGER) = {year} \
             AND CAST(strftime('%m', \"{name}\") AS INTEGER) = {month} \
             AND CAST(strftime('%d', \"{name}\") AS INTEGER) = {dom}"
        ),
    };
    Expr::cust(sql)
}
