use sea_orm::ActiveValue::{NotSet, Set};

use crate::storage::models::{NewVisit, Visit, VisitChanges};
use migration::entities::visit;

impl From<visit::Model> for Visit {
    fn from(model: visit::Model) -> Self {
        Visit {
            visit_id: model.visit_id,
            affiliate_id: model.affiliate_id,
            referral_id: model.referral_id,
            url: model.url,
            referrer: model.referrer,
            campaign: model.campaign,
            context: model.context,
            ip: model.ip,
            date: model.date,
        }
    }
}

/// 插入用 ActiveModel；调用方需已完成字段规范化并填好 date
pub fn new_visit_to_active_model(visit: &NewVisit) -> visit::ActiveModel {
    visit::ActiveModel {
        visit_id: NotSet,
        affiliate_id: Set(visit.affiliate_id),
        referral_id: Set(visit.referral_id.unwrap_or(0)),
        url: Set(visit.url.clone()),
        referrer: Set(visit.referrer.clone()),
        campaign: Set(visit.campaign.clone()),
        context: Set(visit.context.clone()),
        ip: Set(visit.ip.clone()),
        date: match visit.date {
            Some(date) => Set(date),
            None => Set(chrono::Utc::now()),
        },
    }
}

/// 更新用 ActiveModel，只有出现的字段会写入
pub fn changes_to_active_model(changes: &VisitChanges) -> visit::ActiveModel {
    fn opt<T: Clone + Into<sea_orm::Value>>(value: &Option<T>) -> sea_orm::ActiveValue<T> {
        match value {
            Some(v) => Set(v.clone()),
            None => NotSet,
        }
    }

    visit::ActiveModel {
        visit_id: NotSet,
        affiliate_id: opt(&changes.affiliate_id),
        referral_id: opt(&changes.referral_id),
        url: opt(&changes.url),
        referrer: opt(&changes.referrer),
        campaign: opt(&changes.campaign),
        context: opt(&changes.context),
        ip: opt(&changes.ip),
        date: opt(&changes.date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sea_orm::ActiveValue;

    #[test]
    fn test_model_to_visit() {
        let date = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let visit = Visit::from(visit::Model {
            visit_id: 10,
            affiliate_id: 3,
            referral_id: 0,
            url: "https://shop.test/".to_string(),
            referrer: "https://blog.test/".to_string(),
            campaign: "spring".to_string(),
            context: "banner".to_string(),
            ip: "10.0.0.1".to_string(),
            date,
        });
        assert_eq!(visit.visit_id, 10);
        assert_eq!(visit.context, "banner");
        assert_eq!(visit.date, date);
    }

    #[test]
    fn test_new_visit_defaults_referral() {
        let am = new_visit_to_active_model(&NewVisit::new(4));
        assert!(matches!(am.referral_id, ActiveValue::Set(0)));
        assert!(matches!(am.visit_id, ActiveValue::NotSet));
        assert!(matches!(am.date, ActiveValue::Set(_)));
    }

    #[test]
    fn test_changes_only_set_present_fields() {
        let am = changes_to_active_model(&VisitChanges {
            referral_id: Some(12),
            ..Default::default()
        });
        assert!(matches!(am.referral_id, ActiveValue::Set(12)));
        assert!(matches!(am.affiliate_id, ActiveValue::NotSet));
        assert!(matches!(am.url, ActiveValue::NotSet));
    }
}
