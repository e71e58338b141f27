use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, TimeZone, Utc};

/// 规范化时间格式（秒级精度，UTC）
pub const CANONICAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub struct TimeParser;

impl TimeParser {
    /// 解析过滤条件中的时间，支持：
    /// - RFC3339：2024-01-15T10:30:00Z / 2024-01-15T10:30:00+08:00
    /// - 2024-01-15 10:30:00 / 2024-01-15T10:30:00 / 2024-01-15 10:30（按 UTC 处理）
    /// - 2024-01-15（当天 00:00:00）
    ///
    /// 结果统一截断到秒。
    pub fn parse_filter_datetime(input: &str) -> Result<DateTime<Utc>, String> {
        let input = input.trim();
        if input.is_empty() {
            return Err("空的时间字符串".to_string());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&Utc).trunc_subsecs(0));
        }

        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
                return Ok(Utc.from_utc_datetime(&naive).trunc_subsecs(0));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
        }

        Err(format!("无效的时间格式: '{}'", input))
    }

    /// 解析单日过滤条件，只保留 (年, 月, 日)
    pub fn parse_filter_day(input: &str) -> Result<NaiveDate, String> {
        Self::parse_filter_datetime(input).map(|dt| dt.date_naive())
    }

    pub fn format_canonical(dt: &DateTime<Utc>) -> String {
        dt.format(CANONICAL_DATETIME_FORMAT).to_string()
    }

    /// visit 的时间戳以秒级精度存储
    pub fn truncate_to_second(dt: DateTime<Utc>) -> DateTime<Utc> {
        dt.trunc_subsecs(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_date_only_is_midnight() {
        let dt = TimeParser::parse_filter_datetime("2024-01-31").unwrap();
        assert_eq!(TimeParser::format_canonical(&dt), "2024-01-31 00:00:00");
    }

    #[test]
    fn test_parse_mysql_style() {
        let dt = TimeParser::parse_filter_datetime("2024-01-15 10:30:45").unwrap();
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.minute(), 30);
        assert_eq!(dt.second(), 45);
    }

    #[test]
    fn test_parse_rfc3339_converts_to_utc_and_truncates() {
        let dt = TimeParser::parse_filter_datetime("2024-01-15T10:30:45.987+02:00").unwrap();
        assert_eq!(TimeParser::format_canonical(&dt), "2024-01-15 08:30:45");
        assert_eq!(dt.nanosecond(), 0);
    }

    #[test]
    fn test_parse_day_drops_time() {
        let day = TimeParser::parse_filter_day("2024-01-15 23:59:59").unwrap();
        assert_eq!((day.year(), day.month(), day.day()), (2024, 1, 15));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(TimeParser::parse_filter_datetime("").is_err());
        assert!(TimeParser::parse_filter_datetime("yesterday").is_err());
        assert!(TimeParser::parse_filter_datetime("2024-13-01").is_err());
        assert!(TimeParser::parse_filter_day("15/01/2024").is_err());
    }
}
