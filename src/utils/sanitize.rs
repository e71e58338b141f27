//! 写入 visit 前的字段规范化

use url::Url;

/// 按字符（而不是字节）截断，保证不会切断多字节字符
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => input[..byte_idx].to_string(),
        None => input.to_string(),
    }
}

/// 生成 slug 安全的 key：小写，只保留 `a-z0-9_-`
pub fn sanitize_key(input: &str) -> String {
    input
        .chars()
        .filter_map(|c| {
            let c = c.to_ascii_lowercase();
            (c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-').then_some(c)
        })
        .collect()
}

/// 剥离 visit URL 中的推荐参数
///
/// `https://shop.test/page?ref=12&utm=x` -> `https://shop.test/page?utm=x`
/// `https://shop.test/page/ref/12/` -> `https://shop.test/page/`
#[derive(Debug, Clone)]
pub struct VisitUrlSanitizer {
    referral_var: String,
}

impl VisitUrlSanitizer {
    pub fn new(referral_var: impl Into<String>) -> Self {
        Self {
            referral_var: referral_var.into(),
        }
    }

    pub fn sanitize(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() || self.referral_var.is_empty() {
            return raw.to_string();
        }

        if let Ok(mut url) = Url::parse(raw)
            && url
                .query_pairs()
                .any(|(key, _)| key == self.referral_var.as_str())
        {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| key != self.referral_var.as_str())
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();

            if kept.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut().clear().extend_pairs(kept);
            }
            return url.to_string();
        }

        // 没有查询参数形式时，回退处理固定链接形式 /ref/{value}
        self.strip_pretty_permalink(raw)
    }

    fn strip_pretty_permalink(&self, url: &str) -> String {
        let needle = format!("/{}/", self.referral_var);
        let mut out = String::with_capacity(url.len());
        let mut rest = url;

        while let Some(pos) = rest.find(&needle) {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + needle.len()..];
            let value_len = after
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            rest = &after[value_len..];
        }

        out.push_str(rest);
        out
    }
}
