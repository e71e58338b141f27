//! IP 地址处理工具

use std::net::IpAddr;

/// 判断搜索词是否是一个完整的 IPv4 / IPv6 字面量
///
/// 用于决定搜索走 `ip` 列还是 referrer / url 列。
pub fn is_ip_literal(input: &str) -> bool {
    input.trim().parse::<IpAddr>().is_ok()
}
