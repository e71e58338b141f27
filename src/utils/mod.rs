pub mod ip;
pub mod sanitize;
pub mod time_parser;

pub use ip::is_ip_literal;
pub use sanitize::{VisitUrlSanitizer, sanitize_key, truncate_chars};
pub use time_parser::TimeParser;
