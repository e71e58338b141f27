//! System-level modules
//!
//! Process-wide setup that embedding applications call once at startup.

pub mod logging;

pub use logging::init_logging;
