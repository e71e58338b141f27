use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
        .load_full()
}

/// Like [`get_config`], but returns `None` before initialization.
pub fn try_get_config() -> Option<Arc<StaticConfig>> {
    CONFIG.get().map(|c| c.load_full())
}

/// Initialize the global configuration from `visitrack.toml` + `VISITRACK__*` env.
///
/// # Examples
/// ```no_run
/// use visitrack::config::init_config;
/// init_config();
/// ```
pub fn init_config() {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(StaticConfig::load()));
}

/// Install an explicit configuration (tests, embedding applications).
///
/// Replaces the current value if one was already installed.
pub fn init_config_with(config: StaticConfig) {
    let config = Arc::new(config);
    CONFIG
        .get_or_init(|| ArcSwap::new(config.clone()))
        .store(config);
}
