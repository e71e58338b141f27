//! Query result caching
//!
//! A pluggable key/value backend (`memory`, `redis`, `null`) plus the
//! generation token layer that gives O(1) group invalidation on top of it.

pub mod backends;
pub mod generation;
pub mod register;
pub mod traits;

pub use generation::GenerationCache;
pub use register::{
    create_cache_backend, debug_cache_registry, get_cache_backend_plugin_names,
    register_cache_backend_plugin,
};
pub use traits::CacheBackend;
