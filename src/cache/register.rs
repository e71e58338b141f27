use once_cell::sync::Lazy;
use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, RwLock},
};
use tracing::debug;

use crate::cache::traits::CacheBackend;
use crate::config::CacheConfig;
use crate::errors::{Result, VisitError};

pub type BoxedCacheBackendFuture =
    Pin<Box<dyn Future<Output = Result<Box<dyn CacheBackend>>> + Send>>;
pub type CacheBackendConstructor =
    Arc<dyn Fn(CacheConfig) -> BoxedCacheBackendFuture + Send + Sync>;

/// 内置后端在首次访问注册表时登记
static CACHE_BACKEND_REGISTRY: Lazy<RwLock<HashMap<String, CacheBackendConstructor>>> =
    Lazy::new(|| {
        let mut registry = HashMap::new();
        for (name, constructor) in crate::cache::backends::builtin_plugins() {
            registry.insert(name.to_string(), constructor);
        }
        RwLock::new(registry)
    });

/// 把异步构造函数包装成注册表需要的形式
pub fn constructor<F, Fut>(build: F) -> CacheBackendConstructor
where
    F: Fn(CacheConfig) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Box<dyn CacheBackend>>> + Send + 'static,
{
    Arc::new(move |config| Box::pin(build(config)) as BoxedCacheBackendFuture)
}

pub fn register_cache_backend_plugin<S: Into<String>>(
    name: S,
    constructor: CacheBackendConstructor,
) {
    let name = name.into();
    debug!("Registering cache backend plugin: {}", name);
    CACHE_BACKEND_REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(name, constructor);
}

pub fn get_cache_backend_plugin(name: &str) -> Option<CacheBackendConstructor> {
    CACHE_BACKEND_REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(name)
        .cloned()
}

pub fn get_cache_backend_plugin_names() -> Vec<String> {
    let mut names: Vec<String> = CACHE_BACKEND_REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}

pub fn debug_cache_registry() {
    let names = get_cache_backend_plugin_names();
    if names.is_empty() {
        debug!("No cache backend plugins registered.");
    } else {
        debug!("Registered cache backend plugins:");
        for name in names {
            debug!(" - {}", name);
        }
    }
}

/// 按 `cache.type` 构造后端
pub async fn create_cache_backend(config: &CacheConfig) -> Result<Arc<dyn CacheBackend>> {
    let constructor = get_cache_backend_plugin(&config.cache_type).ok_or_else(|| {
        VisitError::cache_plugin_not_found(format!(
            "Unknown cache backend '{}'. Available: {}",
            config.cache_type,
            get_cache_backend_plugin_names().join(", ")
        ))
    })?;

    let backend = constructor(config.clone()).await?;
    debug!("Cache backend '{}' created", backend.name());
    Ok(Arc::from(backend))
}
