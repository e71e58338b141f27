mod moka;
mod null;
#[cfg(feature = "redis-cache")]
mod redis;

pub use self::moka::MokaCacheBackend;
pub use self::null::NullCacheBackend;
#[cfg(feature = "redis-cache")]
pub use self::redis::RedisCacheBackend;

use crate::cache::register::{CacheBackendConstructor, constructor};
use crate::cache::traits::CacheBackend;

pub(crate) fn builtin_plugins() -> Vec<(&'static str, CacheBackendConstructor)> {
    let mut plugins: Vec<(&'static str, CacheBackendConstructor)> = vec![
        (
            "memory",
            constructor(|config| async move {
                Ok(Box::new(MokaCacheBackend::new(&config)) as Box<dyn CacheBackend>)
            }),
        ),
        (
            "null",
            constructor(|_config| async { Ok(Box::new(NullCacheBackend) as Box<dyn CacheBackend>) }),
        ),
    ];

    #[cfg(feature = "redis-cache")]
    plugins.push((
        "redis",
        constructor(|config| async move {
            let backend = RedisCacheBackend::connect(&config).await?;
            Ok(Box::new(backend) as Box<dyn CacheBackend>)
        }),
    ));

    plugins
}
