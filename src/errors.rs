use std::fmt;

#[derive(Debug, Clone)]
pub enum VisitError {
    /// 引用的 affiliate / visit 不存在
    InvalidReference(String),
    /// 过滤参数或写入字段不合法
    Validation(String),
    /// 本地文件（日志等）读写失败，与数据库无关
    FileOperation(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    /// 持久层操作失败，始终向调用方传播
    DatabaseOperation(String),
    /// 缓存后端不可用，调用方应降级为直接查询存储
    CacheDegraded(String),
    CachePluginNotFound(String),
    Serialization(String),
}

impl VisitError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            VisitError::InvalidReference(_) => "E001",
            VisitError::Validation(_) => "E002",
            VisitError::FileOperation(_) => "E003",
            VisitError::DatabaseConfig(_) => "E004",
            VisitError::DatabaseConnection(_) => "E005",
            VisitError::DatabaseOperation(_) => "E006",
            VisitError::CacheDegraded(_) => "E007",
            VisitError::CachePluginNotFound(_) => "E008",
            VisitError::Serialization(_) => "E009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            VisitError::InvalidReference(_) => "Invalid Reference",
            VisitError::Validation(_) => "Validation Error",
            VisitError::FileOperation(_) => "File Operation Error",
            VisitError::DatabaseConfig(_) => "Database Configuration Error",
            VisitError::DatabaseConnection(_) => "Database Connection Error",
            VisitError::DatabaseOperation(_) => "Database Operation Error",
            VisitError::CacheDegraded(_) => "Cache Degraded",
            VisitError::CachePluginNotFound(_) => "Cache Plugin Not Found",
            VisitError::Serialization(_) => "Serialization Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            VisitError::InvalidReference(msg)
            | VisitError::Validation(msg)
            | VisitError::FileOperation(msg)
            | VisitError::DatabaseConfig(msg)
            | VisitError::DatabaseConnection(msg)
            | VisitError::DatabaseOperation(msg)
            | VisitError::CacheDegraded(msg)
            | VisitError::CachePluginNotFound(msg)
            | VisitError::Serialization(msg) => msg,
        }
    }

    /// 存储层错误（需要原样上抛，不能缓存）
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            VisitError::DatabaseOperation(_)
                | VisitError::DatabaseConnection(_)
                | VisitError::DatabaseConfig(_)
        )
    }

    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for VisitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for VisitError {}

// 便捷的构造函数
impl VisitError {
    pub fn invalid_reference<T: Into<String>>(msg: T) -> Self {
        VisitError::InvalidReference(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        VisitError::Validation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        VisitError::FileOperation(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        VisitError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        VisitError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        VisitError::DatabaseOperation(msg.into())
    }

    pub fn cache_degraded<T: Into<String>>(msg: T) -> Self {
        VisitError::CacheDegraded(msg.into())
    }

    pub fn cache_plugin_not_found<T: Into<String>>(msg: T) -> Self {
        VisitError::CachePluginNotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        VisitError::Serialization(msg.into())
    }
}

impl From<sea_orm::DbErr> for VisitError {
    fn from(err: sea_orm::DbErr) -> Self {
        VisitError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for VisitError {
    fn from(err: std::io::Error) -> Self {
        VisitError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for VisitError {
    fn from(err: serde_json::Error) -> Self {
        VisitError::Serialization(err.to_string())
    }
}

#[cfg(feature = "redis-cache")]
impl From<redis::RedisError> for VisitError {
    fn from(err: redis::RedisError) -> Self {
        VisitError::CacheDegraded(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VisitError>;
