/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | BOOKSTORE_BACKEND | sqlite | 存储后端: sqlite \| surreal |
/// | BOOKSTORE_DB_PATH | bookstore.db / bookstore_data | 数据库路径 |
/// | PENDING_TIMEOUT_SECS | 1800 | 待支付订单超时(秒) |
/// | TOKEN_LIFETIME_SECS | 3600 | 终端令牌有效期(秒) |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_DIR | (无) | 日志文件目录 |
///
/// # 示例
///
/// ```ignore
/// BOOKSTORE_BACKEND=surreal HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 存储后端
    pub backend: BackendKind,
    /// 数据库路径 (SQLite 文件 / SurrealDB 数据目录)
    pub db_path: String,
    /// 待支付订单的保留时长 (秒)，到期由惰性清扫取消
    pub pending_timeout_secs: u64,
    /// 终端令牌有效期 (秒)
    pub token_lifetime_secs: u64,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 日志文件目录 (可选)
    pub log_dir: Option<String>,
}

/// 可选的存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    Surreal,
}

impl BackendKind {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "surreal" | "surrealdb" => BackendKind::Surreal,
            _ => BackendKind::Sqlite,
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let backend = std::env::var("BOOKSTORE_BACKEND")
            .map(|v| BackendKind::parse(&v))
            .unwrap_or(BackendKind::Sqlite);
        let db_path = std::env::var("BOOKSTORE_DB_PATH").unwrap_or_else(|_| {
            match backend {
                BackendKind::Sqlite => "bookstore.db",
                BackendKind::Surreal => "bookstore_data",
            }
            .into()
        });
        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            backend,
            db_path,
            pending_timeout_secs: std::env::var("PENDING_TIMEOUT_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1800),
            token_lifetime_secs: std::env::var("TOKEN_LIFETIME_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3600),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(
        backend: BackendKind,
        db_path: impl Into<String>,
        pending_timeout_secs: u64,
    ) -> Self {
        let mut config = Self::from_env();
        config.backend = backend;
        config.db_path = db_path.into();
        config.pending_timeout_secs = pending_timeout_secs;
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
