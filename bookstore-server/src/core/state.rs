use std::sync::Arc;
use std::time::Duration;

use crate::core::{BackendKind, Config};
use crate::db::{Datastore, DbResult, SqliteDatastore, SurrealDatastore};
use crate::services::{OrderService, SearchService, SellerService, UserService};

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 持有各业务服务的共享引用，使用 Arc 实现浅拷贝。
/// 所有服务共享同一个 [`Datastore`] 适配器；适配器类型由配置决定，
/// 服务层对具体后端无感知。
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub users: Arc<UserService>,
    pub sellers: Arc<SellerService>,
    pub orders: Arc<OrderService>,
    pub search: Arc<SearchService>,
}

impl ServerState {
    /// 按配置打开存储后端并装配服务
    pub async fn initialize(config: &Config) -> DbResult<Self> {
        let store = open_datastore(config).await?;
        tracing::info!(backend = ?config.backend, db_path = %config.db_path, "Datastore ready");
        Ok(Self::with_datastore(config.clone(), store))
    }

    /// 使用已打开的存储装配服务 (测试用)
    pub fn with_datastore(config: Config, store: Arc<dyn Datastore>) -> Self {
        let users = Arc::new(UserService::new(
            store.clone(),
            config.token_lifetime_secs as i64,
        ));
        let sellers = Arc::new(SellerService::new(store.clone()));
        let orders = Arc::new(OrderService::new(
            store.clone(),
            Duration::from_secs(config.pending_timeout_secs),
        ));
        let search = Arc::new(SearchService::new(store));
        Self {
            config,
            users,
            sellers,
            orders,
            search,
        }
    }
}

/// 按配置打开对应的存储适配器
pub async fn open_datastore(config: &Config) -> DbResult<Arc<dyn Datastore>> {
    Ok(match config.backend {
        BackendKind::Sqlite => Arc::new(SqliteDatastore::new(&config.db_path).await?),
        BackendKind::Surreal => Arc::new(SurrealDatastore::new(&config.db_path).await?),
    })
}
