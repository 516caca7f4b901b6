//! Bookstore Server - 网上书店后端
//!
//! # 架构概述
//!
//! - **存储适配层** (`db`): 抽象数据存储契约 + SQLite / SurrealDB 两种适配器
//! - **业务服务** (`services`): 账户、店铺库存、订单引擎、搜索
//! - **认证** (`auth`): JWT 终端令牌
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! bookstore-server/src/
//! ├── core/          # 配置、状态
//! ├── auth/          # JWT 终端令牌
//! ├── db/            # 存储契约与适配器
//! ├── services/      # 业务服务（订单引擎等）
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 工具函数
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use core::{BackendKind, Config, ServerState};
pub use db::{Datastore, SqliteDatastore, SurrealDatastore};
pub use services::{OrderService, SearchService, SellerService, UserService};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
