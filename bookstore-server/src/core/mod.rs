//! 核心模块 - 配置与服务器状态

pub mod config;
pub mod state;

pub use config::{BackendKind, Config};
pub use state::{ServerState, open_datastore};
