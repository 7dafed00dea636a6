//! 共享库
//!
//! 包含策略适配器使用的配置、错误处理、数据库连接与日志初始化等基础设施代码。

pub mod config;
pub mod database;
pub mod error;
pub mod observability;

pub use config::{AdapterConfig, DatabaseConfig, ObservabilityConfig, PolicyTableConfig};
pub use database::{Database, Driver};
pub use error::{AdapterError, Result};
