//! 统一错误处理模块
//!
//! 定义策略适配器中共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 适配器错误类型
#[derive(Debug, Error)]
pub enum AdapterError {
    // ==================== 数据库错误 ====================
    /// 连接池、语句执行或行解码失败
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    // ==================== 事务控制错误 ====================
    #[error("开启事务失败: {0}")]
    Begin(#[source] sqlx::Error),

    #[error("提交事务失败: {0}")]
    Commit(#[source] sqlx::Error),

    /// 业务失败后回滚也失败，两个原因同时保留
    #[error("{source}; 回滚事务失败: {rollback}")]
    Rollback {
        #[source]
        source: Box<AdapterError>,
        rollback: sqlx::Error,
    },

    // ==================== 参数错误 ====================
    #[error("不支持的数据库驱动: {0}")]
    UnsupportedDriver(String),

    #[error("无效的表名: {0}")]
    InvalidTableName(String),

    #[error("过滤条件越界: field_index={field_index}, 字段数={count}")]
    InvalidFilter { field_index: usize, count: usize },

    // ==================== 配置错误 ====================
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, AdapterError>;

impl AdapterError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Begin(_) => "TX_BEGIN_FAILED",
            Self::Commit(_) => "TX_COMMIT_FAILED",
            Self::Rollback { .. } => "TX_ROLLBACK_FAILED",
            Self::UnsupportedDriver(_) => "UNSUPPORTED_DRIVER",
            Self::InvalidTableName(_) => "INVALID_TABLE_NAME",
            Self::InvalidFilter { .. } => "INVALID_FILTER",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// 是否为事务控制错误（开启、提交、回滚）
    pub fn is_transaction_error(&self) -> bool {
        matches!(
            self,
            Self::Begin(_) | Self::Commit(_) | Self::Rollback { .. }
        )
    }

    /// 合成回滚失败错误
    pub fn rollback_failed(source: AdapterError, rollback: sqlx::Error) -> Self {
        Self::Rollback {
            source: Box::new(source),
            rollback,
        }
    }
}
