//! 数据库连接管理模块
//!
//! 基于 sqlx Any 驱动提供连接池管理，同一套代码支持 PostgreSQL、MySQL 与 SQLite。

use crate::config::DatabaseConfig;
use crate::error::{AdapterError, Result};
use sqlx::AnyPool;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

/// 数据库驱动
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Postgres,
    MySql,
    Sqlite,
}

impl Driver {
    /// 连接串 scheme
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::MySql => 3306,
            Self::Sqlite => 0,
        }
    }

    /// 第 `n` 个绑定参数的占位符（从 1 开始计数）
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Self::Postgres => format!("${}", n),
            Self::MySql | Self::Sqlite => "?".to_string(),
        }
    }

    /// 从连接串的 scheme 推断驱动
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url.split(':').next().unwrap_or_default();
        scheme.parse()
    }
}

impl FromStr for Driver {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(AdapterError::UnsupportedDriver(other.to_string())),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// 数据库连接池包装
#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
    driver: Driver,
}

impl Database {
    /// 创建惰性连接池
    ///
    /// 不会立即建立连接，连接错误在第一次使用时返回
    #[instrument(skip(config), fields(driver = %config.driver, host = %config.host))]
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self> {
        install_default_drivers();

        let driver = config.driver()?;
        let url = config.connection_url()?;

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_lazy(&url)?;

        info!(%driver, "Database connection pool created");

        Ok(Self { pool, driver })
    }

    /// 使用外部创建的连接池
    pub fn from_pool(pool: AnyPool, driver: Driver) -> Self {
        Self { pool, driver }
    }

    /// 获取连接池引用
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(AdapterError::from)
    }

    /// 关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

impl std::ops::Deref for Database {
    type Target = AnyPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}
