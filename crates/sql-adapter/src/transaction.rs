//! 事务执行器
//!
//! 每个公开操作都包在一个顶层事务里：成功提交，失败回滚，回滚失败时把两个原因合成一个错误。
//!
//! 事务句柄以所有权方式交给工作闭包，闭包执行完毕后连同结果一起交还。
//! 工作闭包 panic 或 future 被取消时，句柄随之 drop，sqlx 在 drop 时自动排队回滚，
//! 连接归还连接池前回滚即被执行。

use std::future::Future;

use sqlx::{Any, AnyPool, Transaction};
use tracing::{debug, warn};

use crate::error::{AdapterError, Result};

/// 适配器使用的事务类型
pub type PolicyTx = Transaction<'static, Any>;

/// 在单个事务中执行 `work`
///
/// `work` 取得事务所有权并返回 `(事务, 结果)`：
/// - 结果为 `Ok` 时提交，提交失败返回 [`AdapterError::Commit`]
/// - 结果为 `Err` 时回滚，回滚失败返回 [`AdapterError::Rollback`]，其中保留原始错误
pub async fn run_in_transaction<T, F, Fut>(pool: &AnyPool, work: F) -> Result<T>
where
    F: FnOnce(PolicyTx) -> Fut,
    Fut: Future<Output = (PolicyTx, Result<T>)>,
{
    let tx = pool.begin().await.map_err(AdapterError::Begin)?;
    debug!("Transaction started");

    let (tx, result) = work(tx).await;
    finish(tx, result).await
}

/// 根据工作结果提交或回滚
async fn finish<T>(tx: PolicyTx, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(AdapterError::Commit)?;
            debug!("Transaction committed");
            Ok(value)
        }
        Err(err) => {
            warn!(error = %err, "Rolling back transaction");
            match tx.rollback().await {
                Ok(()) => Err(err),
                Err(rollback) => Err(AdapterError::rollback_failed(err, rollback)),
            }
        }
    }
}
