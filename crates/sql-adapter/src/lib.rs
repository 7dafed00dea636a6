//! SQL 策略适配器
//!
//! 把访问控制规则（ptype + 最多六个位置字段）持久化到关系表，并在启动时重建策略模型。
//!
//! ## 核心功能
//!
//! - **行编解码**：规则元组与定宽表行（ptype, v0..v5）之间的转换
//! - **事务执行**：每个操作一个顶层事务，失败回滚，回滚失败与原始错误一并返回
//! - **全量操作**：加载整表到模型、用模型替换整表、清空
//! - **增量操作**：单条/批量增删、按部分元组过滤删除
//!
//! ## 模块结构
//!
//! - `rule`: 行模型与编解码
//! - `model`: 策略模型接口与内存实现
//! - `statement`: SQL 语句构建
//! - `transaction`: 事务执行器
//! - `adapter`: 适配器实现
//! - `traits`: 适配器接口

pub mod adapter;
pub mod model;
pub mod rule;
pub mod statement;
pub mod traits;
pub mod transaction;

pub use policy_shared::error;

pub use adapter::SqlAdapter;
pub use error::{AdapterError, Result};
pub use model::{GROUPING_SECTION, MemoryModel, POLICY_SECTION, PolicyModel, load_policy_line};
pub use rule::PolicyRule;
pub use statement::PolicyStatements;
pub use traits::Adapter;
pub use transaction::{PolicyTx, run_in_transaction};
