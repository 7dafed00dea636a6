//! 适配器 Trait 定义
//!
//! 策略框架依赖此接口而非具体实现，便于替换存储后端

use async_trait::async_trait;

use crate::error::Result;
use crate::model::PolicyModel;

/// 策略存储适配器接口
///
/// `sec` 为 section 名（"p" 或 "g"），`ptype` 为规则类型。
/// 删除类操作返回实际删除的行数，没有匹配行时返回 0 而不是错误。
#[async_trait]
pub trait Adapter: Send + Sync {
    // 全量
    async fn load_policy(&self, model: &mut dyn PolicyModel) -> Result<()>;
    async fn save_policy(&self, model: &dyn PolicyModel) -> Result<()>;
    async fn clear_policy(&self) -> Result<u64>;

    // 增量
    async fn add_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> Result<()>;
    async fn add_policies(&self, sec: &str, ptype: &str, rules: &[Vec<String>]) -> Result<()>;
    async fn remove_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> Result<u64>;
    async fn remove_policies(
        &self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<u64>;
    async fn remove_filtered_policy(
        &self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<u64>;
}
