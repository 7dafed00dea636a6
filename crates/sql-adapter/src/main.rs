//! 策略表巡检工具
//!
//! 加载配置后读取整张策略表，按 section/ptype 输出规则数量。

use policy_adapter::{MemoryModel, SqlAdapter};
use policy_shared::{AdapterConfig, observability};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AdapterConfig::load("policy-adapter")?;
    observability::init_logging(&config.observability)?;

    info!(
        environment = %config.environment,
        table = %config.policy.table_name,
        "Starting policy-adapter..."
    );

    let adapter = SqlAdapter::from_config(&config)?;
    adapter.database().health_check().await?;

    let mut model = MemoryModel::new();
    adapter.load_policy(&mut model).await?;

    for (sec, ptype, count) in model.summary() {
        info!(%sec, %ptype, count, "Loaded rules");
    }
    info!(total = model.rule_count(), "Policy summary complete");

    adapter.close().await;
    Ok(())
}
