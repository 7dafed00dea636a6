//! 集成测试辅助函数
//!
//! 使用单连接的内存 SQLite 连接池，每个测试拥有独立的数据库。

#![allow(dead_code)]

use std::collections::BTreeSet;

use policy_adapter::{MemoryModel, PolicyModel, PolicyRule, SqlAdapter};
use policy_shared::DatabaseConfig;
use sqlx::{Any, AnyPool};

pub const TABLE: &str = "casbin_rule";

/// v2 上的 CHECK 约束用于在测试中制造写入失败
const CREATE_TABLE: &str = r#"
    CREATE TABLE casbin_rule (
        ptype TEXT NOT NULL DEFAULT '',
        v0 TEXT NOT NULL DEFAULT '',
        v1 TEXT NOT NULL DEFAULT '',
        v2 TEXT NOT NULL DEFAULT '' CHECK (v2 <> 'forbidden'),
        v3 TEXT NOT NULL DEFAULT '',
        v4 TEXT NOT NULL DEFAULT '',
        v5 TEXT NOT NULL DEFAULT ''
    )
"#;

/// 内存库只存在于单个连接上，连接池必须只保留一个连接
pub fn sqlite_config() -> DatabaseConfig {
    DatabaseConfig {
        driver: "sqlite".to_string(),
        database: ":memory:".to_string(),
        max_connections: 1,
        min_connections: 0,
        ..Default::default()
    }
}

/// 创建已建表的 SQLite 适配器
pub async fn sqlite_adapter() -> SqlAdapter {
    let adapter = SqlAdapter::connect_lazy(&sqlite_config(), TABLE).expect("创建适配器失败");
    sqlx::query::<Any>(CREATE_TABLE)
        .execute(adapter.database().pool())
        .await
        .expect("建表失败");
    adapter
}

pub fn rule(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

/// 直接写入一行，绕过适配器
pub async fn seed_row(pool: &AnyPool, values: [&str; 7]) {
    let query = values.into_iter().fold(
        sqlx::query::<Any>(
            "INSERT INTO casbin_rule (ptype, v0, v1, v2, v3, v4, v5) VALUES (?, ?, ?, ?, ?, ?, ?)",
        ),
        |query, value| query.bind(value),
    );
    query.execute(pool).await.expect("插入测试数据失败");
}

pub async fn count_rows(adapter: &SqlAdapter) -> i64 {
    sqlx::query_scalar::<Any, i64>("SELECT COUNT(*) FROM casbin_rule")
        .fetch_one(adapter.database().pool())
        .await
        .expect("统计行数失败")
}

/// 表中全部行
pub async fn all_rows(adapter: &SqlAdapter) -> Vec<PolicyRule> {
    sqlx::query::<Any>("SELECT ptype, v0, v1, v2, v3, v4, v5 FROM casbin_rule")
        .fetch_all(adapter.database().pool())
        .await
        .expect("查询失败")
        .iter()
        .map(|row| PolicyRule::from_row(row).expect("解码失败"))
        .collect()
}

/// 模型中规则的集合视图 (section, ptype, rule)，忽略顺序
pub fn rule_set(model: &MemoryModel) -> BTreeSet<(String, String, Vec<String>)> {
    ["p", "g"]
        .into_iter()
        .flat_map(|sec| {
            model
                .section_policies(sec)
                .into_iter()
                .flat_map(move |(ptype, rules)| {
                    rules
                        .into_iter()
                        .map(move |rule| (sec.to_string(), ptype.clone(), rule))
                })
        })
        .collect()
}

/// 常用的测试模型：两条权限规则、一条带域的权限规则、两条角色规则
pub fn sample_model() -> MemoryModel {
    let mut model = MemoryModel::new();
    model.add_policy("p", "p", rule(&["alice", "data1", "read"]));
    model.add_policy("p", "p", rule(&["bob", "data2", "write"]));
    model.add_policy("p", "p", rule(&["admin", "domain1", "data3", "read", "allow"]));
    model.add_policy("g", "g", rule(&["alice", "admin"]));
    model.add_policy("g", "g2", rule(&["data1", "data_group", "domain1"]));
    model
}
