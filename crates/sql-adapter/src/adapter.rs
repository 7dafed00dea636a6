//! SQL 策略适配器
//!
//! 把策略规则持久化到单张关系表（ptype, v0..v5），并从表中重建策略模型。
//!
//! ## 设计原则
//!
//! - 每个公开操作恰好对应一个顶层事务，批量操作要么全部生效要么全部回滚
//! - 不在进程内缓存规则，每次操作都访问数据库
//! - 并发正确性交给数据库的事务隔离级别，适配器不做额外加锁
//! - 同一事务内重复执行的语句由 sqlx 的语句缓存只准备一次

use async_trait::async_trait;
use futures::TryStreamExt;
use policy_shared::{AdapterConfig, Database, DatabaseConfig};
use sqlx::any::AnyArguments;
use sqlx::query::Query;
use sqlx::{Any, AnyConnection};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::model::{PolicyModel, SECTIONS, load_policy_line};
use crate::rule::PolicyRule;
use crate::statement::PolicyStatements;
use crate::traits::Adapter;
use crate::transaction::run_in_transaction;

/// 基于 sqlx 的策略适配器
#[derive(Clone)]
pub struct SqlAdapter {
    db: Database,
    statements: PolicyStatements,
}

impl SqlAdapter {
    /// 使用已有连接池创建适配器
    pub fn new(db: Database, table_name: &str) -> Result<Self> {
        let statements = PolicyStatements::new(table_name, db.driver())?;
        Ok(Self { db, statements })
    }

    /// 按驱动、账号、地址、库名创建适配器
    ///
    /// 连接池惰性建立，连接错误在第一次操作时返回
    pub fn connect_lazy(config: &DatabaseConfig, table_name: &str) -> Result<Self> {
        Self::new(Database::connect_lazy(config)?, table_name)
    }

    pub fn from_config(config: &AdapterConfig) -> Result<Self> {
        Self::connect_lazy(&config.database, &config.policy.table_name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn table_name(&self) -> &str {
        self.statements.table()
    }

    /// 关闭连接池
    pub async fn close(&self) {
        self.db.close().await;
    }

    // ==================== 全量操作 ====================

    /// 读取全部行并写入模型
    ///
    /// 只有数据库读取是事务性的：中途解码失败时，已加载到模型的规则不会被撤回
    #[instrument(skip(self, model), fields(table = %self.table_name()))]
    pub async fn load_policy(&self, model: &mut dyn PolicyModel) -> Result<()> {
        let sql = self.statements.select_all();

        let loaded = run_in_transaction(self.db.pool(), |mut tx| async move {
            let result = load_rows(&mut tx, &sql, model).await;
            (tx, result)
        })
        .await?;

        info!(loaded, "Policy loaded");
        Ok(())
    }

    /// 用模型替换整张表
    ///
    /// 同一事务内先清空表，再按 "p"、"g" 的顺序写入全部规则，任一写入失败则整体回滚
    #[instrument(skip(self, model), fields(table = %self.table_name()))]
    pub async fn save_policy(&self, model: &dyn PolicyModel) -> Result<()> {
        let rows = collect_rules(model);
        let delete_sql = self.statements.delete_all();
        let insert_sql = self.statements.insert();

        let saved = run_in_transaction(self.db.pool(), |mut tx| async move {
            let result = replace_rows(&mut tx, &delete_sql, &insert_sql, &rows).await;
            (tx, result)
        })
        .await?;

        info!(saved, "Policy saved");
        Ok(())
    }

    /// 清空策略表，返回删除的行数
    #[instrument(skip(self), fields(table = %self.table_name()))]
    pub async fn clear_policy(&self) -> Result<u64> {
        let sql = self.statements.delete_all();

        let removed = run_in_transaction(self.db.pool(), |mut tx| async move {
            let result = execute(&mut tx, &sql).await;
            (tx, result)
        })
        .await?;

        info!(removed, "Policy table cleared");
        Ok(removed)
    }

    // ==================== 增量操作 ====================

    /// 插入一条规则
    #[instrument(skip(self, rule), fields(table = %self.table_name()))]
    pub async fn add_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> Result<()> {
        let rows = vec![PolicyRule::from_rule(ptype, rule)];
        self.insert_batch(rows).await
    }

    /// 原子地插入一批规则，按输入顺序执行，第一条失败即整体回滚
    #[instrument(skip(self, rules), fields(table = %self.table_name(), count = rules.len()))]
    pub async fn add_policies(&self, sec: &str, ptype: &str, rules: &[Vec<String>]) -> Result<()> {
        if rules.is_empty() {
            return Ok(());
        }

        let rows = rules
            .iter()
            .map(|rule| PolicyRule::from_rule(ptype, rule))
            .collect();
        self.insert_batch(rows).await
    }

    /// 删除与完整元组精确匹配的行，返回删除的行数
    ///
    /// 未设置的尾部字段按空串匹配；没有匹配行不视为错误
    #[instrument(skip(self, rule), fields(table = %self.table_name()))]
    pub async fn remove_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> Result<u64> {
        let rows = vec![PolicyRule::from_rule(ptype, rule)];
        self.delete_batch(rows).await
    }

    /// 原子地删除一批规则，逐条精确匹配，第一条失败即整体回滚
    #[instrument(skip(self, rules), fields(table = %self.table_name(), count = rules.len()))]
    pub async fn remove_policies(
        &self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<u64> {
        if rules.is_empty() {
            return Ok(0);
        }

        let rows = rules
            .iter()
            .map(|rule| PolicyRule::from_rule(ptype, rule))
            .collect();
        self.delete_batch(rows).await
    }

    /// 按部分元组删除
    ///
    /// 从 `field_index` 开始依次约束 `field_values.len()` 个字段，其余字段视为通配。
    /// 约束窗口超出 v5 时不执行任何 SQL，直接返回错误。
    #[instrument(skip(self), fields(table = %self.table_name()))]
    pub async fn remove_filtered_policy(
        &self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<u64> {
        let sql = self
            .statements
            .delete_filtered(field_index, field_values.len())?;
        let ptype = ptype.to_string();
        let values = field_values.to_vec();

        let removed = run_in_transaction(self.db.pool(), |mut tx| async move {
            let result = delete_filtered(&mut tx, &sql, &ptype, &values).await;
            (tx, result)
        })
        .await?;

        info!(removed, "Filtered policy removed");
        Ok(removed)
    }

    async fn insert_batch(&self, rows: Vec<PolicyRule>) -> Result<()> {
        let sql = self.statements.insert();

        let inserted = run_in_transaction(self.db.pool(), |mut tx| async move {
            let result = insert_rows(&mut tx, &sql, &rows).await;
            (tx, result)
        })
        .await?;

        debug!(inserted, "Policy rows inserted");
        Ok(())
    }

    async fn delete_batch(&self, rows: Vec<PolicyRule>) -> Result<u64> {
        let sql = self.statements.delete_exact();

        let removed = run_in_transaction(self.db.pool(), |mut tx| async move {
            let result = delete_rows(&mut tx, &sql, &rows).await;
            (tx, result)
        })
        .await?;

        debug!(removed, "Policy rows removed");
        Ok(removed)
    }
}

#[async_trait]
impl Adapter for SqlAdapter {
    async fn load_policy(&self, model: &mut dyn PolicyModel) -> Result<()> {
        self.load_policy(model).await
    }

    async fn save_policy(&self, model: &dyn PolicyModel) -> Result<()> {
        self.save_policy(model).await
    }

    async fn clear_policy(&self) -> Result<u64> {
        self.clear_policy().await
    }

    async fn add_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> Result<()> {
        self.add_policy(sec, ptype, rule).await
    }

    async fn add_policies(&self, sec: &str, ptype: &str, rules: &[Vec<String>]) -> Result<()> {
        self.add_policies(sec, ptype, rules).await
    }

    async fn remove_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> Result<u64> {
        self.remove_policy(sec, ptype, rule).await
    }

    async fn remove_policies(
        &self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<u64> {
        self.remove_policies(sec, ptype, rules).await
    }

    async fn remove_filtered_policy(
        &self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<u64> {
        self.remove_filtered_policy(sec, ptype, field_index, field_values)
            .await
    }
}

/// 按 section 顺序、模型迭代顺序展开全部规则
fn collect_rules(model: &dyn PolicyModel) -> Vec<PolicyRule> {
    SECTIONS
        .iter()
        .flat_map(|sec| model.section_policies(sec))
        .flat_map(|(ptype, rules)| {
            rules
                .into_iter()
                .map(move |rule| PolicyRule::from_rule(&ptype, &rule))
        })
        .collect()
}

fn bind_rule<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    rule: &'q PolicyRule,
) -> Query<'q, Any, AnyArguments<'q>> {
    rule.values()
        .into_iter()
        .fold(query, |query, value| query.bind(value))
}

async fn execute(conn: &mut AnyConnection, sql: &str) -> Result<u64> {
    let result = sqlx::query::<Any>(sql).execute(conn).await?;
    Ok(result.rows_affected())
}

async fn load_rows(
    conn: &mut AnyConnection,
    sql: &str,
    model: &mut dyn PolicyModel,
) -> Result<usize> {
    let mut rows = sqlx::query::<Any>(sql).fetch(conn);
    let mut loaded = 0;

    while let Some(row) = rows.try_next().await? {
        let rule = PolicyRule::from_row(&row)?;
        match rule.to_line() {
            Some(line) => {
                load_policy_line(&line, model);
                loaded += 1;
            }
            None => debug!(ptype = %rule.ptype, "Skipping policy row without fields"),
        }
    }

    Ok(loaded)
}

async fn insert_rows(conn: &mut AnyConnection, sql: &str, rows: &[PolicyRule]) -> Result<u64> {
    let mut inserted = 0;
    for row in rows {
        inserted += bind_rule(sqlx::query(sql), row)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }
    Ok(inserted)
}

async fn replace_rows(
    conn: &mut AnyConnection,
    delete_sql: &str,
    insert_sql: &str,
    rows: &[PolicyRule],
) -> Result<u64> {
    let removed = execute(&mut *conn, delete_sql).await?;
    debug!(removed, "Existing policy rows cleared");
    insert_rows(conn, insert_sql, rows).await
}

async fn delete_rows(conn: &mut AnyConnection, sql: &str, rows: &[PolicyRule]) -> Result<u64> {
    let mut removed = 0;
    for row in rows {
        removed += bind_rule(sqlx::query(sql), row)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }
    Ok(removed)
}

async fn delete_filtered(
    conn: &mut AnyConnection,
    sql: &str,
    ptype: &str,
    values: &[String],
) -> Result<u64> {
    let query = values
        .iter()
        .fold(sqlx::query::<Any>(sql).bind(ptype), |query, value| {
            query.bind(value.as_str())
        });
    Ok(query.execute(conn).await?.rows_affected())
}
