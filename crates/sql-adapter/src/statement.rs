//! SQL 语句构建
//!
//! 表名在构造时校验后直接拼入语句，所有规则值都通过绑定参数传递。

use policy_shared::Driver;

use crate::error::{AdapterError, Result};
use crate::rule::{COLUMNS, MAX_FIELDS};

/// 策略表的 SQL 语句集合
#[derive(Debug, Clone)]
pub struct PolicyStatements {
    table: String,
    driver: Driver,
}

impl PolicyStatements {
    pub fn new(table: &str, driver: Driver) -> Result<Self> {
        validate_table_name(table)?;
        Ok(Self {
            table: table.to_string(),
            driver,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `col = <placeholder>`，占位符编号从 `first` 开始
    fn conditions(&self, columns: &[&str], first: usize) -> Vec<String> {
        columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = {}", column, self.driver.placeholder(first + i)))
            .collect()
    }

    pub fn select_all(&self) -> String {
        format!("SELECT {} FROM {}", COLUMNS.join(", "), self.table)
    }

    pub fn insert(&self) -> String {
        let placeholders = (1..=COLUMNS.len())
            .map(|n| self.driver.placeholder(n))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            COLUMNS.join(", "),
            placeholders
        )
    }

    pub fn delete_all(&self) -> String {
        format!("DELETE FROM {}", self.table)
    }

    /// 按完整元组（ptype + v0..v5）精确匹配删除
    pub fn delete_exact(&self) -> String {
        format!(
            "DELETE FROM {} WHERE {}",
            self.table,
            self.conditions(&COLUMNS, 1).join(" AND ")
        )
    }

    /// 按部分元组删除
    ///
    /// 约束 ptype 以及 `[field_index, field_index + count)` 范围内的字段，
    /// 范围外的字段不参与匹配。绑定顺序为 ptype 后接各字段值。
    pub fn delete_filtered(&self, field_index: usize, count: usize) -> Result<String> {
        let end = field_index
            .checked_add(count)
            .filter(|end| *end <= MAX_FIELDS)
            .ok_or(AdapterError::InvalidFilter { field_index, count })?;

        let field_columns = &COLUMNS[1 + field_index..1 + end];
        let mut columns = Vec::with_capacity(count + 1);
        columns.push(COLUMNS[0]);
        columns.extend_from_slice(field_columns);

        Ok(format!(
            "DELETE FROM {} WHERE {}",
            self.table,
            self.conditions(&columns, 1).join(" AND ")
        ))
    }
}

/// 表名只允许字母、数字、下划线，以及一个 schema 分隔点
fn validate_table_name(table: &str) -> Result<()> {
    let invalid = || AdapterError::InvalidTableName(table.to_string());

    let parts: Vec<&str> = table.split('.').collect();
    if parts.len() > 2 {
        return Err(invalid());
    }

    for part in parts {
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return Err(invalid()),
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid());
        }
    }

    Ok(())
}
