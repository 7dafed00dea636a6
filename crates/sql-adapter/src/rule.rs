//! 策略规则行模型
//!
//! 负责内存中的规则元组与定宽表行之间的转换。

use sqlx::Row;
use sqlx::any::AnyRow;
use tracing::warn;

use crate::error::Result;

/// 单行可存储的最大字段数（v0..v5）
pub const MAX_FIELDS: usize = 6;

/// 表列顺序，所有 SQL 都按此顺序绑定参数
pub const COLUMNS: [&str; 7] = ["ptype", "v0", "v1", "v2", "v3", "v4", "v5"];

/// 重建策略行时字段之间的分隔符
pub const LINE_DELIMITER: &str = ", ";

/// 策略表的一行
///
/// 未使用的尾部字段一律为空串，不会是 NULL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyRule {
    pub ptype: String,
    pub v0: String,
    pub v1: String,
    pub v2: String,
    pub v3: String,
    pub v4: String,
    pub v5: String,
}

impl PolicyRule {
    /// 由规则类型和字段构造一行
    ///
    /// 字段按位置写入 v0..v5，超出部分被丢弃
    pub fn from_rule(ptype: &str, rule: &[String]) -> Self {
        if rule.len() > MAX_FIELDS {
            warn!(
                ptype,
                fields = rule.len(),
                "Rule has more than {} fields, extra fields are dropped",
                MAX_FIELDS
            );
        }

        let field = |i: usize| rule.get(i).cloned().unwrap_or_default();

        Self {
            ptype: ptype.to_string(),
            v0: field(0),
            v1: field(1),
            v2: field(2),
            v3: field(3),
            v4: field(4),
            v5: field(5),
        }
    }

    /// 从查询结果解码
    ///
    /// 外部写入的 NULL 视为空串
    pub fn from_row(row: &AnyRow) -> Result<Self> {
        let column = |name: &str| -> Result<String> {
            Ok(row
                .try_get::<Option<String>, _>(name)?
                .unwrap_or_default())
        };

        Ok(Self {
            ptype: column("ptype")?,
            v0: column("v0")?,
            v1: column("v1")?,
            v2: column("v2")?,
            v3: column("v3")?,
            v4: column("v4")?,
            v5: column("v5")?,
        })
    }

    /// v0..v5
    pub fn fields(&self) -> [&str; MAX_FIELDS] {
        [
            self.v0.as_str(),
            self.v1.as_str(),
            self.v2.as_str(),
            self.v3.as_str(),
            self.v4.as_str(),
            self.v5.as_str(),
        ]
    }

    /// 按 [`COLUMNS`] 顺序返回全部列值
    pub fn values(&self) -> [&str; 7] {
        let [v0, v1, v2, v3, v4, v5] = self.fields();
        [self.ptype.as_str(), v0, v1, v2, v3, v4, v5]
    }

    /// 截断尾部空字段后的规则
    pub fn trimmed_fields(&self) -> Vec<String> {
        let fields = self.fields();
        let len = fields
            .iter()
            .rposition(|f| !f.is_empty())
            .map_or(0, |last| last + 1);

        fields[..len].iter().map(|f| f.to_string()).collect()
    }

    /// 重建可被 model 加载的策略行
    ///
    /// 只保留到最后一个非空字段，中间的空字段按位置保留。
    /// 全部字段为空时返回 None，这样的行在加载时被跳过。
    ///
    /// 字段不做转义：含 `,` 的字段重新加载时会被拆成多个字段。
    pub fn to_line(&self) -> Option<String> {
        let fields = self.trimmed_fields();
        if fields.is_empty() {
            return None;
        }

        let mut parts = Vec::with_capacity(fields.len() + 1);
        parts.push(self.ptype.as_str());
        parts.extend(fields.iter().map(String::as_str));

        Some(parts.join(LINE_DELIMITER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_from_rule_pads_missing_fields() {
        let row = PolicyRule::from_rule("p", &rule(&["alice", "data1", "read"]));
        assert_eq!(row.ptype, "p");
        assert_eq!(row.v0, "alice");
        assert_eq!(row.v2, "read");
        assert_eq!(row.v3, "");
        assert_eq!(row.v5, "");
    }

    #[test]
    fn test_from_rule_drops_extra_fields() {
        let row = PolicyRule::from_rule("p", &rule(&["a", "b", "c", "d", "e", "f", "g"]));
        assert_eq!(row.v5, "f");
        assert_eq!(row.to_line().unwrap(), "p, a, b, c, d, e, f");
    }

    #[test]
    fn test_values_follow_column_order() {
        let row = PolicyRule::from_rule("g", &rule(&["alice", "admin"]));
        assert_eq!(row.values(), ["g", "alice", "admin", "", "", "", ""]);
        assert_eq!(row.values().len(), COLUMNS.len());
    }

    #[test]
    fn test_to_line_truncates_at_last_non_empty_field() {
        for len in 1..=MAX_FIELDS {
            let fields: Vec<String> = (0..len).map(|i| format!("f{}", i)).collect();
            let line = PolicyRule::from_rule("p", &fields).to_line().unwrap();

            let expected = std::iter::once("p".to_string())
                .chain(fields)
                .collect::<Vec<_>>()
                .join(LINE_DELIMITER);
            assert_eq!(line, expected);
        }
    }

    #[test]
    fn test_to_line_keeps_interior_empty_fields() {
        let row = PolicyRule::from_rule("p", &rule(&["alice", "", "read", ""]));
        assert_eq!(row.to_line().unwrap(), "p, alice, , read");
    }

    #[test]
    fn test_to_line_without_fields_is_none() {
        assert!(PolicyRule::from_rule("p", &[]).to_line().is_none());
        assert!(PolicyRule::from_rule("p", &rule(&["", ""])).to_line().is_none());
    }

    #[test]
    fn test_trimmed_fields() {
        let row = PolicyRule::from_rule("p", &rule(&["alice", "data1", "", ""]));
        assert_eq!(row.trimmed_fields(), rule(&["alice", "data1"]));
    }
}
