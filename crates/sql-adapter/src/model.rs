//! 策略模型
//!
//! 适配器只通过 [`PolicyModel`] 读写外部策略模型：保存时按 section 迭代规则，
//! 加载时把重建出的策略行交给 [`load_policy_line`] 解析入桶。

use std::collections::BTreeMap;

use tracing::debug;

/// 权限策略 section
pub const POLICY_SECTION: &str = "p";

/// 角色继承（grouping）策略 section
pub const GROUPING_SECTION: &str = "g";

/// 保存时的 section 顺序
pub const SECTIONS: [&str; 2] = [POLICY_SECTION, GROUPING_SECTION];

/// 外部策略模型接口
#[cfg_attr(test, mockall::automock)]
pub trait PolicyModel: Send + Sync {
    /// 按模型的迭代顺序返回某个 section 下的 (ptype, 规则列表)
    fn section_policies(&self, sec: &str) -> Vec<(String, Vec<Vec<String>>)>;

    /// 向 section/ptype 追加一条规则
    fn add_policy(&mut self, sec: &str, ptype: &str, rule: Vec<String>);
}

/// 解析一条策略行并写入模型
///
/// 空行与 `#` 开头的注释行被忽略。第一个 token 为 ptype，其首字符决定 section。
pub fn load_policy_line(line: &str, model: &mut dyn PolicyModel) {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return;
    }

    let mut tokens = line.split(',').map(|t| t.trim().to_string());
    let Some(ptype) = tokens.next() else {
        return;
    };
    let Some(sec) = ptype.chars().next() else {
        debug!(line, "Skipping policy line without ptype");
        return;
    };

    model.add_policy(&sec.to_string(), &ptype, tokens.collect());
}

/// 内存策略模型
///
/// section -> ptype -> 规则列表，section 与 ptype 按字典序迭代，规则保持插入顺序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryModel {
    sections: BTreeMap<String, BTreeMap<String, Vec<Vec<String>>>>,
}

impl MemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取某个 ptype 下的全部规则
    pub fn policy(&self, sec: &str, ptype: &str) -> &[Vec<String>] {
        self.sections
            .get(sec)
            .and_then(|types| types.get(ptype))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> bool {
        self.policy(sec, ptype).iter().any(|r| r.as_slice() == rule)
    }

    /// 规则总数
    pub fn rule_count(&self) -> usize {
        self.sections
            .values()
            .flat_map(|types| types.values())
            .map(Vec::len)
            .sum()
    }

    /// 每个 (section, ptype) 的规则数
    pub fn summary(&self) -> Vec<(String, String, usize)> {
        self.sections
            .iter()
            .flat_map(|(sec, types)| {
                types
                    .iter()
                    .map(move |(ptype, rules)| (sec.clone(), ptype.clone(), rules.len()))
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.sections.clear();
    }
}

impl PolicyModel for MemoryModel {
    fn section_policies(&self, sec: &str) -> Vec<(String, Vec<Vec<String>>)> {
        self.sections
            .get(sec)
            .map(|types| {
                types
                    .iter()
                    .map(|(ptype, rules)| (ptype.clone(), rules.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn add_policy(&mut self, sec: &str, ptype: &str, rule: Vec<String>) {
        self.sections
            .entry(sec.to_string())
            .or_default()
            .entry(ptype.to_string())
            .or_default()
            .push(rule);
    }
}
