//! 界限表（由界限計算產生，供 MILP 組裝唯讀使用）

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 以（任務, 設備）為鍵的表，序列化為巢狀物件 `{task: {unit: value}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskUnitTable<T>(BTreeMap<String, BTreeMap<String, T>>);

impl<T> Default for TaskUnitTable<T> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<T: Copy> TaskUnitTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, task: &str, unit: &str) -> Option<T> {
        self.0.get(task).and_then(|units| units.get(unit)).copied()
    }

    pub fn insert(&mut self, task: &str, unit: &str, value: T) -> Option<T> {
        self.0
            .entry(task.to_string())
            .or_default()
            .insert(unit.to_string(), value)
    }

    /// 依（任務, 設備）排序的所有項目
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, T)> {
        self.0.iter().flat_map(|(task, units)| {
            units
                .iter()
                .map(move |(unit, value)| (task.as_str(), unit.as_str(), *value))
        })
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 每個實例的界限表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundTables {
    /// 最早可開始期 EST[task, unit]
    pub est: TaskUnitTable<u32>,

    /// 共用物料之消耗群組的最早可開始期 EST_GROUP[material]
    pub est_group: BTreeMap<String, u32>,

    /// 總運轉期數上界 UPPER_BOUND_X[task, unit]
    pub upper_bound_x: TaskUnitTable<u32>,

    /// 設備總運轉期數上界 UPPER_BOUND_X_UNIT[unit]
    pub upper_bound_x_unit: BTreeMap<String, u32>,

    /// 啟動次數上界 UPPER_BOUND_YS_TASK[task, unit]
    pub upper_bound_ys_task: TaskUnitTable<u32>,

    /// 設備啟動次數上界 UPPER_BOUND_YS_UNIT[unit]
    pub upper_bound_ys_unit: BTreeMap<String, u32>,

    /// 任務最大累計產量 MU_ADJUSTED[task]
    pub mu_adjusted: BTreeMap<String, Decimal>,

    /// 物料最大累計庫存 OMEGA[material]
    pub omega: BTreeMap<String, Decimal>,
}

impl BoundTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// 最早可開始期，未計算的組合視為 0
    pub fn est(&self, task: &str, unit: &str) -> u32 {
        self.est.get(task, unit).unwrap_or(0)
    }

    /// 群組最早可開始期，未收緊的物料為 0
    pub fn est_group(&self, material: &str) -> u32 {
        self.est_group.get(material).copied().unwrap_or(0)
    }

    /// 任務在期別 `period` 是否可能運轉（EST 之前的活動變數可固定為 0）
    pub fn may_be_active(&self, task: &str, unit: &str, period: u32) -> bool {
        period >= self.est(task, unit)
    }

    /// 以 JSON 匯出
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
