//! # STN Optimizer
//!
//! 外部整數規劃求解器邊界（小型有界背包子問題）

pub mod dp;
pub mod lp;

use serde::{Deserialize, Serialize};

// Re-export 主要類型
pub use dp::DynamicProgrammingSolver;
pub use lp::LpSolver;

/// 背包物品：整數變數「選取次數」
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnapsackItem {
    /// 物品標籤（例如運轉長度）
    pub label: String,

    /// 每次選取佔用的容量
    pub weight: u32,

    /// 每次選取的目標值
    pub value: u32,

    /// 選取次數上限（None 表示只受容量限制）
    pub upper: Option<u32>,
}

impl KnapsackItem {
    pub fn new(label: impl Into<String>, weight: u32, value: u32) -> Self {
        Self {
            label: label.into(),
            weight,
            value,
            upper: None,
        }
    }

    /// 建構器模式：設置選取次數上限
    pub fn with_upper(mut self, upper: u32) -> Self {
        self.upper = Some(upper);
        self
    }
}

/// 單一容量約束、最大化目標的整數規劃
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnapsackProgram {
    /// 子問題名稱（錯誤與日誌使用）
    pub name: String,
    pub items: Vec<KnapsackItem>,
    pub capacity: u32,
}

impl KnapsackProgram {
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            capacity,
        }
    }

    /// 建構器模式：加入物品
    pub fn with_item(mut self, item: KnapsackItem) -> Self {
        self.items.push(item);
        self
    }

    /// 給定選取次數的總重量
    pub fn weight_of(&self, counts: &[u32]) -> u64 {
        self.items
            .iter()
            .zip(counts)
            .map(|(item, &n)| u64::from(item.weight) * u64::from(n))
            .sum()
    }

    /// 給定選取次數的目標值
    pub fn value_of(&self, counts: &[u32]) -> u64 {
        self.items
            .iter()
            .zip(counts)
            .map(|(item, &n)| u64::from(item.value) * u64::from(n))
            .sum()
    }

    /// 檢查選取次數是否滿足容量與上限
    pub fn is_feasible(&self, counts: &[u32]) -> bool {
        counts.len() == self.items.len()
            && self.weight_of(counts) <= u64::from(self.capacity)
            && self
                .items
                .iter()
                .zip(counts)
                .all(|(item, &n)| item.upper.map_or(true, |upper| n <= upper))
    }

    /// 檢查是否有零重量但正價值的物品（目標無界）
    pub(crate) fn check_bounded(&self) -> stn_core::Result<()> {
        match self
            .items
            .iter()
            .find(|item| item.weight == 0 && item.value > 0 && item.upper.is_none())
        {
            Some(item) => Err(stn_core::StnError::Solver {
                program: self.name.clone(),
                message: format!("物品 {} 重量為 0，目標無界", item.label),
            }),
            None => Ok(()),
        }
    }
}

/// 背包子問題的最優解
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnapsackSolution {
    /// 各物品的選取次數
    pub counts: Vec<u32>,

    /// 最優目標值
    pub objective: u32,
}

/// 外部整數規劃求解器
///
/// 實作必須回傳最優解；無法求解時回傳 `StnError::Solver`，
/// 不可以任意預設值代替。
pub trait IntegerProgramSolver: Send + Sync {
    /// 求解器名稱
    fn name(&self) -> &str;

    /// 最大化求解
    fn maximize(&self, program: &KnapsackProgram) -> stn_core::Result<KnapsackSolution>;
}
