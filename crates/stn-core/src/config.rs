//! 界限計算配置

use serde::{Deserialize, Serialize};

/// 背包子問題的求解方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnapsackStrategy {
    /// 解析封閉式（不呼叫求解器）
    Analytic,
    /// 交由外部整數規劃求解器
    Solver,
    /// 兩者皆執行，結果不一致時視為錯誤
    CrossChecked,
}

/// 界限計算配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundConfig {
    /// 背包子問題求解方式
    pub knapsack_strategy: KnapsackStrategy,

    /// 是否並行求解各背包子問題
    ///
    /// 子問題彼此獨立；結果以有序表收集，輸出與循序執行完全相同。
    pub parallel: bool,

    /// 前向傳播中單一任務可列舉的批次組合上限
    pub max_run_combinations: u64,

    /// 是否計算群組 EST
    pub compute_group_est: bool,

    /// 是否計算累計產量/庫存上界（前向傳播）
    pub compute_forward: bool,

    /// 是否計算運轉期數與啟動次數上界
    pub compute_knapsack: bool,
}

impl BoundConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self {
            knapsack_strategy: KnapsackStrategy::Analytic,
            parallel: false,
            max_run_combinations: 1_000_000,
            compute_group_est: true,
            compute_forward: true,
            compute_knapsack: true,
        }
    }

    /// 建構器模式：設置背包求解方式
    pub fn with_knapsack_strategy(mut self, strategy: KnapsackStrategy) -> Self {
        self.knapsack_strategy = strategy;
        self
    }

    /// 建構器模式：設置是否並行
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// 建構器模式：設置批次組合上限
    pub fn with_max_run_combinations(mut self, limit: u64) -> Self {
        self.max_run_combinations = limit;
        self
    }

    /// 建構器模式：開關群組 EST
    pub fn with_group_est(mut self, enabled: bool) -> Self {
        self.compute_group_est = enabled;
        self
    }

    /// 建構器模式：開關前向傳播
    pub fn with_forward(mut self, enabled: bool) -> Self {
        self.compute_forward = enabled;
        self
    }

    /// 建構器模式：開關背包上界
    pub fn with_knapsack(mut self, enabled: bool) -> Self {
        self.compute_knapsack = enabled;
        self
    }

    /// 是否需要外部求解器
    pub fn needs_solver(&self) -> bool {
        self.compute_knapsack && self.knapsack_strategy != KnapsackStrategy::Analytic
    }
}

impl Default for BoundConfig {
    fn default() -> Self {
        Self::new()
    }
}
