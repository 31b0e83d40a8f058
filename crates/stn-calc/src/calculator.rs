//! 界限計算主流程

use stn_core::{BoundConfig, BoundTables, StnError, StnNetwork};
use stn_optimizer::IntegerProgramSolver;

use crate::{
    BoundResult, EstGroupPropagator, EstPropagator, ForwardPropagator, KnapsackBounds,
};

/// 界限計算器
pub struct BoundCalculator {
    /// 計算配置
    config: BoundConfig,

    /// 背包子問題使用的外部求解器
    solver: Option<Box<dyn IntegerProgramSolver>>,
}

impl BoundCalculator {
    /// 創建新的界限計算器（不帶求解器）
    pub fn new(config: BoundConfig) -> Self {
        Self {
            config,
            solver: None,
        }
    }

    /// 建構器模式：設置外部求解器
    pub fn with_solver(mut self, solver: impl IntegerProgramSolver + 'static) -> Self {
        self.solver = Some(Box::new(solver));
        self
    }

    pub fn config(&self) -> &BoundConfig {
        &self.config
    }

    /// 主計算入口
    ///
    /// 任一步驟失敗即中止，不回傳部分界限。
    pub fn calculate(&self, network: &StnNetwork) -> stn_core::Result<BoundResult> {
        let mut result = BoundResult::empty();
        let run_id = result.run_id;

        tracing::info!(
            %run_id,
            "開始界限計算：物料 {} 個，任務 {} 個，設備 {} 個，時界 {}",
            network.materials().count(),
            network.tasks().count(),
            network.units().count(),
            network.horizon()
        );

        if self.config.needs_solver() && self.solver.is_none() {
            return Err(StnError::Solver {
                program: "knapsack".to_string(),
                message: format!("策略 {:?} 需要整數規劃求解器", self.config.knapsack_strategy),
            });
        }

        let start_time = std::time::Instant::now();
        let mut tables = BoundTables::new();

        // Step 1: EST
        tracing::debug!("Step 1: EST 傳播");
        let warnings = EstPropagator::propagate(network, &mut tables)?;
        result.add_warnings(warnings);
        tracing::debug!("EST 組合數: {}", tables.est.len());

        // Step 2: 群組 EST
        if self.config.compute_group_est {
            tracing::debug!("Step 2: 群組 EST");
            let warnings = EstGroupPropagator::propagate(network, &mut tables)?;
            result.add_warnings(warnings);
            tracing::debug!("群組 EST 物料數: {}", tables.est_group.len());
        }

        // Step 3: 累計產量/庫存上界
        if self.config.compute_forward {
            tracing::debug!("Step 3: 前向傳播");
            let warnings = ForwardPropagator::propagate(network, &mut tables, &self.config)?;
            result.add_warnings(warnings);
        }

        // Step 4: 運轉期數與啟動次數上界
        if self.config.compute_knapsack {
            tracing::debug!("Step 4: 背包上界");
            KnapsackBounds::compute(network, &mut tables, &self.config, self.solver.as_deref())?;
        }

        for warning in &result.warnings {
            tracing::warn!(%run_id, "{}: {}", warning.subject, warning.message);
        }

        result.tables = tables;
        result.calculation_time_ms = Some(start_time.elapsed().as_millis());

        tracing::info!(%run_id, "界限計算完成，耗時 {:?}", start_time.elapsed());
        tracing::info!("警告數量: {}", result.warnings.len());

        Ok(result)
    }
}

impl Default for BoundCalculator {
    fn default() -> Self {
        Self::new(BoundConfig::default())
    }
}
