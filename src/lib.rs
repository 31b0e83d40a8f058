//! # STN Bounds
//!
//! 狀態-任務網路排程模型的界限收緊引擎
//!
//! - [`model`]：網路模型、界限表、配置與錯誤類型
//! - [`calc`]：EST / 群組 EST / 前向傳播 / 背包上界
//! - [`optimizer`]：背包子問題的整數規劃求解器

pub mod logging;

pub use stn_calc as calc;
pub use stn_core as model;
pub use stn_optimizer as optimizer;

pub use stn_calc::{BoundCalculator, BoundResult, BoundWarning, WarningSeverity};
pub use stn_core::{BoundConfig, BoundTables, KnapsackStrategy, StnError, StnNetwork};
pub use stn_optimizer::{DynamicProgrammingSolver, IntegerProgramSolver, LpSolver};

/// 依配置建立計算器，需要求解器時使用 good_lp
pub fn calculator_for(config: BoundConfig) -> BoundCalculator {
    if config.needs_solver() {
        BoundCalculator::new(config).with_solver(LpSolver::new())
    } else {
        BoundCalculator::new(config)
    }
}

/// 從 JSON 載入網路並以指定配置計算全部界限
pub fn compute_bounds_from_json(network_json: &str, config: BoundConfig) -> stn_core::Result<BoundResult> {
    let network = StnNetwork::from_json(network_json)?;
    calculator_for(config).calculate(&network)
}
