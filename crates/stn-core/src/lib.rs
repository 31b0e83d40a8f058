//! # STN Core
//!
//! 狀態-任務網路（State-Task Network）核心資料模型與類型定義

pub mod arc;
pub mod bounds;
pub mod config;
pub mod material;
pub mod network;
pub mod task;
pub mod time_grid;
pub mod unit;

// Re-export 主要類型
pub use arc::{ArcDirection, MaterialArc};
pub use bounds::{BoundTables, TaskUnitTable};
pub use config::{BoundConfig, KnapsackStrategy};
pub use material::{Material, MaterialRole};
pub use network::{StnNetwork, StnNetworkBuilder};
pub use task::{Task, TaskKind, TaskUnitParams, Transition, TransitionDirection};
pub use time_grid::TimeGrid;
pub use unit::Unit;

/// STN 錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum StnError {
    #[error("找不到物料: {0}")]
    UnknownMaterial(String),

    #[error("找不到任務: {0}")]
    UnknownTask(String),

    #[error("找不到設備: {0}")]
    UnknownUnit(String),

    #[error("任務 {task} 未指派到設備 {unit}")]
    MissingTaskUnit { task: String, unit: String },

    #[error("重複的識別碼: {0}")]
    DuplicateId(String),

    #[error("無效的參數 ({subject}): {message}")]
    InvalidParameter { subject: String, message: String },

    #[error("轉換任務 {task} 不可連接物料 {material}")]
    TransitionArc { task: String, material: String },

    #[error("物料 {material} 的順序 ({rank}) 不晚於上游物料 {upstream} ({upstream_rank})")]
    OrderInconsistent {
        material: String,
        rank: u32,
        upstream: String,
        upstream_rank: u32,
    },

    #[error("網路存在循環，涉及物料: {0:?}")]
    CyclicNetwork(Vec<String>),

    #[error("無法到達的物料（無初始庫存且無可探索的生產任務）: {0:?}")]
    UnreachableMaterials(Vec<String>),

    #[error("任務 {task} 在設備 {unit} 的可用時段為負 (horizon={horizon}, est={est})")]
    NegativeAvailablePeriods {
        task: String,
        unit: String,
        horizon: u32,
        est: u32,
    },

    #[error("任務 {task} 沒有任何批次組合的產能上限不超過 {cap}")]
    NoFeasibleProduction { task: String, cap: String },

    #[error("任務 {task} 的批次組合數 {combinations} 超過上限 {limit}")]
    CombinationLimitExceeded {
        task: String,
        combinations: u64,
        limit: u64,
    },

    #[error("求解器錯誤 ({program}): {message}")]
    Solver { program: String, message: String },

    #[error("求解器結果 {solver} 與解析上界 {analytic} 不一致 ({program})")]
    SolverMismatch {
        program: String,
        solver: u32,
        analytic: u32,
    },

    #[error("序列化錯誤: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StnError {
    /// 建立參數錯誤
    pub fn invalid(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            subject: subject.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StnError>;
