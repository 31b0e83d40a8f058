//! 任務、任務-設備參數與轉換關係

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 任務類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// 一般生產任務
    Production,
    /// 啟動
    Startup,
    /// 停機
    Shutdown,
    /// 直接換線
    DirectChangeover,
}

impl TaskKind {
    pub fn is_production(self) -> bool {
        matches!(self, TaskKind::Production)
    }

    pub fn is_transition(self) -> bool {
        !self.is_production()
    }
}

/// 任務
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// 任務ID
    pub id: String,

    /// 任務類型
    pub kind: TaskKind,

    /// 每次運轉結束後必須保留的閒置/轉換期數
    #[serde(default)]
    pub tau_end: u32,
}

impl Task {
    /// 創建新的任務
    pub fn new(id: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            id: id.into(),
            kind,
            tau_end: 0,
        }
    }

    /// 創建生產任務
    pub fn production(id: impl Into<String>) -> Self {
        Self::new(id, TaskKind::Production)
    }

    /// 建構器模式：設置運轉後閒置期數
    pub fn with_tau_end(mut self, tau_end: u32) -> Self {
        self.tau_end = tau_end;
        self
    }
}

/// 任務在特定設備上的參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUnitParams {
    pub task_id: String,
    pub unit_id: String,

    /// 最小批量（每期）
    pub beta_min: Decimal,

    /// 最大批量（每期）
    pub beta_max: Decimal,

    /// 最短運轉期數
    pub tau_min: u32,

    /// 最長運轉期數
    pub tau_max: u32,

    /// 運輸/加工延遲
    #[serde(default)]
    pub tau: u32,

    /// 有效作業視窗（None 表示整個計劃時界）
    #[serde(default)]
    pub theta: Option<u32>,

    #[serde(default)]
    pub fixed_cost: Decimal,

    #[serde(default)]
    pub variable_cost: Decimal,

    #[serde(default)]
    pub startup_cost: Decimal,
}

impl TaskUnitParams {
    /// 創建新的任務-設備參數
    pub fn new(
        task_id: impl Into<String>,
        unit_id: impl Into<String>,
        tau_min: u32,
        tau_max: u32,
        beta_min: Decimal,
        beta_max: Decimal,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            unit_id: unit_id.into(),
            beta_min,
            beta_max,
            tau_min,
            tau_max,
            tau: 0,
            theta: None,
            fixed_cost: Decimal::ZERO,
            variable_cost: Decimal::ZERO,
            startup_cost: Decimal::ZERO,
        }
    }

    /// 建構器模式：設置延遲
    pub fn with_tau(mut self, tau: u32) -> Self {
        self.tau = tau;
        self
    }

    /// 建構器模式：設置作業視窗
    pub fn with_theta(mut self, theta: u32) -> Self {
        self.theta = Some(theta);
        self
    }

    /// 建構器模式：設置成本
    pub fn with_costs(mut self, fixed: Decimal, variable: Decimal, startup: Decimal) -> Self {
        self.fixed_cost = fixed;
        self.variable_cost = variable;
        self.startup_cost = startup;
        self
    }

    /// 最小運轉的產量 `tau_min * beta_min`
    pub fn min_run_output(&self) -> Decimal {
        Decimal::from(self.tau_min) * self.beta_min
    }

    /// 最大運轉的產量 `tau_max * beta_max`
    pub fn max_run_output(&self) -> Decimal {
        Decimal::from(self.tau_max) * self.beta_max
    }

    /// 有效作業視窗，未設置時為計劃時界
    pub fn operating_window(&self, horizon: u32) -> u32 {
        self.theta.unwrap_or(horizon)
    }
}

/// 轉換方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionDirection {
    /// 轉換任務在生產任務之前（例如啟動）
    FeedsInto,
    /// 轉換任務在生產任務之後（例如停機、換線）
    ConsumesFrom,
}

/// 生產任務與轉換任務之間的關係
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub production_task: String,
    pub transition_task: String,
    pub direction: TransitionDirection,
}

impl Transition {
    pub fn new(
        production_task: impl Into<String>,
        transition_task: impl Into<String>,
        direction: TransitionDirection,
    ) -> Self {
        Self {
            production_task: production_task.into(),
            transition_task: transition_task.into(),
            direction,
        }
    }
}
