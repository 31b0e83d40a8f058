//! # STN Bound Engine
//!
//! 排程最佳化前的界限收緊：最早開始時間、累計產量/庫存上界、
//! 運轉期數與啟動次數上界

pub mod calculator;
pub mod est;
pub mod est_group;
pub mod forward;
pub mod knapsack;

// Re-export 主要類型
pub use calculator::BoundCalculator;
pub use est::EstPropagator;
pub use est_group::EstGroupPropagator;
pub use forward::ForwardPropagator;
pub use knapsack::{KnapsackBounds, RunObjective, RunProfile};

use serde::Serialize;

/// 界限計算結果
#[derive(Debug, Clone, Serialize)]
pub struct BoundResult {
    /// 本次計算ID（日誌關聯用）
    pub run_id: uuid::Uuid,

    /// 界限表
    pub tables: stn_core::BoundTables,

    /// 警告信息
    pub warnings: Vec<BoundWarning>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl BoundResult {
    /// 創建空的計算結果
    pub fn empty() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            tables: stn_core::BoundTables::new(),
            warnings: Vec::new(),
            calculation_time_ms: None,
        }
    }

    /// 添加警告
    pub fn add_warnings(&mut self, warnings: impl IntoIterator<Item = BoundWarning>) {
        self.warnings.extend(warnings);
    }

    /// 指定物件的警告
    pub fn warnings_for<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a BoundWarning> {
        self.warnings.iter().filter(move |w| w.subject == subject)
    }
}

/// 界限計算警告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundWarning {
    /// 相關的物料/任務/設備
    pub subject: String,
    pub message: String,
    pub severity: WarningSeverity,
}

impl BoundWarning {
    pub fn new(subject: String, message: String, severity: WarningSeverity) -> Self {
        Self {
            subject,
            message,
            severity,
        }
    }

    pub fn info(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(subject.into(), message.into(), WarningSeverity::Info)
    }

    pub fn warning(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(subject.into(), message.into(), WarningSeverity::Warning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningSeverity {
    Info,
    Warning,
}
