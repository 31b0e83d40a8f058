//! 物料-任務連接（弧）

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 弧的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    /// 物料 → 任務（消耗，rho < 0）
    Consumption,
    /// 任務 → 物料（產出，rho > 0）
    Production,
}

/// 物料與任務之間的有向弧
///
/// `rho` 為帶號轉換比例：消耗為負、產出為正。產出弧的 `delay`
/// 表示物料在任務開始後幾期才出現。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialArc {
    pub material_id: String,
    pub task_id: String,
    pub rho: Decimal,
    #[serde(default)]
    pub delay: u32,
}

impl MaterialArc {
    /// 創建消耗弧（比例取負值）
    pub fn consumes(material_id: impl Into<String>, task_id: impl Into<String>, ratio: Decimal) -> Self {
        Self {
            material_id: material_id.into(),
            task_id: task_id.into(),
            rho: -ratio.abs(),
            delay: 0,
        }
    }

    /// 創建產出弧（比例取正值）
    pub fn produces(task_id: impl Into<String>, material_id: impl Into<String>, ratio: Decimal) -> Self {
        Self {
            material_id: material_id.into(),
            task_id: task_id.into(),
            rho: ratio.abs(),
            delay: 0,
        }
    }

    /// 建構器模式：設置產出延遲
    pub fn with_delay(mut self, delay: u32) -> Self {
        self.delay = delay;
        self
    }

    pub fn direction(&self) -> ArcDirection {
        if self.rho.is_sign_negative() {
            ArcDirection::Consumption
        } else {
            ArcDirection::Production
        }
    }

    /// 轉換比例的絕對值
    pub fn ratio(&self) -> Decimal {
        self.rho.abs()
    }
}
