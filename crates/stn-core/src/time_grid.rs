//! 離散時間網格

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// 離散時間網格，時間點為 `0..=horizon`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeGrid {
    /// 計劃時界 H
    pub horizon: u32,

    /// 每期長度（分鐘）
    #[serde(default = "default_period_minutes")]
    pub period_minutes: u32,

    /// 第 0 期對應的時刻
    #[serde(default)]
    pub anchor: Option<NaiveDateTime>,
}

fn default_period_minutes() -> u32 {
    60
}

impl TimeGrid {
    /// 創建新的時間網格
    pub fn new(horizon: u32) -> Self {
        Self {
            horizon,
            period_minutes: default_period_minutes(),
            anchor: None,
        }
    }

    /// 建構器模式：設置時間錨點與每期長度
    pub fn with_anchor(mut self, anchor: NaiveDateTime, period_minutes: u32) -> Self {
        self.anchor = Some(anchor);
        self.period_minutes = period_minutes;
        self
    }

    /// 時間點數量 `H + 1`
    pub fn point_count(&self) -> u32 {
        self.horizon + 1
    }

    pub fn contains(&self, period: u32) -> bool {
        period <= self.horizon
    }

    /// 從 `est` 起可用的時間點數量 `H + 1 - est`（可能為負）
    pub fn available_from(&self, est: u32) -> i64 {
        i64::from(self.horizon) + 1 - i64::from(est)
    }

    /// 期別對應的開始時刻（需要設置錨點）
    pub fn period_start(&self, period: u32) -> Option<NaiveDateTime> {
        let offset = Duration::minutes(i64::from(period) * i64::from(self.period_minutes));
        self.anchor.map(|anchor| anchor + offset)
    }
}
