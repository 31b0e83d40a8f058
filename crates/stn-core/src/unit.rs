//! 設備模型

use serde::{Deserialize, Serialize};

/// 設備（可執行多個任務，但同一時間只執行一個）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// 設備ID
    pub id: String,

    /// 設備名稱
    #[serde(default)]
    pub name: Option<String>,
}

impl Unit {
    /// 創建新的設備
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    /// 建構器模式：設置名稱
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
