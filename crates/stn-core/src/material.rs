//! 物料（狀態）模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 物料角色（三者互斥）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialRole {
    /// 原料
    Raw,
    /// 中間品
    Intermediate,
    /// 成品
    Final,
}

/// 物料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// 物料ID
    pub id: String,

    /// 物料角色
    pub role: MaterialRole,

    /// 儲存容量（None 表示不限）
    #[serde(default)]
    pub capacity: Option<Decimal>,

    /// 初始庫存
    #[serde(default)]
    pub initial_inventory: Decimal,

    /// 單價
    #[serde(default)]
    pub price: Decimal,

    /// 拓撲順序等級（僅中間品使用，用於固定探索順序）
    #[serde(default)]
    pub order: Option<u32>,
}

impl Material {
    /// 創建新的物料
    pub fn new(id: impl Into<String>, role: MaterialRole) -> Self {
        Self {
            id: id.into(),
            role,
            capacity: None,
            initial_inventory: Decimal::ZERO,
            price: Decimal::ZERO,
            order: None,
        }
    }

    /// 創建原料
    pub fn raw(id: impl Into<String>) -> Self {
        Self::new(id, MaterialRole::Raw)
    }

    /// 創建中間品
    pub fn intermediate(id: impl Into<String>) -> Self {
        Self::new(id, MaterialRole::Intermediate)
    }

    /// 創建成品
    pub fn product(id: impl Into<String>) -> Self {
        Self::new(id, MaterialRole::Final)
    }

    /// 建構器模式：設置儲存容量
    pub fn with_capacity(mut self, capacity: Decimal) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// 建構器模式：設置初始庫存
    pub fn with_initial_inventory(mut self, qty: Decimal) -> Self {
        self.initial_inventory = qty;
        self
    }

    /// 建構器模式：設置單價
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = price;
        self
    }

    /// 建構器模式：設置拓撲順序等級
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn is_raw(&self) -> bool {
        self.role == MaterialRole::Raw
    }

    pub fn is_intermediate(&self) -> bool {
        self.role == MaterialRole::Intermediate
    }

    pub fn is_final(&self) -> bool {
        self.role == MaterialRole::Final
    }

    /// 是否有正的初始庫存
    pub fn has_initial_stock(&self) -> bool {
        self.initial_inventory > Decimal::ZERO
    }
}
