//! 製造：物料清單（BOM）與製造工單

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::totals::{COMPONENT_QTY_DP, MONEY_DP};

/// BOM 類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BomType {
    /// 實際生產此產品
    Normal,
    /// 套裝／組合包
    Kit,
}

/// 工單優先級
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    NotUrgent,
    Normal,
    Urgent,
    VeryUrgent,
}

/// 製造工單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoState {
    Draft,
    Confirmed,
    InProgress,
    Done,
    Cancelled,
}

/// BOM 元件明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomLine {
    pub id: Uuid,

    /// 元件產品
    pub product_id: Uuid,

    /// 每單位產出所需數量（4 位小數）
    pub quantity: Decimal,

    /// 元件單位成本（建立明細時自產品標準成本帶入）
    pub unit_cost: Decimal,

    pub notes: Option<String>,
}

impl BomLine {
    /// 創建元件明細，成本快照自產品標準成本
    pub fn new(product: &crate::Product, quantity: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id: product.id,
            quantity: quantity.round_dp(COMPONENT_QTY_DP),
            unit_cost: product.standard_price,
            notes: None,
        }
    }

    /// 此元件的成本
    pub fn cost(&self) -> Decimal {
        (self.quantity * self.unit_cost).round_dp(MONEY_DP)
    }
}

/// 物料清單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillOfMaterials {
    pub id: Uuid,

    /// 產出產品
    pub product_id: Uuid,

    /// 編號（格式 BOM-<產品編號或名稱前綴>）
    pub reference: String,

    /// 此 BOM 產出的數量
    pub quantity: Decimal,

    pub bom_type: BomType,

    /// 生產時間（分鐘）
    pub ready_time_minutes: u32,

    pub is_active: bool,

    pub notes: Option<String>,

    pub lines: Vec<BomLine>,
}

impl BillOfMaterials {
    /// 創建新 BOM（編號取產品內部編號，無則取名稱前 20 字）
    pub fn new(product: &crate::Product) -> Self {
        let suffix = product
            .internal_reference
            .clone()
            .unwrap_or_else(|| product.name.chars().take(20).collect());

        Self {
            id: Uuid::new_v4(),
            product_id: product.id,
            reference: format!("BOM-{suffix}"),
            quantity: Decimal::ONE,
            bom_type: BomType::Normal,
            ready_time_minutes: 0,
            is_active: true,
            notes: None,
            lines: Vec::new(),
        }
    }

    /// 建構器模式：設置產出數量
    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    /// 建構器模式：設置生產時間
    pub fn with_ready_time(mut self, minutes: u32) -> Self {
        self.ready_time_minutes = minutes;
        self
    }

    pub fn push_line(&mut self, line: BomLine) {
        self.lines.push(line);
    }

    /// 元件總成本
    pub fn total_cost(&self) -> Decimal {
        self.lines.iter().map(|l| l.cost()).sum()
    }

    pub fn component_count(&self) -> usize {
        self.lines.len()
    }
}

/// 工單元件消耗明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManufacturingOrderLine {
    pub id: Uuid,

    pub product_id: Uuid,

    /// 依 BOM 計算的需求數量（4 位小數）
    pub quantity_required: Decimal,

    /// 實際消耗數量（4 位小數）
    pub quantity_consumed: Decimal,
}

impl ManufacturingOrderLine {
    pub fn new(product_id: Uuid, quantity_required: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            quantity_required: quantity_required.round_dp(COMPONENT_QTY_DP),
            quantity_consumed: Decimal::ZERO,
        }
    }

    pub fn is_fully_consumed(&self) -> bool {
        self.quantity_consumed >= self.quantity_required
    }

    /// 未消耗數量
    pub fn remaining_qty(&self) -> Decimal {
        self.quantity_required - self.quantity_consumed
    }
}

/// 製造工單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManufacturingOrder {
    pub id: Uuid,

    /// 單號（格式 MO-#####）
    pub reference: String,

    /// 產出產品
    pub product_id: Uuid,

    pub bom_id: Option<Uuid>,

    /// 預計產出數量
    pub quantity: Decimal,

    /// 已產出數量
    pub quantity_produced: Decimal,

    /// 產出入帳單位成本（BOM 總成本，無 BOM 則為產品標準成本）
    pub unit_cost: Decimal,

    /// 元件消耗來源儲位
    pub source_location: Uuid,

    /// 成品入庫儲位
    pub destination_location: Uuid,

    pub state: MoState,

    pub scheduled_date: Option<DateTime<Utc>>,
    pub date_started: Option<DateTime<Utc>>,
    pub date_finished: Option<DateTime<Utc>>,

    /// 來源文件（如 SO-00001）
    pub origin: Option<String>,

    pub priority: Priority,

    pub notes: Option<String>,

    pub lines: Vec<ManufacturingOrderLine>,
}

impl ManufacturingOrder {
    /// 創建新工單
    pub fn new(
        reference: impl Into<String>,
        product_id: Uuid,
        quantity: Decimal,
        source_location: Uuid,
        destination_location: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: reference.into(),
            product_id,
            bom_id: None,
            quantity,
            quantity_produced: Decimal::ZERO,
            unit_cost: Decimal::ZERO,
            source_location,
            destination_location,
            state: MoState::Draft,
            scheduled_date: None,
            date_started: None,
            date_finished: None,
            origin: None,
            priority: Priority::Normal,
            notes: None,
            lines: Vec::new(),
        }
    }

    /// 建構器模式：設置來源文件
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// 未產出數量
    pub fn remaining_qty(&self) -> Decimal {
        self.quantity - self.quantity_produced
    }

    /// 生產進度百分比
    pub fn progress_percentage(&self) -> Decimal {
        if self.quantity.is_zero() {
            return Decimal::ZERO;
        }
        (self.quantity_produced / self.quantity) * Decimal::ONE_HUNDRED
    }
}
