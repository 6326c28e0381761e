//! 庫存批次（quant）
//!
//! 一筆 quant 追蹤單一產品在單一儲位的帳面數量；同一 (產品, 儲位)
//! 可能拆成多筆批次（不同成本或不同入庫時間）。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 庫存批次
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockQuant {
    pub id: Uuid,

    pub product_id: Uuid,

    pub location_id: Uuid,

    /// 帳面數量
    pub quantity: Decimal,

    /// 已保留數量（不變量：0 ≤ reserved_quantity ≤ quantity）
    pub reserved_quantity: Decimal,

    /// 單位成本（移動平均）
    pub unit_cost: Decimal,

    /// 入庫時間（FIFO 保留的主要排序鍵）
    pub incoming_date: DateTime<Utc>,

    /// 帳內插入序號（入庫時間相同時的次要排序鍵）
    pub seq: u64,
}

impl StockQuant {
    /// 創建新的庫存批次
    pub fn new(product_id: Uuid, location_id: Uuid, unit_cost: Decimal, seq: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            location_id,
            quantity: Decimal::ZERO,
            reserved_quantity: Decimal::ZERO,
            unit_cost,
            incoming_date: Utc::now(),
            seq,
        }
    }

    /// 建構器模式：設置數量
    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    /// 可用數量（帳面 − 已保留）
    pub fn available_quantity(&self) -> Decimal {
        self.quantity - self.reserved_quantity
    }

    /// 本批次的帳面價值
    pub fn total_value(&self) -> Decimal {
        (self.quantity * self.unit_cost).round_dp(crate::totals::MONEY_DP)
    }
}
