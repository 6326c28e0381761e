//! 採購文件：詢價單與採購訂單

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::totals::TotalsCalculator;

/// 詢價單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RfqState {
    Draft,
    Sent,
    /// 已收到供應商報價
    Received,
    /// 已轉為採購訂單
    Done,
    Cancelled,
}

/// 採購訂單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoState {
    Draft,
    Confirmed,
    Sent,
    PartiallyReceived,
    Received,
    Billed,
    Done,
    Cancelled,
}

/// 詢價單明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfqLine {
    pub id: Uuid,

    pub product_id: Uuid,

    pub description: String,

    pub quantity: Decimal,

    /// 單價（收到供應商報價後填入）
    pub unit_price: Decimal,

    pub subtotal: Decimal,
}

impl RfqLine {
    pub fn new(product: &crate::Product, quantity: Decimal) -> Self {
        let mut line = Self {
            id: Uuid::new_v4(),
            product_id: product.id,
            description: product.name.clone(),
            quantity,
            unit_price: Decimal::ZERO,
            subtotal: Decimal::ZERO,
        };
        line.recompute_subtotal();
        line
    }

    /// 建構器模式：設置單價
    pub fn with_unit_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = unit_price;
        self.recompute_subtotal();
        self
    }

    pub fn recompute_subtotal(&mut self) {
        self.subtotal =
            TotalsCalculator::line_subtotal(self.quantity, self.unit_price, Decimal::ZERO);
    }
}

/// 詢價單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rfq {
    pub id: Uuid,

    /// 單號（格式 RFQ-#####）
    pub reference: String,

    pub vendor_id: Uuid,

    pub date: NaiveDate,

    /// 供應商回覆期限
    pub deadline: Option<NaiveDate>,

    pub state: RfqState,

    pub untaxed_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,

    pub notes: Option<String>,

    /// 轉單後回連的採購訂單
    pub purchase_order_id: Option<Uuid>,

    pub lines: Vec<RfqLine>,
}

impl Rfq {
    /// 創建新詢價單
    pub fn new(reference: impl Into<String>, vendor_id: Uuid, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: reference.into(),
            vendor_id,
            date,
            deadline: None,
            state: RfqState::Draft,
            untaxed_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            notes: None,
            purchase_order_id: None,
            lines: Vec::new(),
        }
    }

    /// 建構器模式：設置回覆期限
    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn push_line(&mut self, line: RfqLine) {
        self.lines.push(line);
        self.compute_totals();
    }

    pub fn remove_line(&mut self, line_id: Uuid) {
        self.lines.retain(|l| l.id != line_id);
        self.compute_totals();
    }

    /// 由明細重算表頭金額（詢價單無表頭折扣）
    pub fn compute_totals(&mut self) {
        let subtotals: Vec<Decimal> = self.lines.iter().map(|l| l.subtotal).collect();
        let totals = TotalsCalculator::compute(&subtotals, Decimal::ZERO);
        self.untaxed_amount = totals.untaxed_amount;
        self.tax_amount = totals.tax_amount;
        self.total_amount = totals.total_amount;
    }
}

/// 採購訂單明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub id: Uuid,

    pub product_id: Uuid,

    pub description: String,

    pub quantity: Decimal,

    pub quantity_received: Decimal,

    pub quantity_billed: Decimal,

    pub unit_price: Decimal,

    pub subtotal: Decimal,
}

impl PurchaseOrderLine {
    pub fn new(
        product_id: Uuid,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            description: description.into(),
            quantity,
            quantity_received: Decimal::ZERO,
            quantity_billed: Decimal::ZERO,
            unit_price,
            subtotal: TotalsCalculator::line_subtotal(quantity, unit_price, Decimal::ZERO),
        }
    }

    pub fn is_fully_received(&self) -> bool {
        self.quantity_received >= self.quantity
    }

    /// 未收貨數量
    pub fn remaining_qty(&self) -> Decimal {
        self.quantity - self.quantity_received
    }
}

/// 採購訂單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,

    /// 單號（格式 PO-#####）
    pub reference: String,

    pub vendor_id: Uuid,

    pub date: NaiveDate,

    pub expected_date: Option<NaiveDate>,

    pub state: PoState,

    /// 收貨儲位
    pub delivery_location: Option<Uuid>,

    pub untaxed_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,

    /// 供應商帳單資訊
    pub bill_reference: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub bill_amount: Option<Decimal>,

    /// 付款資訊
    pub payment_date: Option<NaiveDate>,
    pub payment_reference: Option<String>,

    /// 收貨揀貨單
    pub picking_id: Option<Uuid>,

    pub notes: Option<String>,

    pub lines: Vec<PurchaseOrderLine>,
}

impl PurchaseOrder {
    /// 創建新採購訂單
    pub fn new(reference: impl Into<String>, vendor_id: Uuid, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: reference.into(),
            vendor_id,
            date,
            expected_date: None,
            state: PoState::Draft,
            delivery_location: None,
            untaxed_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            bill_reference: None,
            bill_date: None,
            bill_amount: None,
            payment_date: None,
            payment_reference: None,
            picking_id: None,
            notes: None,
            lines: Vec::new(),
        }
    }

    /// 建構器模式：設置收貨儲位
    pub fn with_delivery_location(mut self, location_id: Uuid) -> Self {
        self.delivery_location = Some(location_id);
        self
    }

    /// 建構器模式：設置預計到貨日
    pub fn with_expected_date(mut self, expected_date: NaiveDate) -> Self {
        self.expected_date = Some(expected_date);
        self
    }

    pub fn push_line(&mut self, line: PurchaseOrderLine) {
        self.lines.push(line);
        self.compute_totals();
    }

    pub fn remove_line(&mut self, line_id: Uuid) {
        self.lines.retain(|l| l.id != line_id);
        self.compute_totals();
    }

    /// 由明細重算表頭金額（採購訂單無表頭折扣）
    pub fn compute_totals(&mut self) {
        let subtotals: Vec<Decimal> = self.lines.iter().map(|l| l.subtotal).collect();
        let totals = TotalsCalculator::compute(&subtotals, Decimal::ZERO);
        self.untaxed_amount = totals.untaxed_amount;
        self.tax_amount = totals.tax_amount;
        self.total_amount = totals.total_amount;
    }

    /// 是否所有明細皆已收貨完畢
    pub fn is_fully_received(&self) -> bool {
        !self.lines.is_empty() && self.lines.iter().all(|l| l.is_fully_received())
    }
}
