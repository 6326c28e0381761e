//! 銷售文件：報價單、銷售訂單、銷售發票
//!
//! 表頭金額永遠是明細的純摺疊結果，於每次明細異動後重算。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::totals::TotalsCalculator;

/// 報價單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotationState {
    Draft,
    Sent,
    /// 已轉為銷售訂單
    Confirmed,
    Cancelled,
    Expired,
}

/// 銷售訂單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoState {
    Draft,
    Confirmed,
    Processing,
    Ready,
    Delivered,
    Done,
    Cancelled,
}

/// 發票狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceState {
    Draft,
    Sent,
    Paid,
    /// 部分付款
    Partial,
    Overdue,
    Cancelled,
}

/// 付款方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    CreditCard,
    DebitCard,
    EWallet,
    Qris,
}

/// 報價單明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesQuotationLine {
    pub id: Uuid,

    pub product_id: Uuid,

    pub description: String,

    pub quantity: Decimal,

    pub unit_price: Decimal,

    /// 折扣百分比
    pub discount_percent: Decimal,

    /// 小計（數量 × 單價 × (1 − 折扣%)）
    pub subtotal: Decimal,
}

impl SalesQuotationLine {
    /// 創建明細（單價預設取產品售價）
    pub fn new(product: &crate::Product, quantity: Decimal) -> Self {
        let mut line = Self {
            id: Uuid::new_v4(),
            product_id: product.id,
            description: product.name.clone(),
            quantity,
            unit_price: product.list_price,
            discount_percent: Decimal::ZERO,
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

    /// 建構器模式：設置折扣
    pub fn with_discount_percent(mut self, discount_percent: Decimal) -> Self {
        self.discount_percent = discount_percent;
        self.recompute_subtotal();
        self
    }

    pub fn recompute_subtotal(&mut self) {
        self.subtotal =
            TotalsCalculator::line_subtotal(self.quantity, self.unit_price, self.discount_percent);
    }
}

/// 報價單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesQuotation {
    pub id: Uuid,

    /// 單號（格式 SQ-#####）
    pub reference: String,

    pub customer_id: Uuid,

    pub date: NaiveDate,

    /// 報價有效期限
    pub validity_date: Option<NaiveDate>,

    pub state: QuotationState,

    pub untaxed_amount: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,

    pub notes: Option<String>,

    /// 轉單後回連的銷售訂單
    pub sales_order_id: Option<Uuid>,

    pub lines: Vec<SalesQuotationLine>,
}

impl SalesQuotation {
    /// 創建新報價單
    pub fn new(reference: impl Into<String>, customer_id: Uuid, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: reference.into(),
            customer_id,
            date,
            validity_date: None,
            state: QuotationState::Draft,
            untaxed_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            notes: None,
            sales_order_id: None,
            lines: Vec::new(),
        }
    }

    /// 建構器模式：設置有效期限
    pub fn with_validity_date(mut self, validity_date: NaiveDate) -> Self {
        self.validity_date = Some(validity_date);
        self
    }

    /// 加入明細並重算金額
    pub fn push_line(&mut self, line: SalesQuotationLine) {
        self.lines.push(line);
        self.compute_totals();
    }

    /// 移除明細並重算金額
    pub fn remove_line(&mut self, line_id: Uuid) {
        self.lines.retain(|l| l.id != line_id);
        self.compute_totals();
    }

    /// 由明細重算表頭金額
    pub fn compute_totals(&mut self) {
        let subtotals: Vec<Decimal> = self.lines.iter().map(|l| l.subtotal).collect();
        let totals = TotalsCalculator::compute(&subtotals, self.discount_amount);
        self.untaxed_amount = totals.untaxed_amount;
        self.tax_amount = totals.tax_amount;
        self.total_amount = totals.total_amount;
    }

    /// 是否已過有效期限
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        match self.validity_date {
            Some(validity) => self.state == QuotationState::Sent && today > validity,
            None => false,
        }
    }
}

/// 銷售訂單明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrderLine {
    pub id: Uuid,

    pub product_id: Uuid,

    pub description: String,

    pub quantity: Decimal,

    /// 本明細目前持有的保留量（確認時寫入，出貨／取消時釋放）
    pub quantity_reserved: Decimal,

    pub quantity_delivered: Decimal,

    pub quantity_invoiced: Decimal,

    pub unit_price: Decimal,

    pub discount_percent: Decimal,

    pub subtotal: Decimal,
}

impl SalesOrderLine {
    pub fn new(product: &crate::Product, quantity: Decimal) -> Self {
        let mut line = Self {
            id: Uuid::new_v4(),
            product_id: product.id,
            description: product.name.clone(),
            quantity,
            quantity_reserved: Decimal::ZERO,
            quantity_delivered: Decimal::ZERO,
            quantity_invoiced: Decimal::ZERO,
            unit_price: product.list_price,
            discount_percent: Decimal::ZERO,
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

    /// 建構器模式：設置折扣
    pub fn with_discount_percent(mut self, discount_percent: Decimal) -> Self {
        self.discount_percent = discount_percent;
        self.recompute_subtotal();
        self
    }

    pub fn recompute_subtotal(&mut self) {
        self.subtotal =
            TotalsCalculator::line_subtotal(self.quantity, self.unit_price, self.discount_percent);
    }

    pub fn is_fully_delivered(&self) -> bool {
        self.quantity_delivered >= self.quantity
    }

    /// 未出貨數量
    pub fn remaining_qty(&self) -> Decimal {
        self.quantity - self.quantity_delivered
    }
}

/// 銷售訂單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: Uuid,

    /// 單號（格式 SO-#####）
    pub reference: String,

    pub customer_id: Uuid,

    /// 來源報價單
    pub quotation_id: Option<Uuid>,

    pub date: NaiveDate,

    pub expected_date: Option<NaiveDate>,

    pub state: SoState,

    /// 出貨來源儲位
    pub source_location: Option<Uuid>,

    pub untaxed_amount: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,

    pub notes: Option<String>,

    /// 出貨揀貨單
    pub picking_id: Option<Uuid>,

    pub lines: Vec<SalesOrderLine>,
}

impl SalesOrder {
    /// 創建新銷售訂單
    pub fn new(reference: impl Into<String>, customer_id: Uuid, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: reference.into(),
            customer_id,
            quotation_id: None,
            date,
            expected_date: None,
            state: SoState::Draft,
            source_location: None,
            untaxed_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            notes: None,
            picking_id: None,
            lines: Vec::new(),
        }
    }

    /// 建構器模式：設置出貨來源儲位
    pub fn with_source_location(mut self, location_id: Uuid) -> Self {
        self.source_location = Some(location_id);
        self
    }

    pub fn push_line(&mut self, line: SalesOrderLine) {
        self.lines.push(line);
        self.compute_totals();
    }

    pub fn remove_line(&mut self, line_id: Uuid) {
        self.lines.retain(|l| l.id != line_id);
        self.compute_totals();
    }

    /// 由明細重算表頭金額
    pub fn compute_totals(&mut self) {
        let subtotals: Vec<Decimal> = self.lines.iter().map(|l| l.subtotal).collect();
        let totals = TotalsCalculator::compute(&subtotals, self.discount_amount);
        self.untaxed_amount = totals.untaxed_amount;
        self.tax_amount = totals.tax_amount;
        self.total_amount = totals.total_amount;
    }

    /// 是否所有明細皆已出貨完畢
    pub fn is_fully_delivered(&self) -> bool {
        !self.lines.is_empty() && self.lines.iter().all(|l| l.is_fully_delivered())
    }
}

/// 發票明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesInvoiceLine {
    pub id: Uuid,

    pub product_id: Uuid,

    pub description: String,

    pub quantity: Decimal,

    pub unit_price: Decimal,

    pub discount_percent: Decimal,

    pub subtotal: Decimal,
}

impl SalesInvoiceLine {
    pub fn new(
        product_id: Uuid,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
        discount_percent: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            description: description.into(),
            quantity,
            unit_price,
            discount_percent,
            subtotal: TotalsCalculator::line_subtotal(quantity, unit_price, discount_percent),
        }
    }
}

/// 銷售發票
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesInvoice {
    pub id: Uuid,

    /// 單號（格式 INV-#####）
    pub reference: String,

    pub customer_id: Uuid,

    /// 來源銷售訂單
    pub sales_order_id: Option<Uuid>,

    pub date: NaiveDate,

    pub due_date: Option<NaiveDate>,

    pub payment_date: Option<NaiveDate>,

    pub state: InvoiceState,

    pub payment_method: Option<PaymentMethod>,

    pub payment_reference: Option<String>,

    pub untaxed_amount: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,

    pub amount_paid: Decimal,

    /// 未付金額（每次存檔重算：total − paid，下限 0）
    pub amount_due: Decimal,

    pub notes: Option<String>,

    pub lines: Vec<SalesInvoiceLine>,
}

impl SalesInvoice {
    /// 創建新發票
    pub fn new(reference: impl Into<String>, customer_id: Uuid, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: reference.into(),
            customer_id,
            sales_order_id: None,
            date,
            due_date: None,
            payment_date: None,
            state: InvoiceState::Draft,
            payment_method: None,
            payment_reference: None,
            untaxed_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            amount_paid: Decimal::ZERO,
            amount_due: Decimal::ZERO,
            notes: None,
            lines: Vec::new(),
        }
    }

    pub fn push_line(&mut self, line: SalesInvoiceLine) {
        self.lines.push(line);
        self.compute_totals();
    }

    pub fn remove_line(&mut self, line_id: Uuid) {
        self.lines.retain(|l| l.id != line_id);
        self.compute_totals();
    }

    /// 由明細重算表頭金額與未付金額
    pub fn compute_totals(&mut self) {
        let subtotals: Vec<Decimal> = self.lines.iter().map(|l| l.subtotal).collect();
        let totals = TotalsCalculator::compute(&subtotals, self.discount_amount);
        self.untaxed_amount = totals.untaxed_amount;
        self.tax_amount = totals.tax_amount;
        self.total_amount = totals.total_amount;
        self.recompute_amount_due();
    }

    pub fn recompute_amount_due(&mut self) {
        self.amount_due = (self.total_amount - self.amount_paid).max(Decimal::ZERO);
    }

    pub fn is_fully_paid(&self) -> bool {
        self.amount_paid >= self.total_amount
    }

    /// 是否逾期未付
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.due_date {
            Some(due) => {
                !matches!(self.state, InvoiceState::Paid | InvoiceState::Cancelled) && today > due
            }
            None => false,
        }
    }
}
