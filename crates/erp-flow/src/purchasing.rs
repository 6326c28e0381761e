//! 採購流程：詢價單 → 採購訂單 → 收貨 → 對帳 → 付款
//!
//! 收貨逐筆過帳入庫，帶入採購單價更新移動平均成本；
//! 收齊前訂單停在部分收貨狀態。

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use erp_core::{
    ErpError, PickingState, PickingType, PoState, PurchaseOrder, PurchaseOrderLine, Result, Rfq,
    RfqState, StockMove, StockPicking, StockPickingLine,
};
use erp_stock::{MoveProcessor, SequenceRegistry, StockLedger};

/// 供應商帳單資訊
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VendorBill {
    pub reference: String,
    pub date: NaiveDate,
    /// 帳單金額（缺省取訂單總額）
    pub amount: Option<Decimal>,
}

/// 採購服務
#[derive(Debug, Default)]
pub struct PurchasingService {
    processor: MoveProcessor,
}

impl PurchasingService {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // 詢價單
    // ------------------------------------------------------------------

    /// 創建新詢價單並取號
    pub fn create_rfq(
        &self,
        vendor_id: Uuid,
        date: NaiveDate,
        sequences: &mut SequenceRegistry,
    ) -> Rfq {
        Rfq::new(sequences.next_rfq(), vendor_id, date)
    }

    /// 送出詢價單（草稿 → 已送出）
    pub fn send_rfq(&self, rfq: &mut Rfq) -> Result<()> {
        if rfq.state != RfqState::Draft {
            return Err(ErpError::InvalidTransition(format!(
                "詢價單 {} 非草稿，無法送出",
                rfq.reference
            )));
        }
        if rfq.lines.is_empty() {
            return Err(ErpError::MissingField(format!(
                "詢價單 {} 沒有明細",
                rfq.reference
            )));
        }
        rfq.state = RfqState::Sent;
        Ok(())
    }

    /// 登錄供應商報價（填入各明細單價）
    pub fn record_vendor_quote(
        &self,
        rfq: &mut Rfq,
        prices: &HashMap<Uuid, Decimal>,
    ) -> Result<()> {
        if rfq.state != RfqState::Sent {
            return Err(ErpError::InvalidTransition(format!(
                "詢價單 {} 未送出，無法登錄報價",
                rfq.reference
            )));
        }

        for line in &mut rfq.lines {
            if let Some(price) = prices.get(&line.id) {
                if *price < Decimal::ZERO {
                    return Err(ErpError::InvalidQuantity(format!(
                        "報價不可為負數：{price}"
                    )));
                }
                line.unit_price = *price;
                line.recompute_subtotal();
            }
        }
        rfq.compute_totals();
        rfq.state = RfqState::Received;
        Ok(())
    }

    /// 取消詢價單（已轉單者不可取消）
    pub fn cancel_rfq(&self, rfq: &mut Rfq) -> Result<()> {
        if rfq.state == RfqState::Done {
            return Err(ErpError::AlreadyConverted(rfq.reference.clone()));
        }
        rfq.state = RfqState::Cancelled;
        Ok(())
    }

    /// 詢價單轉採購訂單（一張詢價單只能轉一次）
    pub fn convert_rfq_to_po(
        &self,
        rfq: &mut Rfq,
        date: NaiveDate,
        sequences: &mut SequenceRegistry,
    ) -> Result<PurchaseOrder> {
        if rfq.purchase_order_id.is_some() {
            return Err(ErpError::AlreadyConverted(rfq.reference.clone()));
        }
        if rfq.state != RfqState::Received {
            return Err(ErpError::InvalidTransition(format!(
                "詢價單 {} 尚未收到報價，無法轉單",
                rfq.reference
            )));
        }

        let mut order = PurchaseOrder::new(sequences.next_purchase_order(), rfq.vendor_id, date);
        for line in &rfq.lines {
            order.lines.push(PurchaseOrderLine::new(
                line.product_id,
                line.description.clone(),
                line.quantity,
                line.unit_price,
            ));
        }
        order.compute_totals();

        rfq.state = RfqState::Done;
        rfq.purchase_order_id = Some(order.id);

        tracing::info!("詢價單 {} 轉為採購訂單 {}", rfq.reference, order.reference);
        Ok(order)
    }

    // ------------------------------------------------------------------
    // 採購訂單
    // ------------------------------------------------------------------

    /// 確認採購訂單（草稿 → 已確認）
    pub fn confirm_po(&self, order: &mut PurchaseOrder) -> Result<()> {
        if order.state != PoState::Draft {
            return Err(ErpError::InvalidTransition(format!(
                "採購訂單 {} 非草稿，無法確認",
                order.reference
            )));
        }
        if order.lines.is_empty() {
            return Err(ErpError::MissingField(format!(
                "採購訂單 {} 沒有明細",
                order.reference
            )));
        }
        order.state = PoState::Confirmed;
        Ok(())
    }

    /// 送出採購訂單給供應商（已確認 → 已送出）
    pub fn send_po(&self, order: &mut PurchaseOrder) -> Result<()> {
        if order.state != PoState::Confirmed {
            return Err(ErpError::InvalidTransition(format!(
                "採購訂單 {} 未確認，無法送出",
                order.reference
            )));
        }
        order.state = PoState::Sent;
        Ok(())
    }

    /// 產生收貨揀貨單
    pub fn create_receipt(
        &self,
        order: &mut PurchaseOrder,
        supplier_location: Uuid,
        sequences: &mut SequenceRegistry,
    ) -> Result<StockPicking> {
        if !matches!(order.state, PoState::Confirmed | PoState::Sent) {
            return Err(ErpError::InvalidTransition(format!(
                "採購訂單 {} 狀態不允許收貨",
                order.reference
            )));
        }
        let destination = order.delivery_location.ok_or_else(|| {
            ErpError::MissingField(format!("採購訂單 {} 未指定收貨儲位", order.reference))
        })?;

        let mut picking = StockPicking::new(
            sequences.next_picking(PickingType::Incoming),
            PickingType::Incoming,
        )
        .with_locations(supplier_location, destination)
        .with_origin(order.reference.clone());

        for line in &order.lines {
            picking.push_line(StockPickingLine::new(line.product_id, line.quantity));
        }
        picking.state = PickingState::Ready;

        order.picking_id = Some(picking.id);
        Ok(picking)
    }

    /// 收貨入庫
    ///
    /// `quantities` 指定各明細的收貨量（明細 ID → 數量，可部分收貨）。
    /// 全數收齊後訂單轉為已收貨，否則維持部分收貨。
    pub fn receive_products(
        &self,
        order: &mut PurchaseOrder,
        quantities: &HashMap<Uuid, Decimal>,
        supplier_location: Uuid,
        ledger: &mut StockLedger,
        sequences: &mut SequenceRegistry,
    ) -> Result<Vec<StockMove>> {
        if !matches!(
            order.state,
            PoState::Confirmed | PoState::Sent | PoState::PartiallyReceived
        ) {
            return Err(ErpError::InvalidTransition(format!(
                "採購訂單 {} 狀態不允許收貨",
                order.reference
            )));
        }
        let destination = order.delivery_location.ok_or_else(|| {
            ErpError::MissingField(format!("採購訂單 {} 未指定收貨儲位", order.reference))
        })?;

        // 檢查先於過帳：任一明細超收即整批拒絕
        let mut plan: Vec<(usize, Decimal)> = Vec::new();
        for (index, line) in order.lines.iter().enumerate() {
            let Some(quantity) = quantities.get(&line.id).copied() else {
                continue;
            };
            if quantity.is_zero() {
                continue;
            }
            if quantity < Decimal::ZERO || quantity > line.remaining_qty() {
                return Err(ErpError::InvalidQuantity(format!(
                    "明細 {} 收貨量 {} 超過未收貨量 {}",
                    line.description,
                    quantity,
                    line.remaining_qty()
                )));
            }
            plan.push((index, quantity));
        }
        if plan.is_empty() {
            return Err(ErpError::InvalidQuantity(format!(
                "採購訂單 {} 沒有可收貨的數量",
                order.reference
            )));
        }

        let mut moves = Vec::with_capacity(plan.len());
        for (index, quantity) in plan {
            let line = &mut order.lines[index];
            let mut stock_move = StockMove::new(
                sequences.next_stock_move(),
                line.product_id,
                supplier_location,
                destination,
                quantity,
            )
            .with_unit_price(line.unit_price)
            .with_origin(order.reference.clone());

            self.processor.post(&mut stock_move, ledger)?;
            line.quantity_received += quantity;
            moves.push(stock_move);
        }

        order.state = if order.is_fully_received() {
            PoState::Received
        } else {
            PoState::PartiallyReceived
        };

        tracing::info!(
            "採購訂單 {} 收貨 {} 筆異動，狀態 {:?}",
            order.reference,
            moves.len(),
            order.state
        );
        Ok(moves)
    }

    /// 登錄供應商帳單（已收貨 → 已對帳）
    pub fn mark_billed(&self, order: &mut PurchaseOrder, bill: VendorBill) -> Result<()> {
        if order.state != PoState::Received {
            return Err(ErpError::InvalidTransition(format!(
                "採購訂單 {} 未收貨完畢，無法對帳",
                order.reference
            )));
        }

        order.bill_reference = Some(bill.reference);
        order.bill_date = Some(bill.date);
        order.bill_amount = Some(bill.amount.unwrap_or(order.total_amount));
        for line in &mut order.lines {
            line.quantity_billed = line.quantity_received;
        }
        order.state = PoState::Billed;
        Ok(())
    }

    /// 登錄付款（已對帳 → 完成）
    pub fn record_payment(
        &self,
        order: &mut PurchaseOrder,
        date: NaiveDate,
        reference: Option<String>,
    ) -> Result<()> {
        if order.state != PoState::Billed {
            return Err(ErpError::InvalidTransition(format!(
                "採購訂單 {} 未對帳，無法付款",
                order.reference
            )));
        }
        order.payment_date = Some(date);
        order.payment_reference = reference;
        order.state = PoState::Done;
        Ok(())
    }

    /// 取消採購訂單（已有收貨者不可取消）
    pub fn cancel_po(&self, order: &mut PurchaseOrder) -> Result<()> {
        if matches!(
            order.state,
            PoState::Received | PoState::Billed | PoState::Done
        ) {
            return Err(ErpError::InvalidTransition(format!(
                "採購訂單 {} 已收貨，無法取消",
                order.reference
            )));
        }
        if order
            .lines
            .iter()
            .any(|l| l.quantity_received > Decimal::ZERO)
        {
            return Err(ErpError::InvalidTransition(format!(
                "採購訂單 {} 已有部分收貨，無法取消",
                order.reference
            )));
        }
        order.state = PoState::Cancelled;
        Ok(())
    }
}
