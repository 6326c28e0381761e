//! 銷售流程：報價單 → 銷售訂單 → 出貨 → 發票 → 收款
//!
//! 訂單確認時整單保留庫存；出貨時釋放保留並過帳實際異動。
//! 任何狀態檢查失敗都不留下部分效果。

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use erp_core::{
    ErpError, InvoiceState, PaymentMethod, PickingState, PickingType, QuotationState, Result,
    SalesInvoice, SalesInvoiceLine, SalesOrder, SalesOrderLine, SalesQuotation, SoState,
    StockMove, StockPicking, StockPickingLine,
};
use erp_stock::{MoveProcessor, SequenceRegistry, StockLedger};

/// 銷售服務
#[derive(Debug, Default)]
pub struct SalesService {
    processor: MoveProcessor,
}

impl SalesService {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // 報價單
    // ------------------------------------------------------------------

    /// 創建新報價單並取號
    pub fn create_quotation(
        &self,
        customer_id: Uuid,
        date: NaiveDate,
        sequences: &mut SequenceRegistry,
    ) -> SalesQuotation {
        SalesQuotation::new(sequences.next_quotation(), customer_id, date)
    }

    /// 送出報價單（草稿 → 已送出）
    pub fn send_quotation(&self, quotation: &mut SalesQuotation) -> Result<()> {
        if quotation.state != QuotationState::Draft {
            return Err(ErpError::InvalidTransition(format!(
                "報價單 {} 非草稿，無法送出",
                quotation.reference
            )));
        }
        if quotation.lines.is_empty() {
            return Err(ErpError::MissingField(format!(
                "報價單 {} 沒有明細",
                quotation.reference
            )));
        }
        quotation.state = QuotationState::Sent;
        Ok(())
    }

    /// 取消報價單（已轉單者不可取消）
    pub fn cancel_quotation(&self, quotation: &mut SalesQuotation) -> Result<()> {
        if quotation.state == QuotationState::Confirmed {
            return Err(ErpError::AlreadyConverted(quotation.reference.clone()));
        }
        quotation.state = QuotationState::Cancelled;
        Ok(())
    }

    /// 將逾期的已送出報價單標記為過期，回傳標記數
    pub fn expire_quotations(&self, quotations: &mut [SalesQuotation], today: NaiveDate) -> usize {
        let mut expired = 0;
        for quotation in quotations.iter_mut() {
            if quotation.is_expired(today) {
                quotation.state = QuotationState::Expired;
                expired += 1;
            }
        }
        if expired > 0 {
            tracing::info!("標記 {} 張報價單為過期", expired);
        }
        expired
    }

    /// 報價單轉銷售訂單（一張報價單只能轉一次）
    pub fn convert_quotation_to_order(
        &self,
        quotation: &mut SalesQuotation,
        date: NaiveDate,
        sequences: &mut SequenceRegistry,
    ) -> Result<SalesOrder> {
        if quotation.sales_order_id.is_some() {
            return Err(ErpError::AlreadyConverted(quotation.reference.clone()));
        }
        if !matches!(quotation.state, QuotationState::Draft | QuotationState::Sent) {
            return Err(ErpError::InvalidTransition(format!(
                "報價單 {} 狀態不允許轉單",
                quotation.reference
            )));
        }
        if quotation.lines.is_empty() {
            return Err(ErpError::MissingField(format!(
                "報價單 {} 沒有明細",
                quotation.reference
            )));
        }

        let mut order = SalesOrder::new(sequences.next_sales_order(), quotation.customer_id, date);
        order.quotation_id = Some(quotation.id);
        order.discount_amount = quotation.discount_amount;

        for line in &quotation.lines {
            let mut order_line = SalesOrderLine {
                id: Uuid::new_v4(),
                product_id: line.product_id,
                description: line.description.clone(),
                quantity: line.quantity,
                quantity_reserved: Decimal::ZERO,
                quantity_delivered: Decimal::ZERO,
                quantity_invoiced: Decimal::ZERO,
                unit_price: line.unit_price,
                discount_percent: line.discount_percent,
                subtotal: Decimal::ZERO,
            };
            order_line.recompute_subtotal();
            order.lines.push(order_line);
        }
        order.compute_totals();

        quotation.state = QuotationState::Confirmed;
        quotation.sales_order_id = Some(order.id);

        tracing::info!("報價單 {} 轉為訂單 {}", quotation.reference, order.reference);
        Ok(order)
    }

    // ------------------------------------------------------------------
    // 銷售訂單
    // ------------------------------------------------------------------

    /// 確認訂單並整單保留庫存
    ///
    /// 任一明細保留失敗即回滾已保留的明細，訂單維持草稿。
    pub fn confirm_order(&self, order: &mut SalesOrder, ledger: &mut StockLedger) -> Result<()> {
        if order.state != SoState::Draft {
            return Err(ErpError::InvalidTransition(format!(
                "訂單 {} 非草稿，無法確認",
                order.reference
            )));
        }
        if order.lines.is_empty() {
            return Err(ErpError::MissingField(format!(
                "訂單 {} 沒有明細",
                order.reference
            )));
        }
        let source = order.source_location.ok_or_else(|| {
            ErpError::MissingField(format!("訂單 {} 未指定出貨來源儲位", order.reference))
        })?;

        let mut reserved: Vec<(Uuid, Decimal)> = Vec::new();
        for line in &order.lines {
            match ledger.reserve(line.product_id, source, line.quantity) {
                Ok(()) => reserved.push((line.product_id, line.quantity)),
                Err(err) => {
                    for (product_id, quantity) in reserved {
                        let _ = ledger.unreserve(product_id, source, quantity);
                    }
                    return Err(err);
                }
            }
        }
        for line in &mut order.lines {
            line.quantity_reserved = line.quantity;
        }

        order.state = SoState::Confirmed;
        tracing::info!("確認訂單 {}，已保留 {} 條明細", order.reference, order.lines.len());
        Ok(())
    }

    /// 開始備貨：產生出貨揀貨單
    pub fn mark_processing(
        &self,
        order: &mut SalesOrder,
        customer_location: Uuid,
        sequences: &mut SequenceRegistry,
    ) -> Result<StockPicking> {
        if order.state != SoState::Confirmed {
            return Err(ErpError::InvalidTransition(format!(
                "訂單 {} 未確認，無法備貨",
                order.reference
            )));
        }
        let source = order.source_location.ok_or_else(|| {
            ErpError::MissingField(format!("訂單 {} 未指定出貨來源儲位", order.reference))
        })?;

        let mut picking = StockPicking::new(
            sequences.next_picking(PickingType::Outgoing),
            PickingType::Outgoing,
        )
        .with_locations(source, customer_location)
        .with_origin(order.reference.clone());

        for line in &order.lines {
            picking.push_line(StockPickingLine::new(line.product_id, line.quantity));
        }
        picking.state = PickingState::Ready;

        order.picking_id = Some(picking.id);
        order.state = SoState::Processing;
        Ok(picking)
    }

    /// 備貨完成，可出貨
    pub fn mark_ready(&self, order: &mut SalesOrder) -> Result<()> {
        if order.state != SoState::Processing {
            return Err(ErpError::InvalidTransition(format!(
                "訂單 {} 非備貨中，無法標記可出貨",
                order.reference
            )));
        }
        order.state = SoState::Ready;
        Ok(())
    }

    /// 出貨
    ///
    /// `quantities` 指定各明細的出貨量（缺省為全部未出貨量）。
    /// 先驗證每個產品的可用量加本單持有的保留量足夠，再釋放保留、
    /// 逐筆過帳；全部明細出貨完畢後訂單轉為已出貨。
    pub fn deliver_order(
        &self,
        order: &mut SalesOrder,
        quantities: Option<&HashMap<Uuid, Decimal>>,
        customer_location: Uuid,
        ledger: &mut StockLedger,
        sequences: &mut SequenceRegistry,
    ) -> Result<Vec<StockMove>> {
        if !matches!(
            order.state,
            SoState::Confirmed | SoState::Processing | SoState::Ready
        ) {
            return Err(ErpError::InvalidTransition(format!(
                "訂單 {} 狀態不允許出貨",
                order.reference
            )));
        }
        let source = order.source_location.ok_or_else(|| {
            ErpError::MissingField(format!("訂單 {} 未指定出貨來源儲位", order.reference))
        })?;

        // 兩端儲位先驗證，通過前不得動到保留量
        ledger.location_checked(source)?;
        ledger.location_checked(customer_location)?;

        // 決定每條明細的出貨量
        let mut plan: Vec<(usize, Decimal)> = Vec::new();
        for (index, line) in order.lines.iter().enumerate() {
            let requested = match quantities {
                Some(map) => map.get(&line.id).copied().unwrap_or(Decimal::ZERO),
                None => line.remaining_qty(),
            };
            if requested.is_zero() {
                continue;
            }
            if requested < Decimal::ZERO || requested > line.remaining_qty() {
                return Err(ErpError::InvalidQuantity(format!(
                    "明細 {} 出貨量 {} 超過未出貨量 {}",
                    line.description,
                    requested,
                    line.remaining_qty()
                )));
            }
            plan.push((index, requested));
        }
        if plan.is_empty() {
            return Err(ErpError::InvalidQuantity(format!(
                "訂單 {} 沒有可出貨的數量",
                order.reference
            )));
        }

        // 預檢：可用量加上本單自己持有的保留量必須涵蓋出貨量。
        // 只計本單明細的 quantity_reserved，別張訂單的保留量不可挪用。
        let mut per_product: HashMap<Uuid, Decimal> = HashMap::new();
        let mut held: HashMap<Uuid, Decimal> = HashMap::new();
        for (index, quantity) in &plan {
            let line = &order.lines[*index];
            *per_product.entry(line.product_id).or_insert(Decimal::ZERO) += *quantity;
            *held.entry(line.product_id).or_insert(Decimal::ZERO) +=
                line.quantity_reserved.min(*quantity);
        }
        for (product_id, total) in &per_product {
            let level = ledger.get_level(*product_id, Some(source), None);
            let releasable = held.get(product_id).copied().unwrap_or(Decimal::ZERO);
            if level.available + releasable < *total {
                return Err(ErpError::InsufficientStock {
                    required: *total,
                    available: level.available + releasable,
                    shortfall: *total - (level.available + releasable),
                });
            }
        }

        // 釋放本單持有、對應本次出貨的保留量
        for (product_id, releasable) in &held {
            if releasable.is_zero() {
                continue;
            }
            ledger.unreserve(*product_id, source, *releasable)?;
        }

        let mut moves = Vec::with_capacity(plan.len());
        for (index, quantity) in plan {
            let line = &mut order.lines[index];
            let mut stock_move = StockMove::new(
                sequences.next_stock_move(),
                line.product_id,
                source,
                customer_location,
                quantity,
            )
            .with_origin(order.reference.clone());

            self.processor.post(&mut stock_move, ledger)?;
            line.quantity_delivered += quantity;
            line.quantity_reserved = (line.quantity_reserved - quantity).max(Decimal::ZERO);
            moves.push(stock_move);
        }

        order.state = if order.is_fully_delivered() {
            SoState::Delivered
        } else {
            SoState::Processing
        };

        tracing::info!(
            "訂單 {} 出貨 {} 筆異動，狀態 {:?}",
            order.reference,
            moves.len(),
            order.state
        );
        Ok(moves)
    }

    /// 結案（已出貨 → 完成）
    pub fn complete_order(&self, order: &mut SalesOrder) -> Result<()> {
        if order.state != SoState::Delivered {
            return Err(ErpError::InvalidTransition(format!(
                "訂單 {} 未出貨完畢，無法結案",
                order.reference
            )));
        }
        order.state = SoState::Done;
        Ok(())
    }

    /// 取消訂單並釋放尚未出貨的保留量
    pub fn cancel_order(&self, order: &mut SalesOrder, ledger: &mut StockLedger) -> Result<()> {
        if matches!(order.state, SoState::Delivered | SoState::Done) {
            return Err(ErpError::InvalidTransition(format!(
                "訂單 {} 已出貨，無法取消",
                order.reference
            )));
        }

        if matches!(
            order.state,
            SoState::Confirmed | SoState::Processing | SoState::Ready
        ) {
            if let Some(source) = order.source_location {
                for line in &mut order.lines {
                    if line.quantity_reserved.is_zero() {
                        continue;
                    }
                    ledger.unreserve(line.product_id, source, line.quantity_reserved)?;
                    line.quantity_reserved = Decimal::ZERO;
                }
            }
        }

        order.state = SoState::Cancelled;
        Ok(())
    }

    // ------------------------------------------------------------------
    // 銷售發票
    // ------------------------------------------------------------------

    /// 由訂單開立發票，涵蓋所有尚未開票的數量
    ///
    /// 只有已出貨的訂單可以開票；已全數開票時回報重複執行。
    /// 表頭折扣只在首張發票帶入。
    pub fn create_invoice_from_order(
        &self,
        order: &mut SalesOrder,
        date: NaiveDate,
        due_date: Option<NaiveDate>,
        sequences: &mut SequenceRegistry,
    ) -> Result<SalesInvoice> {
        if !matches!(order.state, SoState::Delivered | SoState::Done) {
            return Err(ErpError::InvalidTransition(format!(
                "訂單 {} 未出貨，無法開票",
                order.reference
            )));
        }

        let uninvoiced: Vec<usize> = order
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.quantity_invoiced < l.quantity)
            .map(|(i, _)| i)
            .collect();
        if uninvoiced.is_empty() {
            return Err(ErpError::AlreadyProcessed(format!(
                "訂單 {} 已全數開票",
                order.reference
            )));
        }

        let first_invoice = order
            .lines
            .iter()
            .all(|l| l.quantity_invoiced.is_zero());

        let mut invoice = SalesInvoice::new(sequences.next_invoice(), order.customer_id, date);
        invoice.sales_order_id = Some(order.id);
        invoice.due_date = due_date;
        if first_invoice {
            invoice.discount_amount = order.discount_amount;
        }

        for index in uninvoiced {
            let line = &mut order.lines[index];
            let quantity = line.quantity - line.quantity_invoiced;
            invoice.push_line(SalesInvoiceLine::new(
                line.product_id,
                line.description.clone(),
                quantity,
                line.unit_price,
                line.discount_percent,
            ));
            line.quantity_invoiced += quantity;
        }
        invoice.compute_totals();

        tracing::info!(
            "訂單 {} 開立發票 {}，金額 {}",
            order.reference,
            invoice.reference,
            invoice.total_amount
        );
        Ok(invoice)
    }

    /// 送出發票（草稿 → 已送出）
    pub fn send_invoice(&self, invoice: &mut SalesInvoice) -> Result<()> {
        if invoice.state != InvoiceState::Draft {
            return Err(ErpError::InvalidTransition(format!(
                "發票 {} 非草稿，無法送出",
                invoice.reference
            )));
        }
        invoice.state = InvoiceState::Sent;
        Ok(())
    }

    /// 登錄收款（累加，不可回沖）
    pub fn record_payment(
        &self,
        invoice: &mut SalesInvoice,
        amount: Decimal,
        method: PaymentMethod,
        reference: Option<String>,
        date: NaiveDate,
    ) -> Result<()> {
        if invoice.state == InvoiceState::Cancelled {
            return Err(ErpError::InvalidTransition(format!(
                "發票 {} 已取消，無法收款",
                invoice.reference
            )));
        }
        if invoice.state == InvoiceState::Paid {
            return Err(ErpError::AlreadyProcessed(format!(
                "發票 {} 已付清",
                invoice.reference
            )));
        }
        if amount <= Decimal::ZERO {
            return Err(ErpError::InvalidQuantity(format!(
                "收款金額必須為正數：{amount}"
            )));
        }

        invoice.amount_paid += amount;
        invoice.recompute_amount_due();
        invoice.payment_method = Some(method);
        invoice.payment_reference = reference;
        invoice.payment_date = Some(date);
        invoice.state = if invoice.is_fully_paid() {
            InvoiceState::Paid
        } else {
            InvoiceState::Partial
        };

        tracing::info!(
            "發票 {} 收款 {}，未付 {}",
            invoice.reference,
            amount,
            invoice.amount_due
        );
        Ok(())
    }

    /// 將逾期未付的發票標記為逾期，回傳標記數
    pub fn mark_overdue(&self, invoices: &mut [SalesInvoice], today: NaiveDate) -> usize {
        let mut marked = 0;
        for invoice in invoices.iter_mut() {
            if matches!(invoice.state, InvoiceState::Sent | InvoiceState::Partial)
                && invoice.is_overdue(today)
            {
                invoice.state = InvoiceState::Overdue;
                marked += 1;
            }
        }
        marked
    }

    /// 作廢發票（已有收款者不可作廢）
    pub fn cancel_invoice(&self, invoice: &mut SalesInvoice) -> Result<()> {
        if invoice.amount_paid > Decimal::ZERO {
            return Err(ErpError::InvalidTransition(format!(
                "發票 {} 已有收款，無法作廢",
                invoice.reference
            )));
        }
        invoice.state = InvoiceState::Cancelled;
        Ok(())
    }
}
