//! 盤點作業：帳面與實盤差異過入庫存帳

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use erp_core::{
    AdjustmentState, ErpError, Result, StockAdjustment, StockAdjustmentLine,
};
use erp_stock::{SequenceRegistry, StockLedger};

/// 盤點服務
#[derive(Debug, Default)]
pub struct AdjustmentService;

impl AdjustmentService {
    pub fn new() -> Self {
        Self
    }

    /// 創建新盤點單並取號
    pub fn create(
        &self,
        name: impl Into<String>,
        location_id: Uuid,
        date: NaiveDate,
        sequences: &mut SequenceRegistry,
    ) -> StockAdjustment {
        StockAdjustment::new(sequences.next_adjustment(), name, location_id, date)
    }

    /// 開始盤點（草稿 → 盤點中）
    pub fn start(&self, adjustment: &mut StockAdjustment) -> Result<()> {
        if adjustment.state != AdjustmentState::Draft {
            return Err(ErpError::InvalidTransition(format!(
                "盤點單 {} 非草稿，無法開始",
                adjustment.reference
            )));
        }
        adjustment.state = AdjustmentState::InProgress;
        Ok(())
    }

    /// 登錄盤點明細，帳面數量自庫存帳帶入
    pub fn add_line(
        &self,
        adjustment: &mut StockAdjustment,
        product_id: Uuid,
        counted_qty: Decimal,
        ledger: &StockLedger,
    ) -> Result<()> {
        if adjustment.state != AdjustmentState::InProgress {
            return Err(ErpError::InvalidTransition(format!(
                "盤點單 {} 未開始，無法登錄明細",
                adjustment.reference
            )));
        }
        if counted_qty < Decimal::ZERO {
            return Err(ErpError::InvalidQuantity(format!(
                "盤點數量不可為負數：{counted_qty}"
            )));
        }

        let theoretical = ledger
            .get_level(product_id, Some(adjustment.location_id), None)
            .quantity;
        adjustment.push_line(StockAdjustmentLine::new(product_id, theoretical, counted_qty));
        Ok(())
    }

    /// 驗收：將所有差異過入庫存帳
    pub fn validate(
        &self,
        adjustment: &mut StockAdjustment,
        ledger: &mut StockLedger,
    ) -> Result<()> {
        if adjustment.state == AdjustmentState::Done {
            return Err(ErpError::AlreadyProcessed(format!(
                "盤點單 {} 已驗收",
                adjustment.reference
            )));
        }
        if adjustment.state != AdjustmentState::InProgress {
            return Err(ErpError::InvalidTransition(format!(
                "盤點單 {} 未開始，無法驗收",
                adjustment.reference
            )));
        }

        let mut applied = 0;
        for line in &adjustment.lines {
            if line.difference.is_zero() {
                continue;
            }
            ledger.adjust_quantity(
                line.product_id,
                adjustment.location_id,
                line.difference,
                None,
            )?;
            applied += 1;
        }

        adjustment.state = AdjustmentState::Done;
        tracing::info!("驗收盤點單 {}：套用 {} 筆差異", adjustment.reference, applied);
        Ok(())
    }

    /// 取消盤點單（已驗收者不可取消）
    pub fn cancel(&self, adjustment: &mut StockAdjustment) -> Result<()> {
        if adjustment.state == AdjustmentState::Done {
            return Err(ErpError::AlreadyProcessed(format!(
                "盤點單 {} 已驗收，無法取消",
                adjustment.reference
            )));
        }
        adjustment.state = AdjustmentState::Cancelled;
        Ok(())
    }
}
