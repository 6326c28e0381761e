//! 庫存異動過帳
//!
//! 過帳是帳務的唯一入口：依起訖儲位判定異動類型，來源扣帳、
//! 目的加帳，兩邊一起成功或一起不動。

use chrono::Utc;
use rust_decimal::Decimal;

use erp_core::{ErpError, LocationType, MoveState, MoveType, Result, StockMove};

use crate::ledger::StockLedger;

/// 庫存異動過帳器
#[derive(Debug, Default)]
pub struct MoveProcessor;

impl MoveProcessor {
    pub fn new() -> Self {
        Self
    }

    /// 由起訖儲位推導異動類型
    pub fn classify(&self, ledger: &StockLedger, stock_move: &StockMove) -> Result<MoveType> {
        let src = ledger.location_checked(stock_move.location_src)?;
        let dest = ledger.location_checked(stock_move.location_dest)?;

        let move_type = if src.location_type == LocationType::Supplier {
            MoveType::Incoming
        } else if dest.location_type == LocationType::Customer {
            MoveType::Outgoing
        } else {
            MoveType::Internal
        };

        Ok(move_type)
    }

    /// 過帳一筆庫存異動
    ///
    /// 已過帳的異動不可重複執行。完成數量必須為正數。
    /// 兩個儲位先驗證完畢才開始改帳，避免扣了來源卻加不了目的。
    pub fn post(&self, stock_move: &mut StockMove, ledger: &mut StockLedger) -> Result<()> {
        if stock_move.is_done() {
            return Err(ErpError::AlreadyProcessed(format!(
                "庫存異動 {} 已過帳",
                stock_move.reference
            )));
        }

        let move_type = self.classify(ledger, stock_move)?;

        let quantity = stock_move.quantity_done;
        if quantity <= Decimal::ZERO {
            return Err(ErpError::InvalidQuantity(format!(
                "完成數量必須為正數：{quantity}"
            )));
        }

        // 入庫成本只在單價為正時更新移動平均
        let unit_cost = if stock_move.unit_price > Decimal::ZERO {
            Some(stock_move.unit_price)
        } else {
            None
        };

        ledger.adjust_quantity(
            stock_move.product_id,
            stock_move.location_src,
            -quantity,
            None,
        )?;
        ledger.adjust_quantity(
            stock_move.product_id,
            stock_move.location_dest,
            quantity,
            unit_cost,
        )?;

        stock_move.move_type = move_type;
        stock_move.state = MoveState::Done;
        stock_move.date_done = Some(Utc::now());

        tracing::info!(
            "過帳庫存異動 {}：{} 單位 {:?}",
            stock_move.reference,
            quantity,
            move_type
        );
        Ok(())
    }
}
