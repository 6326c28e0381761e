//! 庫存盤點調整
//!
//! 比對帳面數量與實際盤點數量，驗收時將差異過入庫存帳。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::totals::QTY_DP;

/// 盤點單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentState {
    Draft,
    InProgress,
    Done,
    Cancelled,
}

/// 盤點明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustmentLine {
    pub id: Uuid,

    pub product_id: Uuid,

    /// 盤點前帳面數量
    pub theoretical_qty: Decimal,

    /// 實際盤點數量
    pub counted_qty: Decimal,

    /// 差異（counted − theoretical）
    pub difference: Decimal,
}

impl StockAdjustmentLine {
    pub fn new(product_id: Uuid, theoretical_qty: Decimal, counted_qty: Decimal) -> Self {
        let counted_qty = counted_qty.round_dp(QTY_DP);
        Self {
            id: Uuid::new_v4(),
            product_id,
            theoretical_qty,
            counted_qty,
            difference: counted_qty - theoretical_qty,
        }
    }
}

/// 盤點單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub id: Uuid,

    /// 單號（格式 ADJ-#####）
    pub reference: String,

    pub name: String,

    pub location_id: Uuid,

    pub state: AdjustmentState,

    pub date: NaiveDate,

    pub notes: Option<String>,

    pub lines: Vec<StockAdjustmentLine>,
}

impl StockAdjustment {
    /// 創建新盤點單
    pub fn new(
        reference: impl Into<String>,
        name: impl Into<String>,
        location_id: Uuid,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: reference.into(),
            name: name.into(),
            location_id,
            state: AdjustmentState::Draft,
            date,
            notes: None,
            lines: Vec::new(),
        }
    }

    pub fn push_line(&mut self, line: StockAdjustmentLine) {
        self.lines.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_difference() {
        let line =
            StockAdjustmentLine::new(Uuid::new_v4(), Decimal::from(100), Decimal::from(97));
        assert_eq!(line.difference, Decimal::from(-3));

        let line = StockAdjustmentLine::new(Uuid::new_v4(), Decimal::from(50), Decimal::from(55));
        assert_eq!(line.difference, Decimal::from(5));
    }
}
