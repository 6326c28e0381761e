//! 庫存異動與揀貨單
//!
//! StockMove 是一筆不可變的調撥紀錄；過帳（done）之後數量即為最終值。
//! StockPicking 把多筆計劃中的異動包成一次實體作業（收貨或出貨）。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 庫存異動狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveState {
    Draft,
    Waiting,
    Confirmed,
    Assigned,
    Done,
    Cancelled,
}

/// 庫存異動類型（由起訖儲位推導，不可自選）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveType {
    /// 供應商 → 內部
    Incoming,
    /// 內部 → 客戶
    Outgoing,
    /// 內部調撥
    Internal,
}

/// 庫存異動
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMove {
    pub id: Uuid,

    /// 單號（格式 SM-######）
    pub reference: String,

    pub product_id: Uuid,

    /// 來源儲位
    pub location_src: Uuid,

    /// 目的儲位
    pub location_dest: Uuid,

    /// 計劃數量
    pub quantity: Decimal,

    /// 實際完成數量
    pub quantity_done: Decimal,

    /// 單價（入庫成本）
    pub unit_price: Decimal,

    pub state: MoveState,

    pub move_type: MoveType,

    pub scheduled_date: Option<DateTime<Utc>>,

    /// 過帳時間
    pub date_done: Option<DateTime<Utc>>,

    /// 來源文件單號（如 PO-00001）
    pub origin: Option<String>,

    pub notes: Option<String>,
}

impl StockMove {
    /// 創建新的庫存異動（完成數量預設等於計劃數量）
    pub fn new(
        reference: impl Into<String>,
        product_id: Uuid,
        location_src: Uuid,
        location_dest: Uuid,
        quantity: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: reference.into(),
            product_id,
            location_src,
            location_dest,
            quantity,
            quantity_done: quantity,
            unit_price: Decimal::ZERO,
            state: MoveState::Draft,
            move_type: MoveType::Internal,
            scheduled_date: None,
            date_done: None,
            origin: None,
            notes: None,
        }
    }

    /// 建構器模式：設置完成數量
    pub fn with_quantity_done(mut self, quantity_done: Decimal) -> Self {
        self.quantity_done = quantity_done;
        self
    }

    /// 建構器模式：設置單價
    pub fn with_unit_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = unit_price;
        self
    }

    /// 建構器模式：設置來源文件
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// 是否已過帳
    pub fn is_done(&self) -> bool {
        self.state == MoveState::Done
    }
}

/// 揀貨單類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickingType {
    /// 收貨
    Incoming,
    /// 出貨
    Outgoing,
    /// 內部調撥
    Internal,
}

impl PickingType {
    /// 單號前綴
    pub fn sequence_prefix(&self) -> &'static str {
        match self {
            PickingType::Incoming => "IN",
            PickingType::Outgoing => "OUT",
            PickingType::Internal => "INT",
        }
    }
}

/// 揀貨單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickingState {
    Draft,
    Waiting,
    Ready,
    Done,
    Cancelled,
}

/// 揀貨單明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPickingLine {
    pub id: Uuid,

    pub product_id: Uuid,

    pub quantity: Decimal,

    pub quantity_done: Decimal,

    /// 覆寫表頭來源儲位
    pub location_src: Option<Uuid>,

    /// 覆寫表頭目的儲位
    pub location_dest: Option<Uuid>,

    /// 驗收後對應的庫存異動
    pub stock_move_id: Option<Uuid>,
}

impl StockPickingLine {
    pub fn new(product_id: Uuid, quantity: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            quantity,
            quantity_done: Decimal::ZERO,
            location_src: None,
            location_dest: None,
            stock_move_id: None,
        }
    }
}

/// 揀貨單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPicking {
    pub id: Uuid,

    /// 單號（格式 IN-#####／OUT-#####／INT-#####）
    pub reference: String,

    pub picking_type: PickingType,

    /// 預設來源儲位
    pub location_src: Option<Uuid>,

    /// 預設目的儲位
    pub location_dest: Option<Uuid>,

    pub state: PickingState,

    pub scheduled_date: Option<DateTime<Utc>>,

    pub date_done: Option<DateTime<Utc>>,

    /// 來源文件單號
    pub origin: Option<String>,

    pub notes: Option<String>,

    pub lines: Vec<StockPickingLine>,
}

impl StockPicking {
    /// 創建新的揀貨單
    pub fn new(reference: impl Into<String>, picking_type: PickingType) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: reference.into(),
            picking_type,
            location_src: None,
            location_dest: None,
            state: PickingState::Draft,
            scheduled_date: None,
            date_done: None,
            origin: None,
            notes: None,
            lines: Vec::new(),
        }
    }

    /// 建構器模式：設置起訖儲位
    pub fn with_locations(mut self, location_src: Uuid, location_dest: Uuid) -> Self {
        self.location_src = Some(location_src);
        self.location_dest = Some(location_dest);
        self
    }

    /// 建構器模式：設置來源文件
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// 加入明細
    pub fn push_line(&mut self, line: StockPickingLine) {
        self.lines.push(line);
    }

    /// 明細的實際來源儲位（明細覆寫優先於表頭）
    pub fn line_source(&self, line: &StockPickingLine) -> Option<Uuid> {
        line.location_src.or(self.location_src)
    }

    /// 明細的實際目的儲位
    pub fn line_destination(&self, line: &StockPickingLine) -> Option<Uuid> {
        line.location_dest.or(self.location_dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_move() {
        let stock_move = StockMove::new(
            "SM-000001",
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Decimal::from(30),
        )
        .with_unit_price(Decimal::from(12))
        .with_origin("PO-00001");

        assert_eq!(stock_move.quantity_done, Decimal::from(30));
        assert_eq!(stock_move.state, MoveState::Draft);
        assert_eq!(stock_move.origin.as_deref(), Some("PO-00001"));
        assert!(!stock_move.is_done());
    }

    #[test]
    fn test_picking_line_location_override() {
        let src = Uuid::new_v4();
        let dest = Uuid::new_v4();
        let override_src = Uuid::new_v4();

        let mut picking =
            StockPicking::new("OUT-00001", PickingType::Outgoing).with_locations(src, dest);

        let mut line = StockPickingLine::new(Uuid::new_v4(), Decimal::from(5));
        line.location_src = Some(override_src);
        picking.push_line(line);

        let line = &picking.lines[0];
        assert_eq!(picking.line_source(line), Some(override_src));
        assert_eq!(picking.line_destination(line), Some(dest));
    }

    #[test]
    fn test_picking_type_prefix() {
        assert_eq!(PickingType::Incoming.sequence_prefix(), "IN");
        assert_eq!(PickingType::Outgoing.sequence_prefix(), "OUT");
        assert_eq!(PickingType::Internal.sequence_prefix(), "INT");
    }
}
