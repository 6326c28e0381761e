//! 揀貨作業：批次驗收一張揀貨單的所有明細
//!
//! 驗收只接受就緒狀態的揀貨單，逐明細產生並過帳庫存異動。

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use erp_core::{ErpError, PickingState, Result, StockMove, StockPicking};
use erp_stock::{MoveProcessor, SequenceRegistry, StockLedger};

/// 揀貨服務
#[derive(Debug, Default)]
pub struct PickingService {
    processor: MoveProcessor,
}

impl PickingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 標記就緒（草稿／等待中 → 就緒）
    pub fn mark_ready(&self, picking: &mut StockPicking) -> Result<()> {
        if !matches!(picking.state, PickingState::Draft | PickingState::Waiting) {
            return Err(ErpError::InvalidTransition(format!(
                "揀貨單 {} 狀態不允許標記就緒",
                picking.reference
            )));
        }
        if picking.lines.is_empty() {
            return Err(ErpError::MissingField(format!(
                "揀貨單 {} 沒有明細",
                picking.reference
            )));
        }
        picking.state = PickingState::Ready;
        Ok(())
    }

    /// 驗收：逐明細過帳庫存異動
    ///
    /// 明細完成數量為零時以計劃數量過帳。起訖儲位先全部驗證，
    /// 任一明細缺儲位即整單拒絕。
    pub fn validate(
        &self,
        picking: &mut StockPicking,
        ledger: &mut StockLedger,
        sequences: &mut SequenceRegistry,
    ) -> Result<Vec<StockMove>> {
        if picking.state == PickingState::Done {
            return Err(ErpError::AlreadyProcessed(format!(
                "揀貨單 {} 已驗收",
                picking.reference
            )));
        }
        if picking.state != PickingState::Ready {
            return Err(ErpError::InvalidTransition(format!(
                "揀貨單 {} 未就緒，無法驗收",
                picking.reference
            )));
        }

        let mut plan: Vec<(usize, Uuid, Uuid, Decimal)> = Vec::new();
        for (index, line) in picking.lines.iter().enumerate() {
            let source = picking.line_source(line).ok_or_else(|| {
                ErpError::MissingField(format!("揀貨單 {} 明細缺來源儲位", picking.reference))
            })?;
            let destination = picking.line_destination(line).ok_or_else(|| {
                ErpError::MissingField(format!("揀貨單 {} 明細缺目的儲位", picking.reference))
            })?;
            ledger.location_checked(source)?;
            ledger.location_checked(destination)?;

            let quantity = if line.quantity_done > Decimal::ZERO {
                line.quantity_done
            } else {
                line.quantity
            };
            plan.push((index, source, destination, quantity));
        }

        let mut moves = Vec::with_capacity(plan.len());
        for (index, source, destination, quantity) in plan {
            let line = &mut picking.lines[index];
            let mut stock_move = StockMove::new(
                sequences.next_stock_move(),
                line.product_id,
                source,
                destination,
                quantity,
            )
            .with_origin(picking.reference.clone());

            self.processor.post(&mut stock_move, ledger)?;
            line.quantity_done = quantity;
            line.stock_move_id = Some(stock_move.id);
            moves.push(stock_move);
        }

        picking.state = PickingState::Done;
        picking.date_done = Some(Utc::now());

        tracing::info!("驗收揀貨單 {}：{} 筆異動", picking.reference, moves.len());
        Ok(moves)
    }

    /// 取消揀貨單（已驗收者不可取消）
    pub fn cancel(&self, picking: &mut StockPicking) -> Result<()> {
        if picking.state == PickingState::Done {
            return Err(ErpError::AlreadyProcessed(format!(
                "揀貨單 {} 已驗收，無法取消",
                picking.reference
            )));
        }
        picking.state = PickingState::Cancelled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erp_core::{Location, LocationType, PickingType, StockPickingLine};

    fn setup() -> (StockLedger, Uuid, Uuid) {
        let mut ledger = StockLedger::new();
        let stock = Location::new("Stock", "STOCK", LocationType::Internal);
        let shelf = Location::new("Shelf", "SHELF", LocationType::Internal);
        let (stock_id, shelf_id) = (stock.id, shelf.id);
        ledger.register_location(stock);
        ledger.register_location(shelf);
        (ledger, stock_id, shelf_id)
    }

    #[test]
    fn test_validate_posts_all_lines() {
        let (mut ledger, stock, shelf) = setup();
        let mut sequences = SequenceRegistry::new();
        let service = PickingService::new();
        let product = Uuid::new_v4();

        ledger
            .adjust_quantity(product, stock, Decimal::from(40), None)
            .unwrap();

        let mut picking = StockPicking::new(
            sequences.next_picking(PickingType::Internal),
            PickingType::Internal,
        )
        .with_locations(stock, shelf);
        picking.push_line(StockPickingLine::new(product, Decimal::from(15)));
        service.mark_ready(&mut picking).unwrap();

        let moves = service
            .validate(&mut picking, &mut ledger, &mut sequences)
            .unwrap();

        assert_eq!(moves.len(), 1);
        assert_eq!(picking.state, PickingState::Done);
        assert_eq!(picking.lines[0].quantity_done, Decimal::from(15));
        assert_eq!(picking.lines[0].stock_move_id, Some(moves[0].id));

        let shelf_level = ledger.get_level(product, Some(shelf), None);
        assert_eq!(shelf_level.quantity, Decimal::from(15));
    }

    #[test]
    fn test_validate_requires_ready() {
        let (mut ledger, stock, shelf) = setup();
        let mut sequences = SequenceRegistry::new();
        let service = PickingService::new();

        let mut picking = StockPicking::new("INT-00001", PickingType::Internal)
            .with_locations(stock, shelf);
        picking.push_line(StockPickingLine::new(Uuid::new_v4(), Decimal::from(5)));

        let err = service
            .validate(&mut picking, &mut ledger, &mut sequences)
            .unwrap_err();
        assert!(matches!(err, ErpError::InvalidTransition(_)));
    }

    #[test]
    fn test_double_validate_is_rejected() {
        let (mut ledger, stock, shelf) = setup();
        let mut sequences = SequenceRegistry::new();
        let service = PickingService::new();
        let product = Uuid::new_v4();

        ledger
            .adjust_quantity(product, stock, Decimal::from(10), None)
            .unwrap();

        let mut picking = StockPicking::new("INT-00002", PickingType::Internal)
            .with_locations(stock, shelf);
        picking.push_line(StockPickingLine::new(product, Decimal::from(5)));
        service.mark_ready(&mut picking).unwrap();
        service
            .validate(&mut picking, &mut ledger, &mut sequences)
            .unwrap();

        let err = service
            .validate(&mut picking, &mut ledger, &mut sequences)
            .unwrap_err();
        assert!(matches!(err, ErpError::AlreadyProcessed(_)));
    }

    #[test]
    fn test_partial_quantity_done_overrides_plan() {
        let (mut ledger, stock, shelf) = setup();
        let mut sequences = SequenceRegistry::new();
        let service = PickingService::new();
        let product = Uuid::new_v4();

        ledger
            .adjust_quantity(product, stock, Decimal::from(20), None)
            .unwrap();

        let mut picking = StockPicking::new("INT-00003", PickingType::Internal)
            .with_locations(stock, shelf);
        let mut line = StockPickingLine::new(product, Decimal::from(20));
        line.quantity_done = Decimal::from(8);
        picking.push_line(line);
        service.mark_ready(&mut picking).unwrap();

        let moves = service
            .validate(&mut picking, &mut ledger, &mut sequences)
            .unwrap();
        assert_eq!(moves[0].quantity_done, Decimal::from(8));

        let shelf_level = ledger.get_level(product, Some(shelf), None);
        assert_eq!(shelf_level.quantity, Decimal::from(8));
    }

    #[test]
    fn test_cancelled_picking_cannot_be_validated() {
        let (mut ledger, stock, shelf) = setup();
        let mut sequences = SequenceRegistry::new();
        let service = PickingService::new();

        let mut picking = StockPicking::new("INT-00004", PickingType::Internal)
            .with_locations(stock, shelf);
        picking.push_line(StockPickingLine::new(Uuid::new_v4(), Decimal::from(5)));
        service.cancel(&mut picking).unwrap();

        let err = service
            .validate(&mut picking, &mut ledger, &mut sequences)
            .unwrap_err();
        assert!(matches!(err, ErpError::InvalidTransition(_)));
    }
}
