//! 製造流程：BOM 展開、元件消耗與成品入庫
//!
//! 元件自來源儲位移入生產虛擬儲位，成品自生產儲位
//! 以 BOM 成本入庫至目的儲位。

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use erp_core::totals::COMPONENT_QTY_DP;
use erp_core::{
    BillOfMaterials, ErpError, LocationType, ManufacturingOrder, ManufacturingOrderLine, MoState,
    Product, Result, StockMove,
};
use erp_stock::{MoveProcessor, NegativeStockPolicy, SequenceRegistry, StockLedger};

/// 單一元件的備料狀況
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ComponentAvailability {
    pub product_id: Uuid,
    pub required: Decimal,
    pub available: Decimal,
    pub sufficient: bool,
    pub shortage: Decimal,
}

/// BOM 查詢服務
#[derive(Debug, Default)]
pub struct BomService;

impl BomService {
    pub fn new() -> Self {
        Self
    }

    /// 檢查生產指定數量所需元件的備料狀況
    pub fn check_component_availability(
        &self,
        bom: &BillOfMaterials,
        quantity: Decimal,
        ledger: &StockLedger,
        location: Uuid,
    ) -> Vec<ComponentAvailability> {
        bom.lines
            .iter()
            .map(|line| {
                let required = (line.quantity * quantity).round_dp(COMPONENT_QTY_DP);
                let available = ledger
                    .get_level(line.product_id, Some(location), None)
                    .available;
                ComponentAvailability {
                    product_id: line.product_id,
                    required,
                    available,
                    sufficient: available >= required,
                    shortage: (required - available).max(Decimal::ZERO),
                }
            })
            .collect()
    }

    /// 以現有備料可生產的最大數量（取各元件可供量的最小值，無條件捨去）
    pub fn calculate_max_production(
        &self,
        bom: &BillOfMaterials,
        ledger: &StockLedger,
        location: Uuid,
    ) -> Decimal {
        let mut max_units: Option<Decimal> = None;
        for line in &bom.lines {
            if line.quantity <= Decimal::ZERO {
                continue;
            }
            let available = ledger
                .get_level(line.product_id, Some(location), None)
                .available;
            let units = (available / line.quantity).floor();
            max_units = Some(match max_units {
                Some(current) => current.min(units),
                None => units,
            });
        }
        max_units.unwrap_or(Decimal::ZERO).max(Decimal::ZERO)
    }
}

/// 製造服務
#[derive(Debug, Default)]
pub struct ManufacturingService {
    processor: MoveProcessor,
}

impl ManufacturingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由 BOM 展開建立製造工單
    ///
    /// 元件需求 = BOM 明細數量 × 生產數量；
    /// 成品入帳單位成本取 BOM 元件總成本。
    pub fn create_mo_from_bom(
        &self,
        bom: &BillOfMaterials,
        quantity: Decimal,
        source_location: Uuid,
        destination_location: Uuid,
        sequences: &mut SequenceRegistry,
    ) -> Result<ManufacturingOrder> {
        if !bom.is_active {
            return Err(ErpError::InvalidTransition(format!(
                "BOM {} 已停用",
                bom.reference
            )));
        }
        if quantity <= Decimal::ZERO {
            return Err(ErpError::InvalidQuantity(format!(
                "生產數量必須為正數：{quantity}"
            )));
        }
        if bom.lines.is_empty() {
            return Err(ErpError::MissingField(format!(
                "BOM {} 沒有元件明細",
                bom.reference
            )));
        }

        let mut order = ManufacturingOrder::new(
            sequences.next_manufacturing_order(),
            bom.product_id,
            quantity,
            source_location,
            destination_location,
        );
        order.bom_id = Some(bom.id);
        order.unit_cost = bom.total_cost();

        for line in &bom.lines {
            order.lines.push(ManufacturingOrderLine::new(
                line.product_id,
                line.quantity * quantity,
            ));
        }

        tracing::info!(
            "由 BOM {} 建立工單 {}：{} 單位，{} 種元件",
            bom.reference,
            order.reference,
            quantity,
            order.lines.len()
        );
        Ok(order)
    }

    /// 建立無 BOM 的手動工單
    ///
    /// 成品入帳單位成本取產品標準成本。元件明細留空，
    /// 消耗步驟自然略過。
    pub fn create_mo(
        &self,
        product: &Product,
        quantity: Decimal,
        source_location: Uuid,
        destination_location: Uuid,
        sequences: &mut SequenceRegistry,
    ) -> Result<ManufacturingOrder> {
        if quantity <= Decimal::ZERO {
            return Err(ErpError::InvalidQuantity(format!(
                "生產數量必須為正數：{quantity}"
            )));
        }

        let mut order = ManufacturingOrder::new(
            sequences.next_manufacturing_order(),
            product.id,
            quantity,
            source_location,
            destination_location,
        );
        order.unit_cost = product.standard_price;

        tracing::info!(
            "建立手動工單 {}：{} × {}，單位成本 {}",
            order.reference,
            product.name,
            quantity,
            order.unit_cost
        );
        Ok(order)
    }

    /// 確認工單（草稿 → 已確認）
    pub fn confirm_mo(&self, order: &mut ManufacturingOrder) -> Result<()> {
        if order.state != MoState::Draft {
            return Err(ErpError::InvalidTransition(format!(
                "工單 {} 非草稿，無法確認",
                order.reference
            )));
        }
        order.state = MoState::Confirmed;
        Ok(())
    }

    /// 開工（已確認 → 生產中）
    pub fn start_mo(&self, order: &mut ManufacturingOrder) -> Result<()> {
        if order.state != MoState::Confirmed {
            return Err(ErpError::InvalidTransition(format!(
                "工單 {} 未確認，無法開工",
                order.reference
            )));
        }
        order.state = MoState::InProgress;
        order.date_started = Some(Utc::now());
        Ok(())
    }

    /// 消耗元件：自來源儲位移入生產儲位
    ///
    /// 一次消耗所有明細的未消耗量。生產儲位必須是生產類型。
    pub fn consume_components(
        &self,
        order: &mut ManufacturingOrder,
        production_location: Uuid,
        ledger: &mut StockLedger,
        sequences: &mut SequenceRegistry,
    ) -> Result<Vec<StockMove>> {
        if order.state != MoState::InProgress {
            return Err(ErpError::InvalidTransition(format!(
                "工單 {} 未開工，無法消耗元件",
                order.reference
            )));
        }
        self.check_production_location(ledger, production_location)?;

        // 檢查先於過帳：任一元件短缺即整批拒絕
        if ledger.policy() == NegativeStockPolicy::Forbid {
            for line in &order.lines {
                let remaining = line.remaining_qty();
                if remaining <= Decimal::ZERO {
                    continue;
                }
                let available = ledger
                    .get_level(line.product_id, Some(order.source_location), None)
                    .available;
                if available < remaining {
                    return Err(ErpError::InsufficientStock {
                        required: remaining,
                        available,
                        shortfall: remaining - available,
                    });
                }
            }
        }

        let mut moves = Vec::new();
        for index in 0..order.lines.len() {
            let remaining = order.lines[index].remaining_qty();
            if remaining <= Decimal::ZERO {
                continue;
            }
            let product_id = order.lines[index].product_id;

            let mut stock_move = StockMove::new(
                sequences.next_stock_move(),
                product_id,
                order.source_location,
                production_location,
                remaining,
            )
            .with_origin(order.reference.clone());

            self.processor.post(&mut stock_move, ledger)?;
            order.lines[index].quantity_consumed += remaining;
            moves.push(stock_move);
        }

        tracing::info!("工單 {} 消耗 {} 筆元件異動", order.reference, moves.len());
        Ok(moves)
    }

    /// 產出入庫：自生產儲位移入目的儲位，以工單單位成本入帳
    pub fn produce(
        &self,
        order: &mut ManufacturingOrder,
        quantity: Decimal,
        production_location: Uuid,
        ledger: &mut StockLedger,
        sequences: &mut SequenceRegistry,
    ) -> Result<StockMove> {
        if order.state != MoState::InProgress {
            return Err(ErpError::InvalidTransition(format!(
                "工單 {} 未開工，無法產出",
                order.reference
            )));
        }
        self.check_production_location(ledger, production_location)?;
        if quantity <= Decimal::ZERO {
            return Err(ErpError::InvalidQuantity(format!(
                "產出數量必須為正數：{quantity}"
            )));
        }
        if quantity > order.remaining_qty() {
            return Err(ErpError::InvalidQuantity(format!(
                "產出數量 {} 超過未產出量 {}",
                quantity,
                order.remaining_qty()
            )));
        }

        let mut stock_move = StockMove::new(
            sequences.next_stock_move(),
            order.product_id,
            production_location,
            order.destination_location,
            quantity,
        )
        .with_unit_price(order.unit_cost)
        .with_origin(order.reference.clone());

        self.processor.post(&mut stock_move, ledger)?;
        order.quantity_produced += quantity;

        if order.remaining_qty().is_zero() {
            order.state = MoState::Done;
            order.date_finished = Some(Utc::now());
        }

        tracing::info!(
            "工單 {} 產出 {}，進度 {}%",
            order.reference,
            quantity,
            order.progress_percentage().round_dp(1)
        );
        Ok(stock_move)
    }

    /// 一鍵完工：必要時開工，消耗剩餘元件，產出剩餘數量
    pub fn complete_production(
        &self,
        order: &mut ManufacturingOrder,
        production_location: Uuid,
        ledger: &mut StockLedger,
        sequences: &mut SequenceRegistry,
    ) -> Result<Vec<StockMove>> {
        if !matches!(order.state, MoState::Confirmed | MoState::InProgress) {
            return Err(ErpError::InvalidTransition(format!(
                "工單 {} 狀態不允許完工",
                order.reference
            )));
        }
        if order.state == MoState::Confirmed {
            self.start_mo(order)?;
        }

        let mut moves =
            self.consume_components(order, production_location, ledger, sequences)?;
        let remaining = order.remaining_qty();
        if remaining > Decimal::ZERO {
            moves.push(self.produce(
                order,
                remaining,
                production_location,
                ledger,
                sequences,
            )?);
        }
        Ok(moves)
    }

    /// 取消工單（已有消耗或產出者不可取消）
    pub fn cancel_mo(&self, order: &mut ManufacturingOrder) -> Result<()> {
        if order.state == MoState::Done {
            return Err(ErpError::InvalidTransition(format!(
                "工單 {} 已完工，無法取消",
                order.reference
            )));
        }
        if order.quantity_produced > Decimal::ZERO
            || order
                .lines
                .iter()
                .any(|l| l.quantity_consumed > Decimal::ZERO)
        {
            return Err(ErpError::InvalidTransition(format!(
                "工單 {} 已有消耗或產出，無法取消",
                order.reference
            )));
        }
        order.state = MoState::Cancelled;
        Ok(())
    }

    fn check_production_location(&self, ledger: &StockLedger, location_id: Uuid) -> Result<()> {
        let location = ledger.location_checked(location_id)?;
        if location.location_type != LocationType::Production {
            return Err(ErpError::InvalidTransition(format!(
                "儲位 {} 不是生產儲位",
                location.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erp_core::{BomLine, Location, Product, ProductType, UnitOfMeasure, UomCategory};

    struct Fixture {
        service: ManufacturingService,
        boms: BomService,
        ledger: StockLedger,
        sequences: SequenceRegistry,
        stock: Uuid,
        production: Uuid,
        component: Product,
        output: Product,
        bom: BillOfMaterials,
    }

    fn fixture() -> Fixture {
        let mut ledger = StockLedger::new();
        let stock = Location::new("Stock", "STOCK", LocationType::Internal);
        let production = Location::new("Production", "PRODUCTION", LocationType::Production);
        let (stock_id, production_id) = (stock.id, production.id);
        ledger.register_location(stock);
        ledger.register_location(production);

        let uom = UnitOfMeasure::new("Unit", "pcs", UomCategory::Unit);
        let component = Product::new("Filter Paper", ProductType::Stockable, uom.id)
            .with_standard_price(Decimal::from(3));
        let output = Product::new("Drip Kit", ProductType::Stockable, uom.id);

        // 每單位成品需要 2 個元件
        let mut bom = BillOfMaterials::new(&output);
        bom.push_line(BomLine::new(&component, Decimal::from(2)));

        Fixture {
            service: ManufacturingService::new(),
            boms: BomService::new(),
            ledger,
            sequences: SequenceRegistry::new(),
            stock: stock_id,
            production: production_id,
            component,
            output,
            bom,
        }
    }

    fn started_mo(f: &mut Fixture, qty: i64) -> ManufacturingOrder {
        let mut order = f
            .service
            .create_mo_from_bom(&f.bom, Decimal::from(qty), f.stock, f.stock, &mut f.sequences)
            .unwrap();
        f.service.confirm_mo(&mut order).unwrap();
        f.service.start_mo(&mut order).unwrap();
        order
    }

    #[test]
    fn test_mo_expands_bom() {
        let mut f = fixture();
        let order = f
            .service
            .create_mo_from_bom(
                &f.bom,
                Decimal::from(10),
                f.stock,
                f.stock,
                &mut f.sequences,
            )
            .unwrap();

        assert_eq!(order.reference, "MO-00001");
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].quantity_required, Decimal::from(20));
        // 成本 = 2 × 3 = 6
        assert_eq!(order.unit_cost, Decimal::from(6));
        assert_eq!(order.bom_id, Some(f.bom.id));
    }

    #[test]
    fn test_manual_mo_produces_at_standard_price() {
        let mut f = fixture();
        let uom = UnitOfMeasure::new("Unit", "pcs", UomCategory::Unit);
        let kit = Product::new("Gift Box", ProductType::Stockable, uom.id)
            .with_standard_price(Decimal::from(9));

        let mut order = f
            .service
            .create_mo(&kit, Decimal::from(5), f.stock, f.stock, &mut f.sequences)
            .unwrap();
        assert!(order.lines.is_empty());
        assert_eq!(order.bom_id, None);
        // 無 BOM 時以標準成本入帳
        assert_eq!(order.unit_cost, Decimal::from(9));

        f.service.confirm_mo(&mut order).unwrap();
        f.service.start_mo(&mut order).unwrap();
        f.service
            .produce(
                &mut order,
                Decimal::from(5),
                f.production,
                &mut f.ledger,
                &mut f.sequences,
            )
            .unwrap();

        assert_eq!(order.state, MoState::Done);
        let quants = f.ledger.quants_at(kit.id, f.stock);
        assert_eq!(quants[0].quantity, Decimal::from(5));
        assert_eq!(quants[0].unit_cost, Decimal::from(9));
    }

    #[test]
    fn test_consume_then_produce() {
        let mut f = fixture();
        f.ledger
            .adjust_quantity(
                f.component.id,
                f.stock,
                Decimal::from(50),
                Some(Decimal::from(3)),
            )
            .unwrap();

        let mut order = started_mo(&mut f, 10);

        let moves = f
            .service
            .consume_components(&mut order, f.production, &mut f.ledger, &mut f.sequences)
            .unwrap();
        assert_eq!(moves.len(), 1);
        assert!(order.lines[0].is_fully_consumed());

        // 50 − 20 = 30 留在庫存
        let level = f.ledger.get_level(f.component.id, Some(f.stock), None);
        assert_eq!(level.quantity, Decimal::from(30));

        f.service
            .produce(
                &mut order,
                Decimal::from(10),
                f.production,
                &mut f.ledger,
                &mut f.sequences,
            )
            .unwrap();
        assert_eq!(order.state, MoState::Done);
        assert!(order.date_finished.is_some());

        // 成品以 BOM 成本入庫
        let quants = f.ledger.quants_at(f.output.id, f.stock);
        assert_eq!(quants[0].quantity, Decimal::from(10));
        assert_eq!(quants[0].unit_cost, Decimal::from(6));
    }

    #[test]
    fn test_consume_requires_production_location() {
        let mut f = fixture();
        f.ledger
            .adjust_quantity(f.component.id, f.stock, Decimal::from(50), None)
            .unwrap();

        let mut order = started_mo(&mut f, 10);
        let err = f
            .service
            .consume_components(&mut order, f.stock, &mut f.ledger, &mut f.sequences)
            .unwrap_err();
        assert!(matches!(err, ErpError::InvalidTransition(_)));
    }

    #[test]
    fn test_consume_fails_on_shortage() {
        let mut f = fixture();
        // 只有 10 個元件，需求 20
        f.ledger
            .adjust_quantity(f.component.id, f.stock, Decimal::from(10), None)
            .unwrap();

        let mut order = started_mo(&mut f, 10);
        let err = f
            .service
            .consume_components(&mut order, f.production, &mut f.ledger, &mut f.sequences)
            .unwrap_err();
        assert!(matches!(err, ErpError::InsufficientStock { .. }));
    }

    #[test]
    fn test_overproduction_is_rejected() {
        let mut f = fixture();
        f.ledger
            .adjust_quantity(f.component.id, f.stock, Decimal::from(50), None)
            .unwrap();

        let mut order = started_mo(&mut f, 10);
        f.service
            .consume_components(&mut order, f.production, &mut f.ledger, &mut f.sequences)
            .unwrap();

        let err = f
            .service
            .produce(
                &mut order,
                Decimal::from(11),
                f.production,
                &mut f.ledger,
                &mut f.sequences,
            )
            .unwrap_err();
        assert!(matches!(err, ErpError::InvalidQuantity(_)));
    }

    #[test]
    fn test_complete_production_one_shot() {
        let mut f = fixture();
        f.ledger
            .adjust_quantity(
                f.component.id,
                f.stock,
                Decimal::from(50),
                Some(Decimal::from(3)),
            )
            .unwrap();

        let mut order = f
            .service
            .create_mo_from_bom(&f.bom, Decimal::from(5), f.stock, f.stock, &mut f.sequences)
            .unwrap();
        f.service.confirm_mo(&mut order).unwrap();

        let moves = f
            .service
            .complete_production(&mut order, f.production, &mut f.ledger, &mut f.sequences)
            .unwrap();

        // 一筆消耗加一筆產出
        assert_eq!(moves.len(), 2);
        assert_eq!(order.state, MoState::Done);
        assert_eq!(order.quantity_produced, Decimal::from(5));
    }

    #[test]
    fn test_cancel_blocked_after_consumption() {
        let mut f = fixture();
        f.ledger
            .adjust_quantity(f.component.id, f.stock, Decimal::from(50), None)
            .unwrap();

        let mut order = started_mo(&mut f, 10);
        f.service
            .consume_components(&mut order, f.production, &mut f.ledger, &mut f.sequences)
            .unwrap();

        let err = f.service.cancel_mo(&mut order).unwrap_err();
        assert!(matches!(err, ErpError::InvalidTransition(_)));
    }

    #[test]
    fn test_component_availability_report() {
        let mut f = fixture();
        f.ledger
            .adjust_quantity(f.component.id, f.stock, Decimal::from(15), None)
            .unwrap();

        let report =
            f.boms
                .check_component_availability(&f.bom, Decimal::from(10), &f.ledger, f.stock);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].required, Decimal::from(20));
        assert_eq!(report[0].available, Decimal::from(15));
        assert!(!report[0].sufficient);
        assert_eq!(report[0].shortage, Decimal::from(5));

        // 15 ÷ 2 = 7.5 → 7
        let max = f.boms.calculate_max_production(&f.bom, &f.ledger, f.stock);
        assert_eq!(max, Decimal::from(7));
    }
}
