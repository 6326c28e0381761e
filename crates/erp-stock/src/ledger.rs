//! 庫存帳
//!
//! 每一 (產品, 儲位) 的帳面數量與保留狀態由本模組獨占持有；
//! 其他元件一律透過這裡的操作改帳，不得直接改寫 quant。
//! 所有變更方法都要求 `&mut self`，單一請求內的檢查與套用不可被打斷。

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use erp_core::totals::MONEY_DP;
use erp_core::{ErpError, Location, Product, Result, StockQuant};

/// 負庫存政策（預設拒絕）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NegativeStockPolicy {
    /// 拒絕讓帳面數量低於保留量（扣減不足即報錯）
    #[default]
    Forbid,
    /// 允許轉負，但記錄警示
    Allow,
}

/// 某產品在篩選範圍內的庫存水位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    /// 帳面數量
    pub quantity: Decimal,
    /// 已保留數量
    pub reserved: Decimal,
    /// 可用數量（quantity − reserved）
    pub available: Decimal,
}

/// 低於再訂購點的產品
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowStockEntry {
    pub product_id: Uuid,
    pub available: Decimal,
    pub reorder_point: Decimal,
    pub reorder_qty: Decimal,
}

/// 庫存帳
#[derive(Debug, Default)]
pub struct StockLedger {
    /// 儲位主檔（判斷內部儲位與倉庫歸屬）
    locations: HashMap<Uuid, Location>,

    /// (產品, 儲位) → 批次列表
    quants: HashMap<(Uuid, Uuid), Vec<StockQuant>>,

    /// 批次插入序號（FIFO 次要排序鍵，嚴格遞增）
    next_seq: u64,

    policy: NegativeStockPolicy,
}

impl StockLedger {
    /// 創建新的庫存帳（預設不允許負庫存）
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：設置負庫存政策
    pub fn with_policy(mut self, policy: NegativeStockPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> NegativeStockPolicy {
        self.policy
    }

    /// 註冊儲位（系統設置階段）
    pub fn register_location(&mut self, location: Location) {
        self.locations.insert(location.id, location);
    }

    pub fn location(&self, location_id: Uuid) -> Option<&Location> {
        self.locations.get(&location_id)
    }

    /// 取得儲位，不存在即報錯
    pub fn location_checked(&self, location_id: Uuid) -> Result<&Location> {
        self.locations
            .get(&location_id)
            .ok_or(ErpError::LocationNotFound(location_id))
    }

    /// 檢視某 (產品, 儲位) 的批次（帳內順序）
    pub fn quants_at(&self, product_id: Uuid, location_id: Uuid) -> &[StockQuant] {
        self.quants
            .get(&(product_id, location_id))
            .map(|rows| rows.as_slice())
            .unwrap_or(&[])
    }

    /// 查詢庫存水位：彙總符合篩選的批次，只計內部儲位
    pub fn get_level(
        &self,
        product_id: Uuid,
        location: Option<Uuid>,
        warehouse: Option<Uuid>,
    ) -> StockLevel {
        let mut quantity = Decimal::ZERO;
        let mut reserved = Decimal::ZERO;

        for ((product, location_id), rows) in &self.quants {
            if *product != product_id {
                continue;
            }
            let Some(record) = self.locations.get(location_id) else {
                continue;
            };
            if !record.is_internal() {
                continue;
            }
            if let Some(filter) = location {
                if *location_id != filter {
                    continue;
                }
            } else if let Some(filter) = warehouse {
                if record.warehouse_id != Some(filter) {
                    continue;
                }
            }

            for quant in rows {
                quantity += quant.quantity;
                reserved += quant.reserved_quantity;
            }
        }

        StockLevel {
            quantity,
            reserved,
            available: quantity - reserved,
        }
    }

    /// 調整帳面數量
    ///
    /// `delta` 為正時累加，並在給定 `unit_cost` 時重算移動平均成本；
    /// `delta` 為負時自最舊批次扣減，不動保留量。檢查先於套用，
    /// 失敗不留部分效果。
    pub fn adjust_quantity(
        &mut self,
        product_id: Uuid,
        location_id: Uuid,
        delta: Decimal,
        unit_cost: Option<Decimal>,
    ) -> Result<()> {
        let is_internal = self.location_checked(location_id)?.is_internal();

        if delta.is_zero() {
            return Ok(());
        }

        // 非內部儲位是對沖帳（供應商、客戶、盤盈虧、生產），可自由轉負
        let policy = if is_internal {
            self.policy
        } else {
            NegativeStockPolicy::Allow
        };
        let rows = self.quants.entry((product_id, location_id)).or_default();

        if rows.is_empty() {
            self.next_seq += 1;
            rows.push(StockQuant::new(
                product_id,
                location_id,
                unit_cost.unwrap_or(Decimal::ZERO),
                self.next_seq,
            ));
        }

        sort_fifo(rows);

        if delta > Decimal::ZERO {
            let target = &mut rows[0];
            let old_qty = target.quantity;
            let new_qty = old_qty + delta;

            if let Some(cost) = unit_cost {
                if new_qty > Decimal::ZERO {
                    let old_value = old_qty * target.unit_cost;
                    let incoming_value = delta * cost;
                    target.unit_cost = ((old_value + incoming_value) / new_qty).round_dp(MONEY_DP);
                }
            }

            target.quantity = new_qty;
            return Ok(());
        }

        // 扣減：預檢可扣額度，再由最舊批次消化
        let mut remaining = -delta;
        let unreserved: Decimal = rows
            .iter()
            .map(|q| (q.quantity - q.reserved_quantity).max(Decimal::ZERO))
            .sum();

        if policy == NegativeStockPolicy::Forbid && remaining > unreserved {
            return Err(ErpError::InsufficientStock {
                required: remaining,
                available: unreserved,
                shortfall: remaining - unreserved,
            });
        }

        for quant in rows.iter_mut() {
            if remaining.is_zero() {
                break;
            }
            let take = (quant.quantity - quant.reserved_quantity)
                .max(Decimal::ZERO)
                .min(remaining);
            quant.quantity -= take;
            remaining -= take;
        }

        if remaining > Decimal::ZERO {
            // 餘量計入最舊批次，帳面轉負
            if is_internal {
                tracing::warn!(
                    "產品 {} 於儲位 {} 轉為負庫存（超扣 {}）",
                    product_id,
                    location_id,
                    remaining
                );
            }
            rows[0].quantity -= remaining;
        }

        Ok(())
    }

    /// 以獨立批次入庫（不同成本批，供 FIFO 保留消化）
    pub fn receive_lot(
        &mut self,
        product_id: Uuid,
        location_id: Uuid,
        quantity: Decimal,
        unit_cost: Decimal,
    ) -> Result<Uuid> {
        self.location_checked(location_id)?;

        if quantity <= Decimal::ZERO {
            return Err(ErpError::InvalidQuantity(format!(
                "入庫數量必須為正數：{quantity}"
            )));
        }

        self.next_seq += 1;
        let quant = StockQuant::new(product_id, location_id, unit_cost, self.next_seq)
            .with_quantity(quantity);
        let quant_id = quant.id;
        self.quants
            .entry((product_id, location_id))
            .or_default()
            .push(quant);

        Ok(quant_id)
    }

    /// 保留庫存（全有或全無）
    ///
    /// 先加總可用量，不足即整筆拒絕；足夠則按 (入庫時間, 序號)
    /// 由最舊批次開始消化。
    pub fn reserve(&mut self, product_id: Uuid, location_id: Uuid, quantity: Decimal) -> Result<()> {
        self.location_checked(location_id)?;

        if quantity <= Decimal::ZERO {
            return Err(ErpError::InvalidQuantity(format!(
                "保留數量必須為正數：{quantity}"
            )));
        }

        let rows = self
            .quants
            .entry((product_id, location_id))
            .or_default();

        let available: Decimal = rows.iter().map(|q| q.available_quantity()).sum();
        if available < quantity {
            return Err(ErpError::InsufficientStock {
                required: quantity,
                available,
                shortfall: quantity - available,
            });
        }

        sort_fifo(rows);

        let mut remaining = quantity;
        for quant in rows.iter_mut() {
            if remaining.is_zero() {
                break;
            }
            let take = quant.available_quantity().min(remaining);
            quant.reserved_quantity += take;
            remaining -= take;
        }

        tracing::debug!(
            "保留 {} 單位：產品 {} @ 儲位 {}",
            quantity,
            product_id,
            location_id
        );
        Ok(())
    }

    /// 釋放保留（由最舊批次開始；超過已保留量時靜默停止）
    pub fn unreserve(
        &mut self,
        product_id: Uuid,
        location_id: Uuid,
        quantity: Decimal,
    ) -> Result<()> {
        self.location_checked(location_id)?;

        if quantity <= Decimal::ZERO {
            return Ok(());
        }

        let Some(rows) = self.quants.get_mut(&(product_id, location_id)) else {
            return Ok(());
        };

        sort_fifo(rows);

        let mut remaining = quantity;
        for quant in rows.iter_mut() {
            if remaining.is_zero() {
                break;
            }
            let release = quant.reserved_quantity.min(remaining);
            quant.reserved_quantity -= release;
            remaining -= release;
        }

        Ok(())
    }

    /// 庫存總值：內部儲位上數量為正的批次 Σ 數量 × 單位成本
    pub fn valuation(&self, warehouse: Option<Uuid>) -> Decimal {
        let mut total = Decimal::ZERO;

        for ((_, location_id), rows) in &self.quants {
            let Some(record) = self.locations.get(location_id) else {
                continue;
            };
            if !record.is_internal() {
                continue;
            }
            if let Some(filter) = warehouse {
                if record.warehouse_id != Some(filter) {
                    continue;
                }
            }

            for quant in rows {
                if quant.quantity > Decimal::ZERO {
                    total += quant.total_value();
                }
            }
        }

        total.round_dp(MONEY_DP)
    }

    /// 低於再訂購點的產品清單
    pub fn low_stock(&self, products: &[Product], warehouse: Option<Uuid>) -> Vec<LowStockEntry> {
        products
            .iter()
            .filter(|p| p.is_active && p.is_stockable() && p.reorder_point > Decimal::ZERO)
            .filter_map(|product| {
                let level = self.get_level(product.id, None, warehouse);
                if level.available <= product.reorder_point {
                    Some(LowStockEntry {
                        product_id: product.id,
                        available: level.available,
                        reorder_point: product.reorder_point,
                        reorder_qty: product.reorder_qty,
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}

/// 批次排序：入庫時間為主鍵，插入序號為決勝鍵
fn sort_fifo(rows: &mut [StockQuant]) {
    rows.sort_by(|a, b| {
        a.incoming_date
            .cmp(&b.incoming_date)
            .then(a.seq.cmp(&b.seq))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use erp_core::{LocationType, ProductType, UnitOfMeasure, UomCategory};

    fn internal_location() -> Location {
        Location::new("Stock", "STOCK", LocationType::Internal)
    }

    fn setup() -> (StockLedger, Uuid, Uuid) {
        let mut ledger = StockLedger::new();
        let location = internal_location();
        let location_id = location.id;
        ledger.register_location(location);
        (ledger, Uuid::new_v4(), location_id)
    }

    #[test]
    fn test_adjust_creates_quant() {
        let (mut ledger, product, location) = setup();

        ledger
            .adjust_quantity(product, location, Decimal::from(100), Some(Decimal::from(10)))
            .unwrap();

        let level = ledger.get_level(product, Some(location), None);
        assert_eq!(level.quantity, Decimal::from(100));
        assert_eq!(level.reserved, Decimal::ZERO);
        assert_eq!(level.available, Decimal::from(100));
    }

    #[test]
    fn test_unknown_location_is_rejected() {
        let mut ledger = StockLedger::new();
        let err = ledger
            .adjust_quantity(Uuid::new_v4(), Uuid::new_v4(), Decimal::ONE, None)
            .unwrap_err();
        assert!(matches!(err, ErpError::LocationNotFound(_)));
    }

    #[test]
    fn test_moving_average_cost() {
        let (mut ledger, product, location) = setup();

        // 100 @ 10，再進 50 @ 16 → (1000 + 800) / 150 = 12
        ledger
            .adjust_quantity(product, location, Decimal::from(100), Some(Decimal::from(10)))
            .unwrap();
        ledger
            .adjust_quantity(product, location, Decimal::from(50), Some(Decimal::from(16)))
            .unwrap();

        let quants = ledger.quants_at(product, location);
        assert_eq!(quants.len(), 1);
        assert_eq!(quants[0].unit_cost, Decimal::from(12));
        assert_eq!(quants[0].quantity, Decimal::from(150));
    }

    #[test]
    fn test_cost_unchanged_on_decrement() {
        let (mut ledger, product, location) = setup();

        ledger
            .adjust_quantity(product, location, Decimal::from(100), Some(Decimal::from(10)))
            .unwrap();
        ledger
            .adjust_quantity(product, location, Decimal::from(-40), None)
            .unwrap();

        let quants = ledger.quants_at(product, location);
        assert_eq!(quants[0].quantity, Decimal::from(60));
        assert_eq!(quants[0].unit_cost, Decimal::from(10));
    }

    #[test]
    fn test_forbid_policy_rejects_overdraw() {
        let (mut ledger, product, location) = setup();

        ledger
            .adjust_quantity(product, location, Decimal::from(30), None)
            .unwrap();

        let err = ledger
            .adjust_quantity(product, location, Decimal::from(-50), None)
            .unwrap_err();

        match err {
            ErpError::InsufficientStock { shortfall, .. } => {
                assert_eq!(shortfall, Decimal::from(20));
            }
            other => panic!("預期 InsufficientStock，得到 {other:?}"),
        }

        // 失敗不得留下部分扣減
        let level = ledger.get_level(product, Some(location), None);
        assert_eq!(level.quantity, Decimal::from(30));
    }

    #[test]
    fn test_allow_policy_goes_negative() {
        let mut ledger = StockLedger::new().with_policy(NegativeStockPolicy::Allow);
        let location = internal_location();
        let location_id = location.id;
        ledger.register_location(location);
        let product = Uuid::new_v4();

        ledger
            .adjust_quantity(product, location_id, Decimal::from(10), None)
            .unwrap();
        ledger
            .adjust_quantity(product, location_id, Decimal::from(-25), None)
            .unwrap();

        let level = ledger.get_level(product, Some(location_id), None);
        assert_eq!(level.quantity, Decimal::from(-15));
    }

    #[test]
    fn test_reserve_is_all_or_nothing() {
        let (mut ledger, product, location) = setup();

        ledger
            .adjust_quantity(product, location, Decimal::from(20), None)
            .unwrap();

        let err = ledger
            .reserve(product, location, Decimal::from(30))
            .unwrap_err();
        match err {
            ErpError::InsufficientStock {
                required,
                available,
                shortfall,
            } => {
                assert_eq!(required, Decimal::from(30));
                assert_eq!(available, Decimal::from(20));
                assert_eq!(shortfall, Decimal::from(10));
            }
            other => panic!("預期 InsufficientStock，得到 {other:?}"),
        }

        // 整筆拒絕，不可留下部分保留
        let level = ledger.get_level(product, Some(location), None);
        assert_eq!(level.reserved, Decimal::ZERO);
    }

    #[test]
    fn test_reserve_consumes_lots_fifo() {
        let (mut ledger, product, location) = setup();

        // 兩個批次（時間戳接近，由插入序號決勝）
        ledger
            .receive_lot(product, location, Decimal::from(10), Decimal::from(5))
            .unwrap();
        ledger
            .receive_lot(product, location, Decimal::from(10), Decimal::from(7))
            .unwrap();

        ledger.reserve(product, location, Decimal::from(15)).unwrap();

        let quants = ledger.quants_at(product, location);
        let oldest = quants.iter().min_by_key(|q| q.seq).unwrap();
        let newest = quants.iter().max_by_key(|q| q.seq).unwrap();
        assert_eq!(oldest.reserved_quantity, Decimal::from(10));
        assert_eq!(newest.reserved_quantity, Decimal::from(5));
    }

    #[test]
    fn test_unreserve_stops_silently() {
        let (mut ledger, product, location) = setup();

        ledger
            .adjust_quantity(product, location, Decimal::from(50), None)
            .unwrap();
        ledger.reserve(product, location, Decimal::from(20)).unwrap();

        // 釋放超過已保留量不是錯誤
        ledger
            .unreserve(product, location, Decimal::from(100))
            .unwrap();

        let level = ledger.get_level(product, Some(location), None);
        assert_eq!(level.reserved, Decimal::ZERO);
        assert_eq!(level.quantity, Decimal::from(50));
    }

    #[test]
    fn test_valuation_skips_non_internal() {
        let mut ledger = StockLedger::new();
        let internal = internal_location();
        let supplier = Location::new("Suppliers", "SUPPLIERS", LocationType::Supplier);
        let internal_id = internal.id;
        let supplier_id = supplier.id;
        ledger.register_location(internal);
        ledger.register_location(supplier);
        let product = Uuid::new_v4();

        ledger
            .adjust_quantity(product, internal_id, Decimal::from(10), Some(Decimal::from(4)))
            .unwrap();
        // 供應商儲位不計入庫存總值與水位
        ledger
            .adjust_quantity(product, supplier_id, Decimal::from(99), Some(Decimal::from(4)))
            .unwrap();

        assert_eq!(ledger.valuation(None), Decimal::from(40));

        let level = ledger.get_level(product, None, None);
        assert_eq!(level.quantity, Decimal::from(10));
    }

    #[test]
    fn test_low_stock_report() {
        let (mut ledger, _, location) = setup();

        let uom = UnitOfMeasure::new("Unit", "pcs", UomCategory::Unit);
        let product = erp_core::Product::new("Beans", ProductType::Stockable, uom.id)
            .with_reorder_rule(Decimal::from(20), Decimal::from(100));

        ledger
            .adjust_quantity(product.id, location, Decimal::from(15), None)
            .unwrap();

        let entries = ledger.low_stock(std::slice::from_ref(&product), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].available, Decimal::from(15));
        assert_eq!(entries[0].reorder_qty, Decimal::from(100));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// 任意操作序列後，每一批次都滿足 0 ≤ reserved ≤ quantity
            #[test]
            fn reservation_bound_holds(ops in prop::collection::vec((0u8..3, 1i64..100), 1..40)) {
                let (mut ledger, product, location) = setup();

                for (op, amount) in ops {
                    let qty = Decimal::from(amount);
                    match op {
                        0 => {
                            let _ = ledger.receive_lot(product, location, qty, Decimal::ONE);
                        }
                        1 => {
                            let _ = ledger.reserve(product, location, qty);
                        }
                        _ => {
                            let _ = ledger.unreserve(product, location, qty);
                        }
                    }

                    for quant in ledger.quants_at(product, location) {
                        prop_assert!(quant.reserved_quantity >= Decimal::ZERO);
                        prop_assert!(quant.reserved_quantity <= quant.quantity);
                    }
                }
            }
        }
    }
}
