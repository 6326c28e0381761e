//! 文件金額計算
//!
//! 所有表頭金額一律由明細重新摺疊計算，不可獨立覆寫。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 金額欄位小數位數
pub const MONEY_DP: u32 = 2;

/// 庫存／明細數量小數位數
pub const QTY_DP: u32 = 2;

/// BOM 元件與工單明細數量小數位數
pub const COMPONENT_QTY_DP: u32 = 4;

/// 單位換算比率小數位數
pub const UOM_RATIO_DP: u32 = 6;

/// 加值稅率（固定 11%）
pub fn tax_rate() -> Decimal {
    Decimal::new(11, 2)
}

/// 文件金額合計
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    /// 未稅金額
    pub untaxed_amount: Decimal,

    /// 稅額
    pub tax_amount: Decimal,

    /// 表頭折扣金額
    pub discount_amount: Decimal,

    /// 總計
    pub total_amount: Decimal,
}

/// 金額計算器（純函數，重算不累積）
pub struct TotalsCalculator;

impl TotalsCalculator {
    /// 明細小計：數量 × 單價 × (1 − 折扣%/100)
    pub fn line_subtotal(
        quantity: Decimal,
        unit_price: Decimal,
        discount_percent: Decimal,
    ) -> Decimal {
        let base = quantity * unit_price;
        let discount = base * (discount_percent / Decimal::ONE_HUNDRED);
        (base - discount).round_dp(MONEY_DP)
    }

    /// 由明細小計彙總文件金額
    pub fn compute(line_subtotals: &[Decimal], discount_amount: Decimal) -> DocumentTotals {
        let untaxed: Decimal = line_subtotals.iter().copied().sum();
        let untaxed = untaxed.round_dp(MONEY_DP);
        let tax = (untaxed * tax_rate()).round_dp(MONEY_DP);
        let total = (untaxed + tax - discount_amount).round_dp(MONEY_DP);

        DocumentTotals {
            untaxed_amount: untaxed,
            tax_amount: tax,
            discount_amount,
            total_amount: total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_subtotal_with_discount() {
        // 10 × 100 × (1 − 10%) = 900
        let subtotal = TotalsCalculator::line_subtotal(
            Decimal::from(10),
            Decimal::from(100),
            Decimal::from(10),
        );
        assert_eq!(subtotal, Decimal::from(900));
    }

    #[test]
    fn test_compute_totals() {
        let totals = TotalsCalculator::compute(
            &[Decimal::from(900), Decimal::from(100)],
            Decimal::from(50),
        );

        assert_eq!(totals.untaxed_amount, Decimal::from(1000));
        // 1000 × 0.11 = 110
        assert_eq!(totals.tax_amount, Decimal::from(110));
        // 1000 + 110 − 50 = 1060
        assert_eq!(totals.total_amount, Decimal::from(1060));
    }

    #[test]
    fn test_compute_is_idempotent() {
        let subtotals = vec![Decimal::new(12345, 2), Decimal::new(6789, 2)];
        let first = TotalsCalculator::compute(&subtotals, Decimal::ZERO);
        let second = TotalsCalculator::compute(&subtotals, Decimal::ZERO);
        assert_eq!(first, second);
    }

    #[test]
    fn test_money_rounding_two_places() {
        // 3 × 0.333 = 0.999 → 1.00
        let subtotal = TotalsCalculator::line_subtotal(
            Decimal::from(3),
            Decimal::new(333, 3),
            Decimal::ZERO,
        );
        assert_eq!(subtotal, Decimal::new(100, 2));
    }

    #[test]
    fn test_empty_lines_yield_zero() {
        let totals = TotalsCalculator::compute(&[], Decimal::ZERO);
        assert_eq!(totals.untaxed_amount, Decimal::ZERO);
        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.total_amount, Decimal::ZERO);
    }
}
