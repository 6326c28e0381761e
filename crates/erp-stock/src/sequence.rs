//! 單號序列
//!
//! 每一前綴一個遞增計數器，取號即累加後格式化；單號嚴格遞增、
//! 永不重複（取消的文件也不回收單號）。

use std::collections::HashMap;

/// 單號序列註冊表
#[derive(Debug, Default)]
pub struct SequenceRegistry {
    counters: HashMap<String, u64>,
}

impl SequenceRegistry {
    /// 創建新的註冊表
    pub fn new() -> Self {
        Self {
            counters: HashMap::new(),
        }
    }

    /// 取下一個單號（補零到指定位數）
    pub fn next(&mut self, prefix: &str, width: usize) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        *counter += 1;
        format!("{}-{:0width$}", prefix, counter, width = width)
    }

    /// 目前已核發的最大序號
    pub fn current(&self, prefix: &str) -> u64 {
        self.counters.get(prefix).copied().unwrap_or(0)
    }

    /// 庫存異動單號（SM-######）
    pub fn next_stock_move(&mut self) -> String {
        self.next("SM", 6)
    }

    /// 製造工單單號（MO-#####）
    pub fn next_manufacturing_order(&mut self) -> String {
        self.next("MO", 5)
    }

    /// 採購訂單單號（PO-#####）
    pub fn next_purchase_order(&mut self) -> String {
        self.next("PO", 5)
    }

    /// 銷售訂單單號（SO-#####）
    pub fn next_sales_order(&mut self) -> String {
        self.next("SO", 5)
    }

    /// 報價單單號（SQ-#####）
    pub fn next_quotation(&mut self) -> String {
        self.next("SQ", 5)
    }

    /// 發票單號（INV-#####）
    pub fn next_invoice(&mut self) -> String {
        self.next("INV", 5)
    }

    /// 詢價單單號（RFQ-#####）
    pub fn next_rfq(&mut self) -> String {
        self.next("RFQ", 5)
    }

    /// 盤點單單號（ADJ-#####）
    pub fn next_adjustment(&mut self) -> String {
        self.next("ADJ", 5)
    }

    /// 產品內部編號（PROD-#####）
    pub fn next_product(&mut self) -> String {
        self.next("PROD", 5)
    }

    /// 供應商編號（VND-####）
    pub fn next_vendor(&mut self) -> String {
        self.next("VND", 4)
    }

    /// 揀貨單單號（IN-#####／OUT-#####／INT-#####）
    pub fn next_picking(&mut self, picking_type: erp_core::PickingType) -> String {
        self.next(picking_type.sequence_prefix(), 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erp_core::PickingType;

    #[test]
    fn test_sequence_is_monotonic() {
        let mut registry = SequenceRegistry::new();
        assert_eq!(registry.next_sales_order(), "SO-00001");
        assert_eq!(registry.next_sales_order(), "SO-00002");
        assert_eq!(registry.next_sales_order(), "SO-00003");
    }

    #[test]
    fn test_prefixes_are_independent() {
        let mut registry = SequenceRegistry::new();
        assert_eq!(registry.next_sales_order(), "SO-00001");
        assert_eq!(registry.next_purchase_order(), "PO-00001");
        assert_eq!(registry.next_sales_order(), "SO-00002");
        assert_eq!(registry.current("SO"), 2);
        assert_eq!(registry.current("PO"), 1);
    }

    #[test]
    fn test_zero_padding_widths() {
        let mut registry = SequenceRegistry::new();
        assert_eq!(registry.next_stock_move(), "SM-000001");
        assert_eq!(registry.next_vendor(), "VND-0001");
        assert_eq!(registry.next_invoice(), "INV-00001");
        assert_eq!(registry.next_picking(PickingType::Outgoing), "OUT-00001");
    }

    #[test]
    fn test_numbers_are_never_reused() {
        let mut registry = SequenceRegistry::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(registry.next_rfq()));
        }
    }
}
