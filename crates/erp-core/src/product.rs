//! 產品與往來對象主檔
//!
//! 核心引擎只讀取這些資料（成本、售價、單位、旗標），不負責維護。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 單位類別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UomCategory {
    Unit,
    Weight,
    Volume,
    Length,
    Time,
}

/// 計量單位
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitOfMeasure {
    pub id: Uuid,

    pub name: String,

    pub symbol: String,

    pub category: UomCategory,

    /// 對同類別基準單位的換算比率（6 位小數）
    pub ratio: Decimal,

    /// 是否為該類別的基準單位
    pub is_base_unit: bool,
}

impl UnitOfMeasure {
    /// 創建新的計量單位（比率預設 1.000000）
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, category: UomCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            symbol: symbol.into(),
            category,
            ratio: Decimal::ONE.round_dp(crate::totals::UOM_RATIO_DP),
            is_base_unit: false,
        }
    }

    /// 建構器模式：設置換算比率
    pub fn with_ratio(mut self, ratio: Decimal) -> Self {
        self.ratio = ratio.round_dp(crate::totals::UOM_RATIO_DP);
        self
    }

    /// 建構器模式：設為基準單位
    pub fn as_base_unit(mut self) -> Self {
        self.is_base_unit = true;
        self
    }
}

/// 產品類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    /// 庫存品（追蹤庫存）
    Stockable,
    /// 消耗品（不追蹤庫存）
    Consumable,
    /// 服務（無庫存，如運費）
    Service,
}

/// 產品主檔
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,

    pub name: String,

    /// 內部編號／SKU（格式 PROD-#####）
    pub internal_reference: Option<String>,

    pub barcode: Option<String>,

    pub product_type: ProductType,

    /// 預設計量單位
    pub uom_id: Uuid,

    /// 標準成本
    pub standard_price: Decimal,

    /// 銷售價格
    pub list_price: Decimal,

    /// 再訂購點
    pub reorder_point: Decimal,

    /// 再訂購量
    pub reorder_qty: Decimal,

    pub can_be_sold: bool,

    pub can_be_purchased: bool,

    pub is_active: bool,
}

impl Product {
    /// 創建新產品
    pub fn new(name: impl Into<String>, product_type: ProductType, uom_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            internal_reference: None,
            barcode: None,
            product_type,
            uom_id,
            standard_price: Decimal::ZERO,
            list_price: Decimal::ZERO,
            reorder_point: Decimal::ZERO,
            reorder_qty: Decimal::ZERO,
            can_be_sold: true,
            can_be_purchased: true,
            is_active: true,
        }
    }

    /// 建構器模式：設置內部編號
    pub fn with_internal_reference(mut self, reference: impl Into<String>) -> Self {
        self.internal_reference = Some(reference.into());
        self
    }

    /// 建構器模式：設置標準成本
    pub fn with_standard_price(mut self, price: Decimal) -> Self {
        self.standard_price = price;
        self
    }

    /// 建構器模式：設置售價
    pub fn with_list_price(mut self, price: Decimal) -> Self {
        self.list_price = price;
        self
    }

    /// 建構器模式：設置再訂購點與再訂購量
    pub fn with_reorder_rule(mut self, reorder_point: Decimal, reorder_qty: Decimal) -> Self {
        self.reorder_point = reorder_point;
        self.reorder_qty = reorder_qty;
        self
    }

    /// 是否為庫存品
    pub fn is_stockable(&self) -> bool {
        self.product_type == ProductType::Stockable
    }
}

/// 客戶主檔（銷售文件的對象）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,

    pub name: String,

    pub email: Option<String>,

    pub phone: Option<String>,

    pub is_active: bool,
}

impl Customer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: None,
            phone: None,
            is_active: true,
        }
    }
}

/// 供應商主檔（採購文件的對象）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: Uuid,

    /// 供應商編號（格式 VND-####）
    pub code: String,

    pub name: String,

    pub email: Option<String>,

    pub phone: Option<String>,

    pub is_active: bool,
}

impl Vendor {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            email: None,
            phone: None,
            is_active: true,
        }
    }
}
