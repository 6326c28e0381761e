//! # ERP Core
//!
//! 核心資料模型與類型定義

pub mod adjustment;
pub mod location;
pub mod manufacturing;
pub mod movement;
pub mod product;
pub mod purchasing;
pub mod quant;
pub mod sales;
pub mod totals;

// Re-export 主要類型
pub use adjustment::{AdjustmentState, StockAdjustment, StockAdjustmentLine};
pub use location::{Location, LocationType, Warehouse};
pub use manufacturing::{
    BillOfMaterials, BomLine, BomType, ManufacturingOrder, ManufacturingOrderLine, MoState,
    Priority,
};
pub use movement::{
    MoveState, MoveType, PickingState, PickingType, StockMove, StockPicking, StockPickingLine,
};
pub use product::{Customer, Product, ProductType, UnitOfMeasure, UomCategory, Vendor};
pub use purchasing::{PoState, PurchaseOrder, PurchaseOrderLine, Rfq, RfqLine, RfqState};
pub use quant::StockQuant;
pub use sales::{
    InvoiceState, PaymentMethod, QuotationState, SalesInvoice, SalesInvoiceLine, SalesOrder,
    SalesOrderLine, SalesQuotation, SalesQuotationLine, SoState,
};
pub use totals::{DocumentTotals, TotalsCalculator};

use rust_decimal::Decimal;

/// ERP 錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum ErpError {
    #[error("狀態不允許此操作：{0}")]
    InvalidTransition(String),

    #[error("庫存不足：需求 {required}，可用 {available}，短缺 {shortfall}")]
    InsufficientStock {
        required: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    #[error("已處理過，不可重複執行：{0}")]
    AlreadyProcessed(String),

    #[error("單據已轉換過：{0}")]
    AlreadyConverted(String),

    #[error("找不到儲位：{0}")]
    LocationNotFound(uuid::Uuid),

    #[error("找不到資料：{0}")]
    NotFound(String),

    #[error("無效的數量：{0}")]
    InvalidQuantity(String),

    #[error("缺少必要欄位：{0}")]
    MissingField(String),
}

pub type Result<T> = std::result::Result<T, ErpError>;
