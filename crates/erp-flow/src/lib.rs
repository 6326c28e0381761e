//! # ERP Flow
//!
//! 文件生命週期引擎：銷售、採購、製造與倉儲作業的狀態轉換
//! 以及對應的庫存帳過帳。每個服務只在狀態檢查全部通過後改帳。

pub mod adjustment;
pub mod manufacturing;
pub mod picking;
pub mod purchasing;
pub mod sales;

// Re-export 主要服務
pub use adjustment::AdjustmentService;
pub use manufacturing::{BomService, ComponentAvailability, ManufacturingService};
pub use picking::PickingService;
pub use purchasing::{PurchasingService, VendorBill};
pub use sales::SalesService;
