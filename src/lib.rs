//! # ERP
//!
//! 小型企業 ERP 引擎：文件生命週期（報價 → 訂單 → 出貨 → 發票 → 收款、
//! 詢價 → 採購 → 收貨 → 對帳 → 付款、製造工單）與庫存帳。
//!
//! 本 crate 是聚合入口，實際邏輯在各子 crate：
//! - `erp-core`：文件模型、金額計算、錯誤類型
//! - `erp-stock`：庫存帳、過帳、單號序列
//! - `erp-flow`：狀態轉換與流程服務

pub use erp_core as core;
pub use erp_flow as flow;
pub use erp_stock as stock;

pub use erp_core::{ErpError, Result};
