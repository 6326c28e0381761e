//! # ERP Stock
//!
//! 庫存帳引擎：數量帳、保留、過帳與單號序列

pub mod ledger;
pub mod moves;
pub mod sequence;

// Re-export 主要類型
pub use ledger::{LowStockEntry, NegativeStockPolicy, StockLedger, StockLevel};
pub use moves::MoveProcessor;
pub use sequence::SequenceRegistry;
