//! 倉庫與儲位
//!
//! 儲位是有向圖上的節點，作為每一筆庫存異動的起點與終點。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 儲位類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationType {
    /// 內部儲位（計入在庫量）
    Internal,
    /// 供應商虛擬儲位
    Supplier,
    /// 客戶虛擬儲位
    Customer,
    /// 盤損儲位
    Inventory,
    /// 生產中轉儲位
    Production,
    /// 在途儲位
    Transit,
}

/// 倉庫
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: Uuid,

    pub name: String,

    pub code: String,

    pub is_active: bool,
}

impl Warehouse {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            code: code.into(),
            is_active: true,
        }
    }
}

/// 儲位
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,

    pub name: String,

    pub code: String,

    /// 所屬倉庫（供應商／客戶等虛擬儲位無倉庫）
    pub warehouse_id: Option<Uuid>,

    /// 上層儲位
    pub parent_id: Option<Uuid>,

    pub location_type: LocationType,

    /// 是否為倉庫預設儲位
    pub is_default: bool,

    pub is_scrap: bool,

    pub is_active: bool,
}

impl Location {
    /// 創建新儲位
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        location_type: LocationType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            code: code.into(),
            warehouse_id: None,
            parent_id: None,
            location_type,
            is_default: false,
            is_scrap: false,
            is_active: true,
        }
    }

    /// 建構器模式：設置所屬倉庫
    pub fn with_warehouse(mut self, warehouse_id: Uuid) -> Self {
        self.warehouse_id = Some(warehouse_id);
        self
    }

    /// 建構器模式：設置上層儲位
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// 建構器模式：設為倉庫預設儲位
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// 是否計入在庫量
    pub fn is_internal(&self) -> bool {
        self.location_type == LocationType::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_location() {
        let warehouse = Warehouse::new("Main Warehouse", "WH");
        let location = Location::new("Stock", "STOCK", LocationType::Internal)
            .with_warehouse(warehouse.id)
            .as_default();

        assert!(location.is_internal());
        assert!(location.is_default);
        assert_eq!(location.warehouse_id, Some(warehouse.id));
    }

    #[test]
    fn test_virtual_locations_are_not_internal() {
        for location_type in [
            LocationType::Supplier,
            LocationType::Customer,
            LocationType::Production,
            LocationType::Transit,
        ] {
            let location = Location::new("Virtual", "VIRT", location_type);
            assert!(!location.is_internal());
        }
    }
}
