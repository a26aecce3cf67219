// ==========================================
// 石材车间加工系统 - 库存领域模型
// ==========================================
// 用途: 仓库/库位/作业类型/批次/移库单的只读视图
// 说明: 这些实体由外部库存系统拥有，核心只通过标识引用
// ==========================================

use crate::domain::types::{LocationUsage, PickingState, ProductTracking};
use serde::{Deserialize, Serialize};

/// 产品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: i64,
    pub name: String,
    pub default_code: Option<String>,
    pub tracking: ProductTracking,
    pub uom_id: Option<i64>,
}

impl Product {
    pub fn is_lot_tracked(&self) -> bool {
        self.tracking == ProductTracking::Lot
    }
}

/// 库位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLocation {
    pub location_id: i64,
    pub name: String,
    pub usage: LocationUsage,
    pub company_id: Option<i64>, // None 表示全局共享
    pub xml_ref: Option<String>, // 全局引用名，例如 stock.location_production
    pub active: bool,
}

/// 仓库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub warehouse_id: i64,
    pub name: String,
    pub code: String,
    pub company_id: i64,
    pub lot_stock_id: Option<i64>, // 默认库存库位
}

/// 作业类型（内部调拨/收货/发货…）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickingType {
    pub picking_type_id: i64,
    pub name: String,
    pub code: String,
    pub sequence_code: String,
    pub warehouse_id: Option<i64>,
    pub company_id: Option<i64>,
}

/// 批次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLot {
    pub lot_id: i64,
    pub name: String,
    pub product_id: i64,
    pub company_id: Option<i64>,
}

/// 可用批次：内部库位上数量为正的库存按批次汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotAvailability {
    pub lot_id: i64,
    pub name: String,
    pub qty: f64,
}

/// 移库单引用（创建后返回）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickingRef {
    pub picking_id: i64,
    pub name: String,
}

/// 移库单摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickingSummary {
    pub picking_id: i64,
    pub name: String,
    pub picking_type_id: i64,
    pub location_id: i64,
    pub location_dest_id: i64,
    pub origin: Option<String>,
    pub state: PickingState,
}
