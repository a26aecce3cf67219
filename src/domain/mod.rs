// ==========================================
// 石材车间加工系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod order;
pub mod process;
pub mod stock;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use order::{MissingField, OrderStats, WorkshopOrder, WorkshopOrderLine};
pub use process::WorkshopProcess;
pub use stock::{
    LotAvailability, PickingRef, PickingSummary, PickingType, Product, StockLocation, StockLot,
    Warehouse,
};
pub use types::{LocationUsage, OrderState, PickingState, ProcessType, ProductTracking};
