// ==========================================
// 石材车间加工系统 - 引擎层
// ==========================================
// 职责: 加工单状态机、面积/成本派生、完工物化
// 红线: Engine 不拼 SQL，库存系统只经 collaborators 中的 trait 访问
// ==========================================

pub mod collaborators;
pub mod costing;
pub mod dimension;
pub mod error;
pub mod field_schema;
pub mod location_resolver;
pub mod materializer;
pub mod order_state_machine;
pub mod repositories;
pub mod stock_move_builder;

// 重导出核心引擎
pub use collaborators::{
    in_unit_of_work, FieldValues, FinalizeOutcome, FollowUp, FollowUpKind, FollowUpResolution,
    InventoryRegistry, MovementEntity, PickingHeader, SequenceService, StockMovementService,
    UnitOfWork, WarehouseRegistry, WorkshopCollaborators,
};
pub use costing::{CostBreakdown, CostCalculator};
pub use dimension::parse_dimension;
pub use error::{EngineError, EngineResult};
pub use field_schema::{MoveSpec, MovementSchema};
pub use location_resolver::{LocationResolver, ResolvedLocations};
pub use materializer::{MaterializedProduction, ProductionMaterializer};
pub use order_state_machine::{check_transition, CompletedOrder, OrderAction, OrderLifecycleEngine};
pub use repositories::WorkshopRepositories;
pub use stock_move_builder::{BatchRequest, BatchResult, StockMoveBuilder};
