// ==========================================
// 石材车间加工系统 - 外部协作服务 Trait
// ==========================================
// 职责: 定义核心所依赖的外部服务（序列号/库存/移库/仓库/事务）
// 说明: Engine 层定义 trait，Repository 层提供 SQLite 实现
// 红线: Engine 不拼 SQL，只通过这些 trait 访问库存系统
// ==========================================

use crate::domain::stock::{
    LotAvailability, PickingRef, PickingType, Product, StockLocation, StockLot, Warehouse,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// 字段名 → 值 的写入载荷（字段名来自实时探测）
pub type FieldValues = serde_json::Map<String, JsonValue>;

// ==========================================
// 移库实体与完成结果
// ==========================================

/// 可探测字段的移库实体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementEntity {
    Move,     // 库存移动
    MoveLine, // 移动明细行
}

impl MovementEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementEntity::Move => "stock_move",
            MovementEntity::MoveLine => "stock_move_line",
        }
    }
}

impl fmt::Display for MovementEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 移库单表头
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickingHeader {
    pub picking_type_id: i64,
    pub location_id: i64,
    pub location_dest_id: i64,
    pub origin: Option<String>,
    pub company_id: i64,
}

/// 后续确认类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpKind {
    Backorder,         // 是否创建欠单
    ImmediateTransfer, // 是否按需求量直接完成
}

/// 完成时返回的后续确认步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub kind: FollowUpKind,
    pub picking_id: i64,
    pub payload: JsonValue,
}

/// 完成结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FinalizeOutcome {
    Finalized,
    NeedsFollowUp(FollowUp),
}

/// 后续确认的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpResolution {
    NoBackorder,      // 不创建欠单
    ConfirmImmediate, // 按需求量直接完成
}

impl FollowUpResolution {
    /// 无人值守批处理的固定选择
    pub fn unattended(kind: FollowUpKind) -> Self {
        match kind {
            FollowUpKind::Backorder => FollowUpResolution::NoBackorder,
            FollowUpKind::ImmediateTransfer => FollowUpResolution::ConfirmImmediate,
        }
    }
}

// ==========================================
// 协作服务 Trait
// ==========================================

/// 序列号服务
pub trait SequenceService: Send + Sync {
    /// 取下一个编号；序列未定义时返回 None
    fn next(&self, code: &str) -> RepositoryResult<Option<String>>;
}

/// 批次/库存登记服务
pub trait InventoryRegistry: Send + Sync {
    /// 批次在所有内部库位上的在手数量
    fn on_hand_qty(&self, lot_id: i64) -> RepositoryResult<f64>;

    fn find_lot(&self, lot_id: i64) -> RepositoryResult<Option<StockLot>>;

    fn find_product(&self, product_id: i64) -> RepositoryResult<Option<Product>>;

    /// 产品在内部库位上数量为正的批次（按批次汇总）
    fn available_lots(&self, product_id: i64) -> RepositoryResult<Vec<LotAvailability>>;

    /// 按 (批次号, 产品, 公司) 查找，不存在则创建
    fn find_or_create_lot(
        &self,
        name: &str,
        product_id: i64,
        company_id: i64,
    ) -> RepositoryResult<StockLot>;
}

/// 移库持久化服务
///
/// 字段命名随库存系统版本变化，调用方先通过 `describe_fields` 探测，
/// 再以探测到的字段名构造 `FieldValues`
pub trait StockMovementService: Send + Sync {
    /// 返回实体当前可写的字段名
    fn describe_fields(&self, entity: MovementEntity) -> RepositoryResult<Vec<String>>;

    fn create_picking(&self, header: &PickingHeader) -> RepositoryResult<PickingRef>;

    fn create_move(&self, values: &FieldValues) -> RepositoryResult<i64>;

    /// 确认移库单（离开草稿态后才能预留）
    fn confirm_picking(&self, picking_id: i64) -> RepositoryResult<()>;

    /// 按源库位预留数量
    fn reserve_picking(&self, picking_id: i64) -> RepositoryResult<()>;

    fn list_moves(&self, picking_id: i64) -> RepositoryResult<Vec<i64>>;

    fn list_move_lines(&self, picking_id: i64) -> RepositoryResult<Vec<i64>>;

    fn create_move_line(&self, values: &FieldValues) -> RepositoryResult<i64>;

    fn write_move_line(&self, line_id: i64, values: &FieldValues) -> RepositoryResult<()>;

    /// 完成移库单，可能返回后续确认步骤
    fn validate_picking(&self, picking_id: i64) -> RepositoryResult<FinalizeOutcome>;

    fn resolve_follow_up(
        &self,
        follow_up: &FollowUp,
        resolution: FollowUpResolution,
    ) -> RepositoryResult<FinalizeOutcome>;

    /// 底层强制完成单个移动（绕过移库单校验流程）
    fn force_complete_move(&self, move_id: i64) -> RepositoryResult<()>;
}

/// 仓库/库位/作业类型登记服务
pub trait WarehouseRegistry: Send + Sync {
    fn warehouse_for_company(&self, company_id: i64) -> RepositoryResult<Option<Warehouse>>;

    fn find_location(&self, location_id: i64) -> RepositoryResult<Option<StockLocation>>;

    /// 按全局引用名查找库位，例如 stock.location_production
    fn find_location_by_ref(&self, xml_ref: &str) -> RepositoryResult<Option<StockLocation>>;

    /// 公司自有的生产虚拟库位
    fn production_location_for_company(
        &self,
        company_id: i64,
    ) -> RepositoryResult<Option<StockLocation>>;

    fn operation_type_for_warehouse(
        &self,
        warehouse_id: i64,
        code: &str,
    ) -> RepositoryResult<Option<PickingType>>;

    fn operation_type_for_company(
        &self,
        company_id: i64,
        code: &str,
    ) -> RepositoryResult<Option<PickingType>>;
}

/// 事务边界
pub trait UnitOfWork: Send + Sync {
    fn begin(&self) -> RepositoryResult<()>;
    fn commit(&self) -> RepositoryResult<()>;
    fn rollback(&self) -> RepositoryResult<()>;
}

/// 在一个事务中执行 `f`：成功提交，失败回滚后原样返回错误
pub fn in_unit_of_work<T, E>(
    unit_of_work: &dyn UnitOfWork,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<RepositoryError>,
{
    unit_of_work.begin()?;
    match f() {
        Ok(value) => {
            unit_of_work.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rb) = unit_of_work.rollback() {
                warn!(error = %rb, "事务回滚失败");
            }
            Err(e)
        }
    }
}

// ==========================================
// 协作服务聚合
// ==========================================

/// 加工单生命周期所需的外部服务集合
#[derive(Clone)]
pub struct WorkshopCollaborators {
    pub sequences: Arc<dyn SequenceService>,
    pub inventory: Arc<dyn InventoryRegistry>,
    pub movements: Arc<dyn StockMovementService>,
    pub warehouses: Arc<dyn WarehouseRegistry>,
    pub unit_of_work: Arc<dyn UnitOfWork>,
}
