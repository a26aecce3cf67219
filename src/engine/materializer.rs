// ==========================================
// 石材车间加工系统 - 完工物化
// ==========================================
// 职责: 完工时生成消耗/产出两张移库单
//   消耗: 投入批次 库存库位 → 生产库位
//   产出: 产出批次 生产库位 → 库存库位
// 红线: 先消耗后产出，顺序执行
// 红线: 事务边界由调用方（生命周期引擎）持有
// ==========================================

use crate::config::WorkshopConfig;
use crate::domain::order::{MissingField, WorkshopOrder};
use crate::domain::stock::StockLot;
use crate::engine::collaborators::{InventoryRegistry, WorkshopCollaborators};
use crate::engine::costing::CostCalculator;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::field_schema::MoveSpec;
use crate::engine::location_resolver::LocationResolver;
use crate::engine::stock_move_builder::{BatchRequest, BatchResult, StockMoveBuilder};
use crate::i18n;
use crate::repository::error::RepositoryError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// 物化结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterializedProduction {
    pub consume: BatchResult,
    pub produce: BatchResult,
    pub lot_out: StockLot,
    pub consumed_qty: f64,
    pub produced_qty: f64,
}

// ==========================================
// ProductionMaterializer
// ==========================================
pub struct ProductionMaterializer {
    inventory: Arc<dyn InventoryRegistry>,
    resolver: LocationResolver,
    builder: StockMoveBuilder,
    internal_picking_code: String,
}

impl ProductionMaterializer {
    /// 创建物化器（构造时完成移库字段探测）
    pub fn new(collaborators: &WorkshopCollaborators, config: &WorkshopConfig) -> EngineResult<Self> {
        Ok(Self {
            inventory: collaborators.inventory.clone(),
            resolver: LocationResolver::new(
                collaborators.warehouses.clone(),
                config.production_location_refs.clone(),
            ),
            builder: StockMoveBuilder::new(collaborators.movements.clone(), config.max_follow_up_rounds)?,
            internal_picking_code: config.internal_picking_code.clone(),
        })
    }

    /// 为加工单生成消耗与产出移库
    ///
    /// # 参数
    /// - `order`: 待完工的加工单（投入产品/批次、产出产品必须已设置）
    ///
    /// # 返回
    /// - 两张已完成的移库单与产出批次
    #[instrument(skip(self, order), fields(order = %order.name))]
    pub fn materialize(&self, order: &WorkshopOrder) -> EngineResult<MaterializedProduction> {
        let (product_in_id, lot_in_id, product_out_id) =
            match (order.product_in_id, order.lot_in_id, order.product_out_id) {
                (Some(p_in), Some(lot), Some(p_out)) => (p_in, lot, p_out),
                _ => return Err(EngineError::MissingRequiredFields(order.missing_confirm_fields())),
            };

        let locations = self.resolver.resolve_locations(order.company_id)?;
        let picking_type = self
            .resolver
            .resolve_operation_type(&locations.warehouse, &self.internal_picking_code)?
            .ok_or_else(|| {
                EngineError::Configuration(i18n::t_with_args(
                    "stock.no_internal_operation_type",
                    &[
                        ("warehouse", &locations.warehouse.code),
                        ("code", &self.internal_picking_code),
                    ],
                ))
            })?;

        let lot_in = self
            .inventory
            .find_lot(lot_in_id)?
            .ok_or_else(|| RepositoryError::not_found("StockLot", lot_in_id))?;
        let product_in = self
            .inventory
            .find_product(product_in_id)?
            .ok_or_else(|| RepositoryError::not_found("Product", product_in_id))?;
        let product_out = self
            .inventory
            .find_product(product_out_id)?
            .ok_or_else(|| RepositoryError::not_found("Product", product_out_id))?;

        let lot_out_name = CostCalculator::output_lot_name(Some(&lot_in.name), order.process_code.as_deref())
            .ok_or_else(|| EngineError::MissingRequiredFields(vec![MissingField::InputProductOrLot]))?;

        let produced_qty = CostCalculator::resolve_output_qty(order.qty_out, order.qty_in);
        let consumed_qty = CostCalculator::resolve_input_qty(order.qty_in, produced_qty);

        let lot_out = self
            .inventory
            .find_or_create_lot(&lot_out_name, product_out_id, order.company_id)?;

        let stock_id = locations.stock_location.location_id;
        let production_id = locations.production_location.location_id;

        let consume = self.builder.build_batch(&BatchRequest {
            picking_type_id: picking_type.picking_type_id,
            origin: Some(order.name.clone()),
            spec: MoveSpec {
                product_id: product_in_id,
                uom_id: product_in.uom_id,
                quantity: consumed_qty,
                location_id: stock_id,
                location_dest_id: production_id,
                company_id: order.company_id,
                description: format!("{} [{}]", order.name, lot_in.name),
            },
            lot_id: Some(lot_in.lot_id),
        })?;

        let produce = self.builder.build_batch(&BatchRequest {
            picking_type_id: picking_type.picking_type_id,
            origin: Some(order.name.clone()),
            spec: MoveSpec {
                product_id: product_out_id,
                uom_id: product_out.uom_id,
                quantity: produced_qty,
                location_id: production_id,
                location_dest_id: stock_id,
                company_id: order.company_id,
                description: format!("{} [{}]", order.name, lot_out.name),
            },
            lot_id: Some(lot_out.lot_id),
        })?;

        info!(
            consume = %consume.picking.name,
            produce = %produce.picking.name,
            lot_out = %lot_out.name,
            consumed_qty,
            produced_qty,
            "完工物化完成"
        );

        Ok(MaterializedProduction {
            consume,
            produce,
            lot_out,
            consumed_qty,
            produced_qty,
        })
    }
}
