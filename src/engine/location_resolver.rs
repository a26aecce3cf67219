// ==========================================
// 石材车间加工系统 - 库位/作业类型解析
// ==========================================
// 优先级:
// - 仓库: 公司唯一仓库（多个时取最小 id）
// - 库存库位: 仓库默认库存库位
// - 生产库位: 公司自有生产库位 → 配置中的全局引用（按声明顺序）
// - 作业类型: 仓库范围 → 公司范围
// ==========================================

use crate::domain::stock::{PickingType, StockLocation, Warehouse};
use crate::engine::collaborators::WarehouseRegistry;
use crate::engine::error::{EngineError, EngineResult};
use crate::i18n;
use std::sync::Arc;
use tracing::{debug, instrument};

/// 解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocations {
    pub warehouse: Warehouse,
    pub stock_location: StockLocation,
    pub production_location: StockLocation,
}

// ==========================================
// LocationResolver
// ==========================================
pub struct LocationResolver {
    registry: Arc<dyn WarehouseRegistry>,
    production_location_refs: Vec<String>, // 全局生产库位引用（按优先级）
}

impl LocationResolver {
    pub fn new(registry: Arc<dyn WarehouseRegistry>, production_location_refs: Vec<String>) -> Self {
        Self {
            registry,
            production_location_refs,
        }
    }

    /// 解析公司的仓库、库存库位与生产库位
    #[instrument(skip(self))]
    pub fn resolve_locations(&self, company_id: i64) -> EngineResult<ResolvedLocations> {
        let warehouse = self.registry.warehouse_for_company(company_id)?.ok_or_else(|| {
            EngineError::Configuration(i18n::t_with_args(
                "stock.no_warehouse",
                &[("company", &company_id.to_string())],
            ))
        })?;

        let stock_location = match warehouse.lot_stock_id {
            Some(id) => self.registry.find_location(id)?,
            None => None,
        }
        .ok_or_else(|| {
            EngineError::Configuration(i18n::t_with_args(
                "stock.no_stock_location",
                &[("warehouse", &warehouse.code)],
            ))
        })?;

        let production_location = self.resolve_production_location(company_id)?;

        debug!(
            warehouse = %warehouse.code,
            stock_location = stock_location.location_id,
            production_location = production_location.location_id,
            "库位解析完成"
        );

        Ok(ResolvedLocations {
            warehouse,
            stock_location,
            production_location,
        })
    }

    fn resolve_production_location(&self, company_id: i64) -> EngineResult<StockLocation> {
        if let Some(loc) = self.registry.production_location_for_company(company_id)? {
            return Ok(loc);
        }

        for xml_ref in &self.production_location_refs {
            if let Some(loc) = self.registry.find_location_by_ref(xml_ref)? {
                debug!(xml_ref = %xml_ref, "使用全局生产库位");
                return Ok(loc);
            }
        }

        Err(EngineError::Configuration(i18n::t_with_args(
            "stock.no_production_location",
            &[("company", &company_id.to_string())],
        )))
    }

    /// 查找作业类型：先仓库范围，再公司范围
    ///
    /// # 返回
    /// - None 由调用方决定是否致命
    pub fn resolve_operation_type(
        &self,
        warehouse: &Warehouse,
        code: &str,
    ) -> EngineResult<Option<PickingType>> {
        if let Some(pt) = self
            .registry
            .operation_type_for_warehouse(warehouse.warehouse_id, code)?
        {
            return Ok(Some(pt));
        }
        Ok(self
            .registry
            .operation_type_for_company(warehouse.company_id, code)?)
    }
}
