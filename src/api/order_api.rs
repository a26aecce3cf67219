// ==========================================
// 石材车间加工系统 - 加工单 API
// ==========================================
// 职责: 加工单增删改查、批量下单、状态动作、规格明细、看板统计、审计查询
// 红线: 派生字段（面积/成本/产出批次号）每次写入前重算
// 红线: 完工后工艺与物化输入（产品/批次/数量）不可变更
// 红线: 写入与其审计记录在同一事务内
// ==========================================

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::config::WorkshopConfig;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::order::{OrderStats, WorkshopOrder, WorkshopOrderLine};
use crate::domain::process::WorkshopProcess;
use crate::domain::stock::LotAvailability;
use crate::domain::types::{OrderState, ProcessType};
use crate::engine::collaborators::{
    in_unit_of_work, InventoryRegistry, SequenceService, UnitOfWork, WorkshopCollaborators,
};
use crate::engine::costing::CostCalculator;
use crate::engine::order_state_machine::{CompletedOrder, OrderLifecycleEngine};
use crate::engine::repositories::WorkshopRepositories;
use crate::i18n;

// ==========================================
// 请求结构
// ==========================================

/// 加工单修改载荷（None 表示不修改该字段）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderPatch {
    pub process_id: Option<i64>,
    pub product_in_id: Option<i64>,
    pub lot_in_id: Option<i64>,
    pub qty_in: Option<f64>,
    pub product_out_id: Option<i64>,
    pub qty_out: Option<f64>,
    pub format_width: Option<String>,
    pub format_height: Option<String>,
    pub format_qty: Option<i32>,
    pub labor_cost: Option<f64>,
    pub notes: Option<String>,
    pub user_id: Option<String>,
    pub date_planned: Option<NaiveDateTime>,
}

/// 新建加工单请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub process_id: i64,
    pub company_id: i64,
    #[serde(flatten)]
    pub details: OrderPatch,
}

/// 规格明细写入载荷
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineInput {
    pub product_id: Option<i64>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub qty: Option<i32>,
}

fn differs<T: PartialEq + Copy>(requested: Option<T>, current: Option<T>) -> bool {
    requested.map_or(false, |value| Some(value) != current)
}

/// 载荷是否改动物化输入（投入/产出产品、投入批次、数量）
fn touches_production_inputs(order: &WorkshopOrder, patch: &OrderPatch) -> bool {
    differs(patch.product_in_id, order.product_in_id)
        || differs(patch.lot_in_id, order.lot_in_id)
        || differs(patch.qty_in, order.qty_in)
        || differs(patch.product_out_id, order.product_out_id)
        || differs(patch.qty_out, order.qty_out)
}

// ==========================================
// WorkshopOrderApi
// ==========================================
pub struct WorkshopOrderApi {
    repos: WorkshopRepositories,
    lifecycle: Arc<OrderLifecycleEngine>,
    sequences: Arc<dyn SequenceService>,
    inventory: Arc<dyn InventoryRegistry>,
    unit_of_work: Arc<dyn UnitOfWork>,
    order_sequence_code: String,
    default_order_name: String,
}

impl WorkshopOrderApi {
    pub fn new(
        repos: WorkshopRepositories,
        lifecycle: Arc<OrderLifecycleEngine>,
        collaborators: &WorkshopCollaborators,
        config: &WorkshopConfig,
    ) -> Self {
        Self {
            repos,
            lifecycle,
            sequences: collaborators.sequences.clone(),
            inventory: collaborators.inventory.clone(),
            unit_of_work: collaborators.unit_of_work.clone(),
            order_sequence_code: config.order_sequence_code.clone(),
            default_order_name: config.default_order_name.clone(),
        }
    }

    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn load_order(&self, order_id: i64) -> ApiResult<WorkshopOrder> {
        self.repos
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("WorkshopOrder(id={})不存在", order_id)))
    }

    fn load_process(&self, process_id: i64) -> ApiResult<WorkshopProcess> {
        self.repos
            .process_repo
            .find_by_id(process_id)?
            .ok_or_else(|| ApiError::NotFound(format!("WorkshopProcess(id={})不存在", process_id)))
    }

    fn audit(&self, log: ActionLog) -> ApiResult<()> {
        self.repos.action_log_repo.insert(&log)?;
        Ok(())
    }

    /// 把载荷应用到加工单并重算派生字段
    ///
    /// `process_changed` 为 true 时（新建或更换工艺），表面加工工艺把投入数量带到产出数量
    fn apply_patch(&self, order: &mut WorkshopOrder, patch: &OrderPatch, mut process_changed: bool) -> ApiResult<()> {
        // ----- 工艺 -----
        if let Some(process_id) = patch.process_id {
            if process_id != order.process_id {
                if order.is_process_locked() {
                    return Err(ApiError::BusinessRuleViolation(i18n::t("order.process_locked")));
                }
                order.process_id = process_id;
                process_changed = true;
            }
        }
        let process = self.load_process(order.process_id)?;

        // 完工后移库单与产出批次已生成，投入/产出须保持一致
        if order.is_production_locked() && touches_production_inputs(order, patch) {
            return Err(ApiError::BusinessRuleViolation(i18n::t("order.production_locked")));
        }

        // ----- 投入产品 -----
        let product_changed = match patch.product_in_id {
            Some(product_id) => {
                let product = self
                    .inventory
                    .find_product(product_id)?
                    .ok_or_else(|| ApiError::NotFound(format!("Product(id={})不存在", product_id)))?;
                if !product.is_lot_tracked() {
                    return Err(ApiError::InvalidInput(i18n::t_with_args(
                        "order.product_not_lot_tracked",
                        &[("product", &product.name)],
                    )));
                }
                let changed = order.product_in_id != Some(product_id);
                order.product_in_id = Some(product_id);
                changed
            }
            None => false,
        };

        // ----- 投入批次 -----
        let mut lot_changed = false;
        if let Some(lot_id) = patch.lot_in_id {
            lot_changed = order.lot_in_id != Some(lot_id);
            order.lot_in_id = Some(lot_id);
        }
        if let Some(lot_id) = order.lot_in_id {
            if lot_changed || product_changed {
                let lot = self
                    .inventory
                    .find_lot(lot_id)?
                    .ok_or_else(|| ApiError::NotFound(format!("StockLot(id={})不存在", lot_id)))?;
                if let Some(product_id) = order.product_in_id {
                    if lot.product_id != product_id {
                        return Err(ApiError::InvalidInput(i18n::t_with_args(
                            "order.lot_product_mismatch",
                            &[("lot", &lot.name)],
                        )));
                    }
                }
                order.lot_in_name = Some(lot.name);
            }
        }

        // ----- 数量 -----
        match patch.qty_in {
            Some(qty) if qty < 0.0 => {
                return Err(ApiError::InvalidInput(format!("投入数量不能为负: {}", qty)))
            }
            Some(qty) => order.qty_in = Some(qty),
            None if lot_changed => {
                if let Some(lot_id) = order.lot_in_id {
                    let on_hand = self.inventory.on_hand_qty(lot_id)?;
                    debug!(lot_id, on_hand, "按批次在手数量带出投入数量");
                    order.qty_in = Some(on_hand);
                }
            }
            None => {}
        }
        if let Some(qty) = patch.qty_out {
            if qty < 0.0 {
                return Err(ApiError::InvalidInput(format!("产出数量不能为负: {}", qty)));
            }
            order.qty_out = Some(qty);
        }

        // ----- 产出与规格 -----
        if let Some(product_id) = patch.product_out_id {
            order.product_out_id = Some(product_id);
        }
        if let Some(width) = &patch.format_width {
            order.format_width = Some(width.clone());
        }
        if let Some(height) = &patch.format_height {
            order.format_height = Some(height.clone());
        }
        if let Some(qty) = patch.format_qty {
            if qty < 0 {
                return Err(ApiError::InvalidInput(format!("片数不能为负: {}", qty)));
            }
            order.format_qty = qty;
        }

        // ----- 其他 -----
        if let Some(labor) = patch.labor_cost {
            order.labor_cost = Some(labor);
        }
        if let Some(notes) = &patch.notes {
            order.notes = Some(notes.clone());
        }
        if let Some(user) = &patch.user_id {
            order.user_id = Some(user.clone());
        }
        if let Some(planned) = patch.date_planned {
            order.date_planned = Some(planned);
        }

        if process_changed && process.process_type == ProcessType::Finish && patch.qty_out.is_none() {
            order.qty_out = order.qty_in;
        }

        CostCalculator::recompute(order, Some(&process));
        Ok(())
    }

    // ==========================================
    // 加工单维护
    // ==========================================

    fn in_unit_of_work<T>(&self, f: impl FnOnce() -> ApiResult<T>) -> ApiResult<T> {
        in_unit_of_work(self.unit_of_work.as_ref(), f)
    }

    /// 取参考号、应用载荷、插入并审计（调用方持有事务）
    fn insert_order(&self, request: &CreateOrderRequest, actor: &str) -> ApiResult<WorkshopOrder> {
        let name = self
            .sequences
            .next(&self.order_sequence_code)?
            .unwrap_or_else(|| self.default_order_name.clone());

        let mut order = WorkshopOrder::new_draft(name, request.process_id, request.company_id, Self::now());
        self.apply_patch(&mut order, &request.details, true)?;
        order.order_id = self.repos.order_repo.insert(&order)?;

        self.audit(
            ActionLog::now(Some(order.order_id), ActionType::CreateOrder, actor).with_payload(json!({
                "name": order.name,
                "process_id": order.process_id,
                "lot_in": order.lot_in_name,
                "qty_in": order.qty_in,
            })),
        )?;
        Ok(order)
    }

    /// 新建加工单
    ///
    /// 参考号取自序列 `order_sequence_code`，序列未定义时使用默认名称
    pub fn create_order(&self, request: &CreateOrderRequest, actor: &str) -> ApiResult<WorkshopOrder> {
        let order = self.in_unit_of_work(|| self.insert_order(request, actor))?;
        info!(order = %order.name, actor, "新建加工单");
        Ok(order)
    }

    /// 批量新建加工单（购物车下单）
    ///
    /// 全部成功才提交；任一失败则整批回滚，参考号也不消耗
    pub fn create_orders(&self, requests: &[CreateOrderRequest], actor: &str) -> ApiResult<Vec<WorkshopOrder>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let orders = self.in_unit_of_work(|| {
            requests
                .iter()
                .map(|request| self.insert_order(request, actor))
                .collect::<ApiResult<Vec<_>>>()
        })?;
        info!(count = orders.len(), actor, "批量新建加工单");
        Ok(orders)
    }

    /// 修改加工单（只改载荷中出现的字段，随后重算）
    pub fn update_order(&self, order_id: i64, patch: &OrderPatch, actor: &str) -> ApiResult<WorkshopOrder> {
        let mut order = self.load_order(order_id)?;
        self.apply_patch(&mut order, patch, false)?;
        order.updated_at = Self::now();

        self.in_unit_of_work(|| {
            self.repos.order_repo.update(&order)?;
            self.audit(
                ActionLog::now(Some(order_id), ActionType::UpdateOrder, actor)
                    .with_payload(serde_json::to_value(patch).unwrap_or_default()),
            )
        })?;
        Ok(order)
    }

    pub fn get_order(&self, order_id: i64) -> ApiResult<WorkshopOrder> {
        self.load_order(order_id)
    }

    pub fn list_orders(&self, state: Option<OrderState>) -> ApiResult<Vec<WorkshopOrder>> {
        Ok(self.repos.order_repo.list(state)?)
    }

    /// 删除加工单（仅草稿或已取消），明细随表头级联删除
    pub fn delete_order(&self, order_id: i64, actor: &str) -> ApiResult<()> {
        let order = self.load_order(order_id)?;
        if !matches!(order.state, OrderState::Draft | OrderState::Cancel) {
            return Err(ApiError::BusinessRuleViolation(i18n::t_with_args(
                "order.delete_not_allowed",
                &[("state", order.state.to_db_str())],
            )));
        }

        self.in_unit_of_work(|| {
            self.audit(
                ActionLog::now(Some(order_id), ActionType::DeleteOrder, actor)
                    .with_detail(format!("删除加工单 {}", order.name)),
            )?;
            self.repos.order_repo.delete(order_id)?;
            self.repos.action_log_repo.detach_order(order_id)?;
            Ok(())
        })?;
        info!(order = %order.name, actor, "删除加工单");
        Ok(())
    }

    // ==========================================
    // 状态动作
    // ==========================================

    pub fn confirm_order(&self, order_id: i64, actor: &str) -> ApiResult<WorkshopOrder> {
        Ok(self.lifecycle.confirm(order_id, actor)?)
    }

    pub fn start_order(&self, order_id: i64, actor: &str) -> ApiResult<WorkshopOrder> {
        Ok(self.lifecycle.start(order_id, actor)?)
    }

    /// 完工并生成消耗/产出移库
    pub fn complete_order(&self, order_id: i64, actor: &str) -> ApiResult<CompletedOrder> {
        Ok(self.lifecycle.complete(order_id, actor)?)
    }

    pub fn cancel_order(&self, order_id: i64, actor: &str) -> ApiResult<WorkshopOrder> {
        Ok(self.lifecycle.cancel(order_id, actor)?)
    }

    pub fn reset_order_to_draft(&self, order_id: i64, actor: &str) -> ApiResult<WorkshopOrder> {
        Ok(self.lifecycle.reset_to_draft(order_id, actor)?)
    }

    // ==========================================
    // 规格明细
    // ==========================================

    fn apply_line_input(line: &mut WorkshopOrderLine, input: &LineInput) -> ApiResult<()> {
        if let Some(product_id) = input.product_id {
            line.product_id = Some(product_id);
        }
        if let Some(width) = &input.width {
            line.width = Some(width.clone());
        }
        if let Some(height) = &input.height {
            line.height = Some(height.clone());
        }
        if let Some(qty) = input.qty {
            if qty < 0 {
                return Err(ApiError::InvalidInput(format!("片数不能为负: {}", qty)));
            }
            line.qty = qty;
        }
        CostCalculator::recompute_line(line);
        Ok(())
    }

    pub fn add_line(&self, order_id: i64, input: &LineInput) -> ApiResult<WorkshopOrderLine> {
        self.load_order(order_id)?;
        let mut line = WorkshopOrderLine::new(order_id);
        Self::apply_line_input(&mut line, input)?;
        line.line_id = self.repos.line_repo.insert(&line)?;
        Ok(line)
    }

    pub fn update_line(&self, line_id: i64, input: &LineInput) -> ApiResult<WorkshopOrderLine> {
        let mut line = self
            .repos
            .line_repo
            .find_by_id(line_id)?
            .ok_or_else(|| ApiError::NotFound(format!("WorkshopOrderLine(id={})不存在", line_id)))?;
        Self::apply_line_input(&mut line, input)?;
        self.repos.line_repo.update(&line)?;
        Ok(line)
    }

    pub fn remove_line(&self, line_id: i64) -> ApiResult<()> {
        if self.repos.line_repo.delete(line_id)? == 0 {
            return Err(ApiError::NotFound(format!("WorkshopOrderLine(id={})不存在", line_id)));
        }
        Ok(())
    }

    pub fn list_lines(&self, order_id: i64) -> ApiResult<Vec<WorkshopOrderLine>> {
        Ok(self.repos.line_repo.list_by_order(order_id)?)
    }

    // ==========================================
    // 看板
    // ==========================================

    /// 未取消加工单的计数：进行中/已完工/表面加工/切割
    pub fn order_stats(&self) -> ApiResult<OrderStats> {
        Ok(self.repos.order_repo.stats()?)
    }

    /// 投入批次候选：产品在内部库位上数量为正的批次
    pub fn available_lots(&self, product_id: i64) -> ApiResult<Vec<LotAvailability>> {
        Ok(self.inventory.available_lots(product_id)?)
    }

    // ==========================================
    // 审计
    // ==========================================

    /// 加工单操作记录（按时间正序）
    pub fn order_history(&self, order_id: i64) -> ApiResult<Vec<ActionLog>> {
        Ok(self.repos.action_log_repo.find_by_order(order_id)?)
    }
}
