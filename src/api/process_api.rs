// ==========================================
// 石材车间加工系统 - 工艺目录 API
// ==========================================
// 职责: 工艺新建/查询/费率调整/归档
// 红线: 费率变更后，引用该工艺的全部加工单（含已完工）在同一事务内重算成本
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::process::{WorkshopProcess, DEFAULT_PROCESS_SEQUENCE};
use crate::domain::types::ProcessType;
use crate::engine::collaborators::{in_unit_of_work, UnitOfWork};
use crate::engine::costing::CostCalculator;
use crate::repository::{ActionLogRepository, ProcessRepository, WorkshopOrderRepository};
use crate::i18n;

/// 新建工艺请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProcess {
    pub name: String,
    pub code: String,
    pub process_type: ProcessType,
    #[serde(default)]
    pub cost_per_sqm: Option<f64>,
    #[serde(default)]
    pub labor_cost: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sequence: Option<i32>,
    #[serde(default)]
    pub color: Option<i32>,
}

pub struct ProcessCatalogApi {
    process_repo: Arc<ProcessRepository>,
    order_repo: Arc<WorkshopOrderRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    unit_of_work: Arc<dyn UnitOfWork>,
}

fn check_rate(rate: Option<f64>) -> ApiResult<()> {
    match rate {
        Some(r) if r < 0.0 || !r.is_finite() => {
            Err(ApiError::InvalidInput(i18n::t("process.invalid_rate")))
        }
        _ => Ok(()),
    }
}

impl ProcessCatalogApi {
    pub fn new(
        process_repo: Arc<ProcessRepository>,
        order_repo: Arc<WorkshopOrderRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        unit_of_work: Arc<dyn UnitOfWork>,
    ) -> Self {
        Self {
            process_repo,
            order_repo,
            action_log_repo,
            unit_of_work,
        }
    }

    fn load(&self, process_id: i64) -> ApiResult<WorkshopProcess> {
        self.process_repo
            .find_by_id(process_id)?
            .ok_or_else(|| ApiError::NotFound(format!("WorkshopProcess(id={})不存在", process_id)))
    }

    /// 新建工艺（代码唯一）
    pub fn create_process(&self, request: &NewProcess, actor: &str) -> ApiResult<WorkshopProcess> {
        if request.name.trim().is_empty() || request.code.trim().is_empty() {
            return Err(ApiError::InvalidInput(i18n::t("process.name_required")));
        }
        check_rate(request.cost_per_sqm)?;
        check_rate(request.labor_cost)?;

        if self.process_repo.find_by_code(&request.code)?.is_some() {
            return Err(ApiError::BusinessRuleViolation(i18n::t_with_args(
                "process.code_exists",
                &[("code", request.code.trim())],
            )));
        }

        let mut process = WorkshopProcess::new(
            &request.name,
            &request.code,
            request.process_type,
            request.cost_per_sqm,
        );
        process.labor_cost = request.labor_cost;
        process.description = request.description.clone();
        process.sequence = request.sequence.unwrap_or(DEFAULT_PROCESS_SEQUENCE);
        process.color = request.color.unwrap_or(0);
        process.process_id = self.process_repo.insert(&process)?;

        self.action_log_repo.insert(
            &ActionLog::now(None, ActionType::CreateProcess, actor)
                .with_payload(json!({ "code": process.code, "cost_per_sqm": process.cost_per_sqm })),
        )?;
        info!(code = %process.code, actor, "新建工艺");
        Ok(process)
    }

    pub fn list_processes(&self, active_only: bool) -> ApiResult<Vec<WorkshopProcess>> {
        Ok(self.process_repo.list(active_only)?)
    }

    pub fn get_process_by_code(&self, code: &str) -> ApiResult<WorkshopProcess> {
        self.process_repo
            .find_by_code(code)?
            .ok_or_else(|| ApiError::NotFound(format!("WorkshopProcess(code={})不存在", code)))
    }

    /// 调整工艺费率
    ///
    /// 引用该工艺的每张加工单（含已完工）按新费率重算，
    /// 工艺更新、重算与审计在同一事务内
    ///
    /// # 返回
    /// - 被重算的加工单数量
    pub fn update_process_rates(
        &self,
        process_id: i64,
        cost_per_sqm: Option<f64>,
        labor_cost: Option<f64>,
        actor: &str,
    ) -> ApiResult<usize> {
        check_rate(cost_per_sqm)?;
        check_rate(labor_cost)?;

        let mut process = self.load(process_id)?;
        let previous = process.cost_per_sqm;
        process.cost_per_sqm = cost_per_sqm;
        process.labor_cost = labor_cost;

        let recomputed = in_unit_of_work(self.unit_of_work.as_ref(), || -> ApiResult<usize> {
            self.process_repo.update(&process)?;

            let orders = self.order_repo.list_by_process(process_id)?;
            let now = chrono::Local::now().naive_local();
            for mut order in orders.iter().cloned() {
                CostCalculator::recompute(&mut order, Some(&process));
                order.updated_at = now;
                self.order_repo.update(&order)?;
            }

            self.action_log_repo.insert(
                &ActionLog::now(None, ActionType::UpdateProcess, actor).with_payload(json!({
                    "code": process.code,
                    "cost_per_sqm": { "from": previous, "to": cost_per_sqm },
                    "labor_cost": labor_cost,
                    "orders_recomputed": orders.len(),
                })),
            )?;
            Ok(orders.len())
        })?;

        info!(code = %process.code, orders = recomputed, "工艺费率已调整");
        Ok(recomputed)
    }

    /// 启用/归档工艺
    pub fn set_process_active(&self, process_id: i64, active: bool, actor: &str) -> ApiResult<WorkshopProcess> {
        let mut process = self.load(process_id)?;
        process.active = active;
        self.process_repo.update(&process)?;

        self.action_log_repo.insert(
            &ActionLog::now(None, ActionType::UpdateProcess, actor)
                .with_payload(json!({ "code": process.code, "active": active })),
        )?;
        Ok(process)
    }
}
