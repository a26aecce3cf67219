// ==========================================
// 石材车间加工系统 - 加工单状态机
// ==========================================
// 状态: draft → confirmed → in_progress → done, 另有 cancel
// 转换表:
//   confirm        draft                         必填字段齐全
//   start          draft, confirmed              无
//   complete       confirmed, in_progress        物化成功
//   cancel         draft, confirmed, in_progress 无
//   reset_to_draft 任意                          无
// 红线: 完工物化与状态写入在同一事务内，失败整体回滚
// 红线: 每次状态变更写 action_log
// ==========================================

use crate::config::WorkshopConfig;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::order::WorkshopOrder;
use crate::domain::types::OrderState;
use crate::engine::collaborators::{in_unit_of_work, UnitOfWork, WorkshopCollaborators};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::materializer::{MaterializedProduction, ProductionMaterializer};
use crate::engine::repositories::WorkshopRepositories;
use crate::repository::error::RepositoryError;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// OrderAction - 状态转换动作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Confirm,
    Start,
    Complete,
    Cancel,
    ResetToDraft,
}

impl OrderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAction::Confirm => "confirm",
            OrderAction::Start => "start",
            OrderAction::Complete => "complete",
            OrderAction::Cancel => "cancel",
            OrderAction::ResetToDraft => "reset_to_draft",
        }
    }

    /// 动作是否允许从该状态发起
    pub fn allowed_from(&self, state: OrderState) -> bool {
        use OrderState::*;
        match self {
            OrderAction::Confirm => state == Draft,
            OrderAction::Start => matches!(state, Draft | Confirmed),
            OrderAction::Complete => matches!(state, Confirmed | InProgress),
            OrderAction::Cancel => matches!(state, Draft | Confirmed | InProgress),
            OrderAction::ResetToDraft => true,
        }
    }

    pub fn target(&self) -> OrderState {
        match self {
            OrderAction::Confirm => OrderState::Confirmed,
            OrderAction::Start => OrderState::InProgress,
            OrderAction::Complete => OrderState::Done,
            OrderAction::Cancel => OrderState::Cancel,
            OrderAction::ResetToDraft => OrderState::Draft,
        }
    }

    fn action_type(&self) -> ActionType {
        match self {
            OrderAction::Confirm => ActionType::Confirm,
            OrderAction::Start => ActionType::Start,
            OrderAction::Complete => ActionType::Complete,
            OrderAction::Cancel => ActionType::Cancel,
            OrderAction::ResetToDraft => ActionType::ResetToDraft,
        }
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 校验转换并返回目标状态
pub fn check_transition(from: OrderState, action: OrderAction) -> EngineResult<OrderState> {
    if action.allowed_from(from) {
        Ok(action.target())
    } else {
        Err(EngineError::InvalidStateTransition {
            from,
            action: action.to_string(),
        })
    }
}

/// 完工结果
#[derive(Debug, Clone, Serialize)]
pub struct CompletedOrder {
    pub order: WorkshopOrder,
    pub production: MaterializedProduction,
}

// ==========================================
// OrderLifecycleEngine - 加工单生命周期引擎
// ==========================================
pub struct OrderLifecycleEngine {
    repos: WorkshopRepositories,
    unit_of_work: Arc<dyn UnitOfWork>,
    materializer: ProductionMaterializer,
}

impl OrderLifecycleEngine {
    pub fn new(
        repos: WorkshopRepositories,
        collaborators: &WorkshopCollaborators,
        config: &WorkshopConfig,
    ) -> EngineResult<Self> {
        Ok(Self {
            repos,
            unit_of_work: collaborators.unit_of_work.clone(),
            materializer: ProductionMaterializer::new(collaborators, config)?,
        })
    }

    fn load(&self, order_id: i64) -> EngineResult<WorkshopOrder> {
        self.repos
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| EngineError::Repository(RepositoryError::not_found("WorkshopOrder", order_id)))
    }

    fn now() -> chrono::NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn in_unit_of_work<T>(&self, f: impl FnOnce() -> EngineResult<T>) -> EngineResult<T> {
        in_unit_of_work(self.unit_of_work.as_ref(), f)
    }

    /// 写入状态并记录日志（不含完工）
    fn apply_simple(&self, mut order: WorkshopOrder, action: OrderAction, actor: &str) -> EngineResult<WorkshopOrder> {
        let from = order.state;
        let to = check_transition(from, action)?;

        self.in_unit_of_work(|| {
            order.state = to;
            order.updated_at = Self::now();
            self.repos.order_repo.update(&order)?;
            self.repos.action_log_repo.insert(
                &ActionLog::now(Some(order.order_id), action.action_type(), actor).with_payload(json!({
                    "from": from.to_db_str(),
                    "to": to.to_db_str(),
                })),
            )?;
            Ok(())
        })?;

        info!(order = %order.name, from = %from, to = %to, actor, "加工单状态变更");
        Ok(order)
    }

    /// 确认：必填字段齐全才可确认
    #[instrument(skip(self))]
    pub fn confirm(&self, order_id: i64, actor: &str) -> EngineResult<WorkshopOrder> {
        let order = self.load(order_id)?;
        check_transition(order.state, OrderAction::Confirm)?;

        let missing = order.missing_confirm_fields();
        if !missing.is_empty() {
            return Err(EngineError::MissingRequiredFields(missing));
        }
        self.apply_simple(order, OrderAction::Confirm, actor)
    }

    #[instrument(skip(self))]
    pub fn start(&self, order_id: i64, actor: &str) -> EngineResult<WorkshopOrder> {
        let order = self.load(order_id)?;
        self.apply_simple(order, OrderAction::Start, actor)
    }

    #[instrument(skip(self))]
    pub fn cancel(&self, order_id: i64, actor: &str) -> EngineResult<WorkshopOrder> {
        let order = self.load(order_id)?;
        self.apply_simple(order, OrderAction::Cancel, actor)
    }

    /// 手工重置为草稿（任意状态可用，保留完工关联与完工时间）
    #[instrument(skip(self))]
    pub fn reset_to_draft(&self, order_id: i64, actor: &str) -> EngineResult<WorkshopOrder> {
        let order = self.load(order_id)?;
        self.apply_simple(order, OrderAction::ResetToDraft, actor)
    }

    /// 完工：物化消耗/产出移库后置为 done
    ///
    /// # 返回
    /// - 成功: 更新后的加工单与物化结果
    /// - 失败: 状态不变，本次所有库存写入已回滚
    #[instrument(skip(self))]
    pub fn complete(&self, order_id: i64, actor: &str) -> EngineResult<CompletedOrder> {
        let mut order = self.load(order_id)?;
        let from = order.state;
        let to = check_transition(from, OrderAction::Complete)?;

        let production = self.in_unit_of_work(|| {
            let production = self.materializer.materialize(&order)?;

            let now = Self::now();
            order.state = to;
            order.date_done = Some(now);
            order.updated_at = now;
            order.consume_picking_id = Some(production.consume.picking.picking_id);
            order.produce_picking_id = Some(production.produce.picking.picking_id);
            order.lot_out_id = Some(production.lot_out.lot_id);
            order.lot_out_name = Some(production.lot_out.name.clone());
            self.repos.order_repo.update(&order)?;

            self.repos.action_log_repo.insert(
                &ActionLog::now(Some(order.order_id), ActionType::Complete, actor)
                    .with_payload(json!({
                        "from": from.to_db_str(),
                        "to": to.to_db_str(),
                        "consume_picking": production.consume.picking.name,
                        "produce_picking": production.produce.picking.name,
                        "lot_out": production.lot_out.name,
                        "consumed_qty": production.consumed_qty,
                        "produced_qty": production.produced_qty,
                        "fallback_used": production.consume.used_fallback || production.produce.used_fallback,
                    })),
            )?;
            Ok(production)
        });

        match production {
            Ok(production) => {
                info!(order = %order.name, from = %from, actor, "加工单完工");
                Ok(CompletedOrder { order, production })
            }
            Err(e) => {
                warn!(order_id, error = %e, "加工单完工失败，状态保持不变");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderState::*;

    const ALL_STATES: [OrderState; 5] = [Draft, Confirmed, InProgress, Done, Cancel];

    #[test]
    fn test_transition_table() {
        assert_eq!(check_transition(Draft, OrderAction::Confirm).unwrap(), Confirmed);
        assert_eq!(check_transition(Confirmed, OrderAction::Start).unwrap(), InProgress);
        assert_eq!(check_transition(Draft, OrderAction::Start).unwrap(), InProgress);
        assert_eq!(check_transition(InProgress, OrderAction::Complete).unwrap(), Done);
        assert_eq!(check_transition(Confirmed, OrderAction::Complete).unwrap(), Done);
        assert_eq!(check_transition(InProgress, OrderAction::Cancel).unwrap(), Cancel);
    }

    #[test]
    fn test_reset_allowed_from_every_state() {
        for state in ALL_STATES {
            assert_eq!(check_transition(state, OrderAction::ResetToDraft).unwrap(), Draft);
        }
    }

    #[test]
    fn test_done_and_cancel_reject_forward_actions() {
        for state in [Done, Cancel] {
            for action in [
                OrderAction::Confirm,
                OrderAction::Start,
                OrderAction::Complete,
                OrderAction::Cancel,
            ] {
                let err = check_transition(state, action).unwrap_err();
                assert!(matches!(err, EngineError::InvalidStateTransition { .. }));
            }
        }
    }

    #[test]
    fn test_complete_from_draft_rejected() {
        match check_transition(Draft, OrderAction::Complete) {
            Err(EngineError::InvalidStateTransition { from, action }) => {
                assert_eq!(from, Draft);
                assert_eq!(action, "complete");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_confirm_only_from_draft() {
        for state in ALL_STATES {
            assert_eq!(OrderAction::Confirm.allowed_from(state), state == Draft);
        }
    }
}
