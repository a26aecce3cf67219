// ==========================================
// 加工单生命周期集成测试
// ==========================================
// 覆盖: 完工物化、配置缺失（仓库/库存库位/作业类型）、产出失败回滚、完成失败兜底、重置后再完工
// ==========================================

mod test_helpers;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use stone_workshop::api::{ApiError, CreateOrderRequest, OrderPatch};
use stone_workshop::app::{sqlite_collaborators, AppState};
use stone_workshop::domain::stock::PickingRef;
use stone_workshop::engine::{
    EngineError, FieldValues, FinalizeOutcome, FollowUp, FollowUpResolution, MovementEntity,
    OrderLifecycleEngine, PickingHeader, StockMovementService, WorkshopRepositories,
};
use stone_workshop::repository::{RepositoryError, RepositoryResult, StockPickingRepository};
use stone_workshop::{OrderState, PickingState};
use test_helpers::*;

const ACTOR: &str = "taller";

fn setup(options: SeedOptions) -> (tempfile::NamedTempFile, AppState) {
    let (file, db_path) = create_test_db().unwrap();
    seed_stock(&db_path, options).unwrap();
    let state = AppState::new(db_path).unwrap();
    (file, state)
}

fn process_id(state: &AppState, code: &str) -> i64 {
    state.process_api.get_process_by_code(code).unwrap().process_id
}

fn finish_request(state: &AppState) -> CreateOrderRequest {
    CreateOrderRequest {
        process_id: process_id(state, "PUL"),
        company_id: COMPANY_ID,
        details: OrderPatch {
            product_in_id: Some(BLOCK_PRODUCT_ID),
            lot_in_id: Some(LOT_IN_ID),
            product_out_id: Some(SLAB_PRODUCT_ID),
            ..Default::default()
        },
    }
}

/// 新建并推进到加工中
fn started_order(state: &AppState) -> i64 {
    let order = state.order_api.create_order(&finish_request(state), ACTOR).unwrap();
    state.order_api.confirm_order(order.order_id, ACTOR).unwrap();
    state.order_api.start_order(order.order_id, ACTOR).unwrap();
    order.order_id
}

// ==========================================
// 可编排失败的移库服务
// ==========================================
struct ScriptedMovements {
    inner: StockPickingRepository,
    fail_picking_from: Option<i64>,
    validate_failures: AtomicU32,
    fail_force: bool,
}

impl ScriptedMovements {
    fn new(state: &AppState) -> Self {
        Self {
            inner: StockPickingRepository::new(state.conn.clone()),
            fail_picking_from: None,
            validate_failures: AtomicU32::new(0),
            fail_force: false,
        }
    }
}

impl StockMovementService for ScriptedMovements {
    fn describe_fields(&self, entity: MovementEntity) -> RepositoryResult<Vec<String>> {
        self.inner.describe_fields(entity)
    }

    fn create_picking(&self, header: &PickingHeader) -> RepositoryResult<PickingRef> {
        if self.fail_picking_from == Some(header.location_id) {
            return Err(RepositoryError::InternalError("picking sequence exhausted".to_string()));
        }
        self.inner.create_picking(header)
    }

    fn create_move(&self, values: &FieldValues) -> RepositoryResult<i64> {
        self.inner.create_move(values)
    }

    fn confirm_picking(&self, picking_id: i64) -> RepositoryResult<()> {
        self.inner.confirm_picking(picking_id)
    }

    fn reserve_picking(&self, picking_id: i64) -> RepositoryResult<()> {
        self.inner.reserve_picking(picking_id)
    }

    fn list_moves(&self, picking_id: i64) -> RepositoryResult<Vec<i64>> {
        self.inner.list_moves(picking_id)
    }

    fn list_move_lines(&self, picking_id: i64) -> RepositoryResult<Vec<i64>> {
        self.inner.list_move_lines(picking_id)
    }

    fn create_move_line(&self, values: &FieldValues) -> RepositoryResult<i64> {
        self.inner.create_move_line(values)
    }

    fn write_move_line(&self, line_id: i64, values: &FieldValues) -> RepositoryResult<()> {
        self.inner.write_move_line(line_id, values)
    }

    fn validate_picking(&self, picking_id: i64) -> RepositoryResult<FinalizeOutcome> {
        let remaining = self.validate_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.validate_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RepositoryError::ValidationFailed("quality hold on lot".to_string()));
        }
        self.inner.validate_picking(picking_id)
    }

    fn resolve_follow_up(&self, follow_up: &FollowUp, resolution: FollowUpResolution) -> RepositoryResult<FinalizeOutcome> {
        self.inner.resolve_follow_up(follow_up, resolution)
    }

    fn force_complete_move(&self, move_id: i64) -> RepositoryResult<()> {
        if self.fail_force {
            return Err(RepositoryError::ValidationFailed("move is locked".to_string()));
        }
        self.inner.force_complete_move(move_id)
    }
}

fn engine_with(state: &AppState, movements: ScriptedMovements) -> OrderLifecycleEngine {
    let mut collaborators = sqlite_collaborators(state.conn.clone());
    collaborators.movements = Arc::new(movements);
    OrderLifecycleEngine::new(
        WorkshopRepositories::from_connection(state.conn.clone()),
        &collaborators,
        &state.config,
    )
    .unwrap()
}

// ==========================================
// 测试用例
// ==========================================

#[test]
fn test_complete_materializes_consume_and_produce() {
    let (_file, state) = setup(SeedOptions::default());
    let order_id = started_order(&state);

    let completed = state.order_api.complete_order(order_id, ACTOR).unwrap();
    let order = &completed.order;

    assert_eq!(order.state, OrderState::Done);
    assert!(order.date_done.is_some());
    assert_eq!(order.lot_out_name.as_deref(), Some("B-0042-PUL"));
    assert_eq!(order.consume_picking_id, Some(completed.production.consume.picking.picking_id));
    assert_eq!(order.produce_picking_id, Some(completed.production.produce.picking.picking_id));
    assert!(!completed.production.consume.used_fallback);
    assert!(!completed.production.produce.used_fallback);
    assert_eq!(completed.production.consumed_qty, LOT_IN_QTY);
    assert_eq!(completed.production.produced_qty, LOT_IN_QTY);

    let lot_out = order.lot_out_id;
    assert_eq!(quant(&state.conn, BLOCK_PRODUCT_ID, Some(LOT_IN_ID), STOCK_LOCATION_ID), 0.0);
    assert_eq!(
        state.stock_repo.quant_qty(LOT_IN_ID, GLOBAL_PRODUCTION_LOCATION_ID).unwrap(),
        LOT_IN_QTY
    );
    assert_eq!(quant(&state.conn, SLAB_PRODUCT_ID, lot_out, STOCK_LOCATION_ID), LOT_IN_QTY);
    assert_eq!(
        quant(&state.conn, SLAB_PRODUCT_ID, lot_out, GLOBAL_PRODUCTION_LOCATION_ID),
        -LOT_IN_QTY
    );

    let pickings = state.picking_repo.list_by_origin(&order.name).unwrap();
    assert_eq!(pickings.len(), 2);
    assert!(pickings.iter().all(|p| p.state == PickingState::Done));
    assert!(pickings[0].name.starts_with("WH/INT/"));
    assert_eq!(pickings[0].location_id, STOCK_LOCATION_ID);
    assert_eq!(pickings[1].location_dest_id, STOCK_LOCATION_ID);

    let trail: Vec<String> = state
        .order_api
        .order_history(order_id)
        .unwrap()
        .into_iter()
        .map(|log| log.action_type)
        .collect();
    assert_eq!(trail, vec!["CREATE_ORDER", "CONFIRM", "START", "COMPLETE"]);
}

#[test]
fn test_missing_warehouse_keeps_order_in_progress() {
    let (_file, state) = setup(SeedOptions {
        with_warehouse: false,
        ..Default::default()
    });
    let order_id = started_order(&state);

    let err = state.order_api.complete_order(order_id, ACTOR).unwrap_err();
    assert!(matches!(err, ApiError::Configuration(_)), "unexpected: {err:?}");

    let order = state.order_api.get_order(order_id).unwrap();
    assert_eq!(order.state, OrderState::InProgress);
    assert_eq!(order.consume_picking_id, None);
    assert_eq!(count_rows(&state.conn, "stock_picking"), 0);
}

/// 完工因配置缺失失败：状态不变，不写移库单与批次
fn assert_complete_rejected_without_writes(state: &AppState, order_id: i64) {
    let err = state.order_api.complete_order(order_id, ACTOR).unwrap_err();
    assert!(matches!(err, ApiError::Configuration(_)), "unexpected: {err:?}");

    let order = state.order_api.get_order(order_id).unwrap();
    assert_eq!(order.state, OrderState::InProgress);
    assert_eq!(order.lot_out_id, None);
    assert_eq!(count_rows(&state.conn, "stock_picking"), 0);
    assert_eq!(count_rows(&state.conn, "stock_move"), 0);
    assert_eq!(count_rows(&state.conn, "stock_lot"), 2);
}

#[test]
fn test_missing_internal_operation_type_keeps_order_in_progress() {
    let (_file, state) = setup(SeedOptions::default());
    // 仓库与公司两级都找不到 internal 作业类型
    state
        .conn
        .lock()
        .unwrap()
        .execute("UPDATE stock_picking_type SET code = 'outgoing'", [])
        .unwrap();
    let order_id = started_order(&state);

    assert_complete_rejected_without_writes(&state, order_id);
}

#[test]
fn test_warehouse_without_stock_location_keeps_order_in_progress() {
    let (_file, state) = setup(SeedOptions::default());
    state
        .conn
        .lock()
        .unwrap()
        .execute("UPDATE stock_warehouse SET lot_stock_id = NULL", [])
        .unwrap();
    let order_id = started_order(&state);

    assert_complete_rejected_without_writes(&state, order_id);
}

#[test]
fn test_produce_failure_rolls_back_consume() {
    let (_file, state) = setup(SeedOptions::default());
    let order_id = started_order(&state);

    let mut movements = ScriptedMovements::new(&state);
    movements.fail_picking_from = Some(GLOBAL_PRODUCTION_LOCATION_ID);
    let engine = engine_with(&state, movements);

    assert!(engine.complete(order_id, ACTOR).is_err());

    let order = state.order_api.get_order(order_id).unwrap();
    assert_eq!(order.state, OrderState::InProgress);
    assert_eq!(count_rows(&state.conn, "stock_picking"), 0);
    assert_eq!(count_rows(&state.conn, "stock_move"), 0);
    assert_eq!(count_rows(&state.conn, "stock_lot"), 2);
    assert_eq!(
        quant(&state.conn, BLOCK_PRODUCT_ID, Some(LOT_IN_ID), STOCK_LOCATION_ID),
        LOT_IN_QTY
    );
    assert!(state
        .order_api
        .order_history(order_id)
        .unwrap()
        .iter()
        .all(|log| log.action_type != "COMPLETE"));
}

#[test]
fn test_validate_failure_falls_back_to_force_complete() {
    let (_file, state) = setup(SeedOptions::default());
    let order_id = started_order(&state);

    let movements = ScriptedMovements::new(&state);
    movements.validate_failures.store(1, Ordering::SeqCst);
    let engine = engine_with(&state, movements);

    let completed = engine.complete(order_id, ACTOR).unwrap();
    assert!(completed.production.consume.used_fallback);
    assert!(!completed.production.produce.used_fallback);
    assert_eq!(completed.order.state, OrderState::Done);

    assert_eq!(quant(&state.conn, BLOCK_PRODUCT_ID, Some(LOT_IN_ID), STOCK_LOCATION_ID), 0.0);
    assert_eq!(
        quant(&state.conn, SLAB_PRODUCT_ID, completed.order.lot_out_id, STOCK_LOCATION_ID),
        LOT_IN_QTY
    );
    let consume = state
        .picking_repo
        .find_picking(completed.production.consume.picking.picking_id)
        .unwrap()
        .unwrap();
    assert_eq!(consume.state, PickingState::Done);
}

#[test]
fn test_fallback_failure_reports_both_causes() {
    let (_file, state) = setup(SeedOptions::default());
    let order_id = started_order(&state);

    let mut movements = ScriptedMovements::new(&state);
    movements.validate_failures.store(u32::MAX, Ordering::SeqCst);
    movements.fail_force = true;
    let engine = engine_with(&state, movements);

    match engine.complete(order_id, ACTOR) {
        Err(EngineError::Finalization {
            picking,
            primary,
            fallback,
        }) => {
            assert!(picking.starts_with("WH/INT/"));
            assert!(primary.contains("quality hold"));
            assert!(fallback.contains("locked"));
        }
        other => panic!("unexpected: {other:?}"),
    }

    assert_eq!(
        state.order_api.get_order(order_id).unwrap().state,
        OrderState::InProgress
    );
    assert_eq!(count_rows(&state.conn, "stock_picking"), 0);
}

#[test]
fn test_company_production_location_preferred() {
    let (_file, state) = setup(SeedOptions {
        company_production_location: true,
        ..Default::default()
    });
    let order_id = started_order(&state);

    state.order_api.complete_order(order_id, ACTOR).unwrap();

    assert_eq!(
        quant(&state.conn, BLOCK_PRODUCT_ID, Some(LOT_IN_ID), COMPANY_PRODUCTION_LOCATION_ID),
        LOT_IN_QTY
    );
    assert_eq!(
        quant(&state.conn, BLOCK_PRODUCT_ID, Some(LOT_IN_ID), GLOBAL_PRODUCTION_LOCATION_ID),
        0.0
    );
}

#[test]
fn test_confirm_requires_input_and_output() {
    let (_file, state) = setup(SeedOptions::default());
    let request = CreateOrderRequest {
        process_id: process_id(&state, "PUL"),
        company_id: COMPANY_ID,
        details: OrderPatch::default(),
    };
    let order = state.order_api.create_order(&request, ACTOR).unwrap();

    let err = state.order_api.confirm_order(order.order_id, ACTOR).unwrap_err();
    assert!(matches!(err, ApiError::MissingRequiredFields(_)));
    assert_eq!(state.order_api.get_order(order.order_id).unwrap().state, OrderState::Draft);
}

#[test]
fn test_forward_actions_rejected_after_done() {
    let (_file, state) = setup(SeedOptions::default());
    let order_id = started_order(&state);
    state.order_api.complete_order(order_id, ACTOR).unwrap();

    assert!(matches!(
        state.order_api.cancel_order(order_id, ACTOR),
        Err(ApiError::InvalidStateTransition(_))
    ));
    assert!(matches!(
        state.order_api.complete_order(order_id, ACTOR),
        Err(ApiError::InvalidStateTransition(_))
    ));
}

#[test]
fn test_reset_keeps_links_and_second_completion_reuses_lot() {
    let (_file, state) = setup(SeedOptions::default());
    let order_id = started_order(&state);
    state.order_api.complete_order(order_id, ACTOR).unwrap();
    let first = state.order_api.get_order(order_id).unwrap();

    let reset = state.order_api.reset_order_to_draft(order_id, ACTOR).unwrap();
    assert_eq!(reset.state, OrderState::Draft);
    assert_eq!(reset.consume_picking_id, first.consume_picking_id);
    assert_eq!(reset.date_done, first.date_done);

    state.order_api.confirm_order(order_id, ACTOR).unwrap();
    state.order_api.start_order(order_id, ACTOR).unwrap();
    let second = state.order_api.complete_order(order_id, ACTOR).unwrap().order;

    assert_eq!(second.lot_out_id, first.lot_out_id);
    let lot_out = state
        .stock_repo
        .find_lot_by_name("B-0042-PUL", SLAB_PRODUCT_ID)
        .unwrap()
        .unwrap();
    assert_eq!(Some(lot_out.lot_id), first.lot_out_id);
    assert_eq!(count_rows(&state.conn, "stock_lot"), 3);
    assert_ne!(second.consume_picking_id, first.consume_picking_id);
    assert_eq!(count_rows(&state.conn, "stock_picking"), 4);
    assert_eq!(
        quant(&state.conn, SLAB_PRODUCT_ID, second.lot_out_id, STOCK_LOCATION_ID),
        LOT_IN_QTY * 2.0
    );
}
