// ==========================================
// 石材车间加工系统 - 库存移动构造器
// ==========================================
// 流程（每个移库单）:
// 1. 字段探测（构造时一次）
// 2. 创建表头 → 创建移动 → 确认
// 3. 预留（虚拟源库位无实物库存，失败仅告警）
// 4. 明细行写入批次与数量（无明细则显式创建）
// 5. 完成；后续确认按无人值守方式处理
// 6. 完成失败 → 逐个强制完成；仍失败则返回组合错误
// ==========================================

use crate::domain::stock::PickingRef;
use crate::engine::collaborators::{
    FinalizeOutcome, FollowUpResolution, MovementEntity, PickingHeader, StockMovementService,
};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::field_schema::{MoveSpec, MovementSchema};
use crate::repository::error::{RepositoryError, RepositoryResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// 默认后续确认最大轮数
pub const DEFAULT_MAX_FOLLOW_UP_ROUNDS: u32 = 3;

/// 单个移库单的构造请求
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub picking_type_id: i64,
    pub origin: Option<String>,
    pub spec: MoveSpec,
    pub lot_id: Option<i64>,
}

/// 单个移库单的构造结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub picking: PickingRef,
    pub move_ids: Vec<i64>,
    pub follow_ups_resolved: u32,
    pub used_fallback: bool,
}

// ==========================================
// StockMoveBuilder
// ==========================================
pub struct StockMoveBuilder {
    movements: Arc<dyn StockMovementService>,
    schema: MovementSchema,
    max_follow_up_rounds: u32,
}

impl StockMoveBuilder {
    /// 创建构造器并探测字段
    ///
    /// # 参数
    /// - `movements`: 移库持久化服务
    /// - `max_follow_up_rounds`: 完成时最多处理的后续确认轮数
    pub fn new(movements: Arc<dyn StockMovementService>, max_follow_up_rounds: u32) -> EngineResult<Self> {
        let move_fields = movements.describe_fields(MovementEntity::Move)?;
        let line_fields = movements.describe_fields(MovementEntity::MoveLine)?;
        let schema = MovementSchema::detect(&move_fields, &line_fields)?;
        debug!(?schema, "移库字段探测完成");

        Ok(Self {
            movements,
            schema,
            max_follow_up_rounds,
        })
    }

    pub fn schema(&self) -> &MovementSchema {
        &self.schema
    }

    /// 构造并完成一个移库单
    #[instrument(skip(self, request), fields(product_id = request.spec.product_id, qty = request.spec.quantity))]
    pub fn build_batch(&self, request: &BatchRequest) -> EngineResult<BatchResult> {
        let spec = &request.spec;
        let picking = self.movements.create_picking(&PickingHeader {
            picking_type_id: request.picking_type_id,
            location_id: spec.location_id,
            location_dest_id: spec.location_dest_id,
            origin: request.origin.clone(),
            company_id: spec.company_id,
        })?;

        let move_id = self
            .movements
            .create_move(&self.schema.move_values(picking.picking_id, spec))?;
        self.movements.confirm_picking(picking.picking_id)?;

        if let Err(e) = self.movements.reserve_picking(picking.picking_id) {
            warn!(picking = %picking.name, error = %e, "预留失败，继续执行");
        }

        self.assign_lines(picking.picking_id, move_id, request)?;

        let move_ids = self.movements.list_moves(picking.picking_id)?;
        let (follow_ups_resolved, used_fallback) = match self.finalize(picking.picking_id) {
            Ok(rounds) => (rounds, false),
            Err(primary) => {
                warn!(picking = %picking.name, error = %primary, "移库单完成失败，改为强制完成");
                if let Err(fallback) = self.force_complete(&move_ids) {
                    return Err(EngineError::Finalization {
                        picking: picking.name.clone(),
                        primary: primary.to_string(),
                        fallback: fallback.to_string(),
                    });
                }
                (0, true)
            }
        };

        info!(picking = %picking.name, used_fallback, "移库单已完成");
        Ok(BatchResult {
            picking,
            move_ids,
            follow_ups_resolved,
            used_fallback,
        })
    }

    /// 写入批次与数量；预留未生成明细时显式创建
    fn assign_lines(&self, picking_id: i64, move_id: i64, request: &BatchRequest) -> EngineResult<()> {
        let line_ids = self.movements.list_move_lines(picking_id)?;
        if line_ids.is_empty() {
            let values = self
                .schema
                .line_create_values(picking_id, move_id, &request.spec, request.lot_id);
            let line_id = self.movements.create_move_line(&values)?;
            debug!(line_id, "显式创建移动明细");
            return Ok(());
        }

        let values = self
            .schema
            .line_update_values(request.lot_id, request.spec.quantity);
        for line_id in line_ids {
            self.movements.write_move_line(line_id, &values)?;
        }
        Ok(())
    }

    /// 完成移库单并处理后续确认，返回处理的轮数
    fn finalize(&self, picking_id: i64) -> RepositoryResult<u32> {
        let mut outcome = self.movements.validate_picking(picking_id)?;
        let mut rounds = 0;
        loop {
            match outcome {
                FinalizeOutcome::Finalized => return Ok(rounds),
                FinalizeOutcome::NeedsFollowUp(follow_up) => {
                    if rounds >= self.max_follow_up_rounds {
                        return Err(RepositoryError::ValidationFailed(format!(
                            "后续确认超过 {} 轮仍未完成",
                            self.max_follow_up_rounds
                        )));
                    }
                    let resolution = FollowUpResolution::unattended(follow_up.kind);
                    debug!(kind = ?follow_up.kind, ?resolution, "自动处理后续确认");
                    outcome = self.movements.resolve_follow_up(&follow_up, resolution)?;
                    rounds += 1;
                }
            }
        }
    }

    fn force_complete(&self, move_ids: &[i64]) -> RepositoryResult<()> {
        for move_id in move_ids {
            self.movements.force_complete_move(*move_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::collaborators::{FieldValues, FollowUp, FollowUpKind};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    // ==========================================
    // Mock StockMovementService
    // ==========================================
    #[derive(Default)]
    struct MockMovements {
        legacy: bool,
        reserve_fails: bool,
        auto_lines: bool,
        validate_error: Option<String>,
        force_error: Option<String>,
        follow_ups: Mutex<VecDeque<FollowUpKind>>,
        calls: Mutex<Vec<String>>,
        created_lines: Mutex<Vec<FieldValues>>,
        written_lines: Mutex<Vec<(i64, FieldValues)>>,
        resolutions: Mutex<Vec<FollowUpResolution>>,
    }

    impl MockMovements {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn next_outcome(&self) -> FinalizeOutcome {
            match self.follow_ups.lock().unwrap().pop_front() {
                Some(kind) => FinalizeOutcome::NeedsFollowUp(FollowUp {
                    kind,
                    picking_id: 1,
                    payload: json!({}),
                }),
                None => FinalizeOutcome::Finalized,
            }
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    impl StockMovementService for MockMovements {
        fn describe_fields(&self, entity: MovementEntity) -> RepositoryResult<Vec<String>> {
            let common = ["picking_id", "product_id", "location_id", "location_dest_id"];
            Ok(match (entity, self.legacy) {
                (MovementEntity::Move, false) => {
                    let mut v = names(&common);
                    v.extend(names(&["description_picking", "product_uom", "product_uom_qty", "quantity"]));
                    v
                }
                (MovementEntity::Move, true) => {
                    let mut v = names(&common);
                    v.extend(names(&["name", "product_uom_id", "product_qty", "quantity_done"]));
                    v
                }
                (MovementEntity::MoveLine, false) => {
                    let mut v = names(&common);
                    v.extend(names(&["move_id", "lot_id", "product_uom_id", "quantity"]));
                    v
                }
                (MovementEntity::MoveLine, true) => {
                    let mut v = names(&common);
                    v.extend(names(&["move_id", "lot_id", "product_uom", "qty_done"]));
                    v
                }
            })
        }

        fn create_picking(&self, _header: &PickingHeader) -> RepositoryResult<PickingRef> {
            self.record("create_picking");
            Ok(PickingRef {
                picking_id: 1,
                name: "WH/INT/00001".to_string(),
            })
        }

        fn create_move(&self, _values: &FieldValues) -> RepositoryResult<i64> {
            self.record("create_move");
            Ok(11)
        }

        fn confirm_picking(&self, _picking_id: i64) -> RepositoryResult<()> {
            self.record("confirm");
            Ok(())
        }

        fn reserve_picking(&self, _picking_id: i64) -> RepositoryResult<()> {
            self.record("reserve");
            if self.reserve_fails {
                return Err(RepositoryError::ReservationFailed("virtual source".to_string()));
            }
            Ok(())
        }

        fn list_moves(&self, _picking_id: i64) -> RepositoryResult<Vec<i64>> {
            Ok(vec![11])
        }

        fn list_move_lines(&self, _picking_id: i64) -> RepositoryResult<Vec<i64>> {
            Ok(if self.auto_lines { vec![21, 22] } else { vec![] })
        }

        fn create_move_line(&self, values: &FieldValues) -> RepositoryResult<i64> {
            self.record("create_line");
            self.created_lines.lock().unwrap().push(values.clone());
            Ok(21)
        }

        fn write_move_line(&self, line_id: i64, values: &FieldValues) -> RepositoryResult<()> {
            self.record("write_line");
            self.written_lines.lock().unwrap().push((line_id, values.clone()));
            Ok(())
        }

        fn validate_picking(&self, _picking_id: i64) -> RepositoryResult<FinalizeOutcome> {
            self.record("validate");
            if let Some(msg) = &self.validate_error {
                return Err(RepositoryError::ValidationFailed(msg.clone()));
            }
            Ok(self.next_outcome())
        }

        fn resolve_follow_up(
            &self,
            _follow_up: &FollowUp,
            resolution: FollowUpResolution,
        ) -> RepositoryResult<FinalizeOutcome> {
            self.record("resolve");
            self.resolutions.lock().unwrap().push(resolution);
            Ok(self.next_outcome())
        }

        fn force_complete_move(&self, _move_id: i64) -> RepositoryResult<()> {
            self.record("force_complete");
            match &self.force_error {
                Some(msg) => Err(RepositoryError::ValidationFailed(msg.clone())),
                None => Ok(()),
            }
        }
    }

    fn request() -> BatchRequest {
        BatchRequest {
            picking_type_id: 5,
            origin: Some("WS/00001".to_string()),
            spec: MoveSpec {
                product_id: 7,
                uom_id: Some(1),
                quantity: 12.5,
                location_id: 10,
                location_dest_id: 20,
                company_id: 1,
                description: "WS/00001".to_string(),
            },
            lot_id: Some(99),
        }
    }

    #[test]
    fn test_happy_path_order_of_operations() {
        let mock = Arc::new(MockMovements::default());
        let builder = StockMoveBuilder::new(mock.clone(), DEFAULT_MAX_FOLLOW_UP_ROUNDS).unwrap();
        let result = builder.build_batch(&request()).unwrap();

        assert!(!result.used_fallback);
        assert_eq!(result.move_ids, vec![11]);
        assert_eq!(
            mock.calls(),
            vec!["create_picking", "create_move", "confirm", "reserve", "create_line", "validate"]
        );
        let lines = mock.created_lines.lock().unwrap();
        assert_eq!(lines[0]["lot_id"], json!(99));
        assert_eq!(lines[0]["quantity"], json!(12.5));
    }

    #[test]
    fn test_reservation_failure_is_not_fatal() {
        let mock = Arc::new(MockMovements {
            reserve_fails: true,
            ..Default::default()
        });
        let builder = StockMoveBuilder::new(mock.clone(), DEFAULT_MAX_FOLLOW_UP_ROUNDS).unwrap();
        assert!(builder.build_batch(&request()).is_ok());
        assert!(mock.calls().contains(&"validate".to_string()));
    }

    #[test]
    fn test_existing_lines_receive_lot_and_qty() {
        let mock = Arc::new(MockMovements {
            auto_lines: true,
            legacy: true,
            ..Default::default()
        });
        let builder = StockMoveBuilder::new(mock.clone(), DEFAULT_MAX_FOLLOW_UP_ROUNDS).unwrap();
        builder.build_batch(&request()).unwrap();

        let written = mock.written_lines.lock().unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].1["qty_done"], json!(12.5));
        assert_eq!(written[1].1["lot_id"], json!(99));
        assert!(!mock.calls().contains(&"create_line".to_string()));
    }

    #[test]
    fn test_follow_ups_resolved_unattended() {
        let mock = Arc::new(MockMovements {
            follow_ups: Mutex::new(VecDeque::from(vec![
                FollowUpKind::ImmediateTransfer,
                FollowUpKind::Backorder,
            ])),
            ..Default::default()
        });
        let builder = StockMoveBuilder::new(mock.clone(), DEFAULT_MAX_FOLLOW_UP_ROUNDS).unwrap();
        let result = builder.build_batch(&request()).unwrap();

        assert_eq!(result.follow_ups_resolved, 2);
        assert_eq!(
            *mock.resolutions.lock().unwrap(),
            vec![FollowUpResolution::ConfirmImmediate, FollowUpResolution::NoBackorder]
        );
    }

    #[test]
    fn test_follow_up_rounds_are_bounded() {
        let mock = Arc::new(MockMovements {
            follow_ups: Mutex::new(VecDeque::from(vec![FollowUpKind::Backorder; 5])),
            ..Default::default()
        });
        let builder = StockMoveBuilder::new(mock.clone(), 2).unwrap();
        let result = builder.build_batch(&request()).unwrap();

        // 超过轮数后转入强制完成
        assert!(result.used_fallback);
        assert!(mock.calls().contains(&"force_complete".to_string()));
    }

    #[test]
    fn test_validation_failure_falls_back_to_force_complete() {
        let mock = Arc::new(MockMovements {
            validate_error: Some("lot required".to_string()),
            ..Default::default()
        });
        let builder = StockMoveBuilder::new(mock.clone(), DEFAULT_MAX_FOLLOW_UP_ROUNDS).unwrap();
        let result = builder.build_batch(&request()).unwrap();

        assert!(result.used_fallback);
        assert_eq!(mock.calls().last().map(String::as_str), Some("force_complete"));
    }

    #[test]
    fn test_both_failures_compose_one_error() {
        let mock = Arc::new(MockMovements {
            validate_error: Some("lot required".to_string()),
            force_error: Some("move locked".to_string()),
            ..Default::default()
        });
        let builder = StockMoveBuilder::new(mock, DEFAULT_MAX_FOLLOW_UP_ROUNDS).unwrap();

        match builder.build_batch(&request()) {
            Err(EngineError::Finalization {
                picking,
                primary,
                fallback,
            }) => {
                assert_eq!(picking, "WH/INT/00001");
                assert!(primary.contains("lot required"));
                assert!(fallback.contains("move locked"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
