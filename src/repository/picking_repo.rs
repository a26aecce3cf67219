// ==========================================
// 石材车间加工系统 - 移库单仓储
// ==========================================
// 职责: StockMovementService 的 SQLite 实现
// 对齐: stock_picking / stock_move / stock_move_line / stock_quant 表
// 说明: stock_move / stock_move_line 的数量与单位字段名随库版本变化，
//       首次使用时按 PRAGMA table_info 读取实际字段并缓存
// 红线: 方法内部只用 savepoint，外层事务由 UnitOfWork 持有
// ==========================================

use crate::domain::stock::{PickingRef, PickingSummary};
use crate::domain::types::{PickingState, ProductTracking};
use crate::engine::collaborators::{
    FieldValues, FinalizeOutcome, FollowUp, FollowUpKind, FollowUpResolution, MovementEntity,
    PickingHeader, StockMovementService,
};
use crate::repository::db_utils::{build_insert, build_update, table_columns};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult};
use serde_json::json;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, info};

/// 数量比较容差
const QTY_EPSILON: f64 = 1e-6;

// ==========================================
// 实际存储字段
// ==========================================

/// stock_move / stock_move_line 的实际字段（仓储首次使用时读取，之后复用）
struct TableLayout {
    move_fields: Vec<String>,
    line_fields: Vec<String>,
}

impl TableLayout {
    fn load(conn: &Connection) -> RepositoryResult<Self> {
        Ok(Self {
            move_fields: table_columns(conn, MovementEntity::Move.as_str())?,
            line_fields: table_columns(conn, MovementEntity::MoveLine.as_str())?,
        })
    }

    fn fields(&self, entity: MovementEntity) -> &[String] {
        match entity {
            MovementEntity::Move => &self.move_fields,
            MovementEntity::MoveLine => &self.line_fields,
        }
    }
}

struct StorageColumns {
    move_demand: String,
    move_done: Option<String>,
    line_qty: String,
}

fn first_present(columns: &[String], candidates: &[&str], table: &str) -> RepositoryResult<String> {
    candidates
        .iter()
        .find(|c| columns.iter().any(|col| col == *c))
        .map(|c| c.to_string())
        .ok_or_else(|| RepositoryError::FieldValueError {
            field: candidates.join("|"),
            message: format!("表 {} 缺少数量字段", table),
        })
}

impl StorageColumns {
    fn from_layout(layout: &TableLayout) -> RepositoryResult<Self> {
        let move_cols = &layout.move_fields;
        Ok(Self {
            move_demand: first_present(move_cols, &["product_uom_qty", "product_qty"], "stock_move")?,
            move_done: first_present(move_cols, &["quantity", "quantity_done"], "stock_move").ok(),
            line_qty: first_present(
                &layout.line_fields,
                &["quantity", "qty_done", "quantity_done"],
                "stock_move_line",
            )?,
        })
    }
}

#[derive(Debug, Clone)]
struct MoveRow {
    id: i64,
    picking_id: i64,
    product_id: i64,
    demand: f64,
    location_id: i64,
    location_dest_id: i64,
    state: String,
}

#[derive(Debug, Clone)]
struct LineRow {
    id: i64,
    move_id: Option<i64>,
    product_id: i64,
    lot_id: Option<i64>,
    qty: f64,
    location_id: i64,
    location_dest_id: i64,
}

// ==========================================
// 行读取与库存写入（接受 Connection 或 Savepoint）
// ==========================================

fn picking_state(conn: &Connection, picking_id: i64) -> RepositoryResult<PickingState> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT state FROM stock_picking WHERE id = ?1",
            params![picking_id],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|s| PickingState::from_str(&s))
        .ok_or_else(|| RepositoryError::not_found("StockPicking", picking_id))
}

fn load_moves(conn: &Connection, cols: &StorageColumns, filter: &str, id: i64) -> RepositoryResult<Vec<MoveRow>> {
    let sql = format!(
        "SELECT id, picking_id, product_id, {}, location_id, location_dest_id, state
         FROM stock_move WHERE {} = ?1 ORDER BY id",
        cols.move_demand, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let moves = stmt
        .query_map(params![id], |row| {
            Ok(MoveRow {
                id: row.get(0)?,
                picking_id: row.get(1)?,
                product_id: row.get(2)?,
                demand: row.get(3)?,
                location_id: row.get(4)?,
                location_dest_id: row.get(5)?,
                state: row.get(6)?,
            })
        })?
        .collect::<SqliteResult<Vec<_>>>()?;
    Ok(moves)
}

fn load_lines(conn: &Connection, cols: &StorageColumns, filter: &str, id: i64) -> RepositoryResult<Vec<LineRow>> {
    let sql = format!(
        "SELECT id, move_id, product_id, lot_id, {}, location_id, location_dest_id
         FROM stock_move_line WHERE {} = ?1 ORDER BY id",
        cols.line_qty, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let lines = stmt
        .query_map(params![id], |row| {
            Ok(LineRow {
                id: row.get(0)?,
                move_id: row.get(1)?,
                product_id: row.get(2)?,
                lot_id: row.get(3)?,
                qty: row.get(4)?,
                location_id: row.get(5)?,
                location_dest_id: row.get(6)?,
            })
        })?
        .collect::<SqliteResult<Vec<_>>>()?;
    Ok(lines)
}

fn insert_line(conn: &Connection, cols: &StorageColumns, mv: &MoveRow, qty: f64) -> RepositoryResult<i64> {
    let sql = format!(
        "INSERT INTO stock_move_line (move_id, picking_id, product_id, lot_id, {}, location_id, location_dest_id)
         VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6)",
        cols.line_qty
    );
    conn.execute(
        &sql,
        params![mv.id, mv.picking_id, mv.product_id, qty, mv.location_id, mv.location_dest_id],
    )?;
    Ok(conn.last_insert_rowid())
}

fn set_line_qty(conn: &Connection, cols: &StorageColumns, line_id: i64, qty: f64) -> RepositoryResult<()> {
    let sql = format!("UPDATE stock_move_line SET {} = ?1 WHERE id = ?2", cols.line_qty);
    conn.execute(&sql, params![qty, line_id])?;
    Ok(())
}

fn is_lot_tracked(conn: &Connection, product_id: i64) -> RepositoryResult<bool> {
    let tracking: Option<String> = conn
        .query_row(
            "SELECT tracking FROM product WHERE id = ?1",
            params![product_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(tracking.map(|t| ProductTracking::from_str(&t) != ProductTracking::None).unwrap_or(false))
}

/// 库存数量增减（无记录则新建，允许负库存）
fn adjust_quant(conn: &Connection, product_id: i64, lot_id: Option<i64>, location_id: i64, delta: f64) -> RepositoryResult<()> {
    let rows = conn.execute(
        "UPDATE stock_quant SET quantity = quantity + ?1
         WHERE id = (SELECT id FROM stock_quant
                     WHERE product_id = ?2 AND lot_id IS ?3 AND location_id = ?4
                     ORDER BY id LIMIT 1)",
        params![delta, product_id, lot_id, location_id],
    )?;
    if rows == 0 {
        conn.execute(
            "INSERT INTO stock_quant (product_id, lot_id, location_id, quantity) VALUES (?1, ?2, ?3, ?4)",
            params![product_id, lot_id, location_id, delta],
        )?;
    }
    Ok(())
}

fn apply_lines(conn: &Connection, lines: &[LineRow]) -> RepositoryResult<()> {
    for line in lines.iter().filter(|l| l.qty > 0.0) {
        adjust_quant(conn, line.product_id, line.lot_id, line.location_id, -line.qty)?;
        adjust_quant(conn, line.product_id, line.lot_id, line.location_dest_id, line.qty)?;
    }
    Ok(())
}

fn finish_move(conn: &Connection, cols: &StorageColumns, move_id: i64, done_qty: f64) -> RepositoryResult<()> {
    match &cols.move_done {
        Some(field) => {
            let sql = format!("UPDATE stock_move SET state = 'done', {} = ?1 WHERE id = ?2", field);
            conn.execute(&sql, params![done_qty, move_id])?;
        }
        None => {
            conn.execute("UPDATE stock_move SET state = 'done' WHERE id = ?1", params![move_id])?;
        }
    }
    conn.execute(
        "UPDATE stock_move_line SET state = 'done' WHERE move_id = ?1",
        params![move_id],
    )?;
    Ok(())
}

fn close_picking_if_done(conn: &Connection, picking_id: i64) -> RepositoryResult<bool> {
    let rows = conn.execute(
        "UPDATE stock_picking SET state = 'done', date_done = datetime('now')
         WHERE id = ?1 AND state <> 'done'
           AND NOT EXISTS (SELECT 1 FROM stock_move WHERE picking_id = ?1 AND state <> 'done')",
        params![picking_id],
    )?;
    Ok(rows > 0)
}

fn done_qty_for(lines: &[LineRow], move_id: i64) -> f64 {
    lines
        .iter()
        .filter(|l| l.move_id == Some(move_id))
        .map(|l| l.qty.max(0.0))
        .sum()
}

// ==========================================
// StockPickingRepository
// ==========================================
pub struct StockPickingRepository {
    conn: Arc<Mutex<Connection>>,
    layout: OnceLock<TableLayout>,
    storage: OnceLock<StorageColumns>,
}

impl StockPickingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            layout: OnceLock::new(),
            storage: OnceLock::new(),
        }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn layout(&self, conn: &Connection) -> RepositoryResult<&TableLayout> {
        if let Some(layout) = self.layout.get() {
            return Ok(layout);
        }
        let loaded = TableLayout::load(conn)?;
        debug!(
            move_fields = loaded.move_fields.len(),
            line_fields = loaded.line_fields.len(),
            "读取移库表字段"
        );
        Ok(self.layout.get_or_init(|| loaded))
    }

    fn storage(&self, conn: &Connection) -> RepositoryResult<&StorageColumns> {
        if let Some(cols) = self.storage.get() {
            return Ok(cols);
        }
        let loaded = StorageColumns::from_layout(self.layout(conn)?)?;
        Ok(self.storage.get_or_init(|| loaded))
    }

    pub fn find_picking(&self, picking_id: i64) -> RepositoryResult<Option<PickingSummary>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id, name, picking_type_id, location_id, location_dest_id, origin, state
                 FROM stock_picking WHERE id = ?1",
                params![picking_id],
                |row| {
                    Ok(PickingSummary {
                        picking_id: row.get(0)?,
                        name: row.get(1)?,
                        picking_type_id: row.get(2)?,
                        location_id: row.get(3)?,
                        location_dest_id: row.get(4)?,
                        origin: row.get(5)?,
                        state: PickingState::from_str(&row.get::<_, String>(6)?),
                    })
                },
            )
            .optional()?)
    }

    /// 按来源单号列出移库单
    pub fn list_by_origin(&self, origin: &str) -> RepositoryResult<Vec<PickingSummary>> {
        let ids: Vec<i64> = {
            let conn = self.get_conn()?;
            let mut stmt = conn.prepare("SELECT id FROM stock_picking WHERE origin = ?1 ORDER BY id")?;
            let ids = stmt
                .query_map(params![origin], |row| row.get(0))?
                .collect::<SqliteResult<Vec<_>>>()?;
            ids
        };
        let mut pickings = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(p) = self.find_picking(id)? {
                pickings.push(p);
            }
        }
        Ok(pickings)
    }

    /// 按需求量补齐明细数量（无明细则按移动新建）
    fn fill_demand_quantities(&self, picking_id: i64) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let cols = self.storage(&conn)?;
        let sp = conn.savepoint()?;
        for mv in load_moves(&sp, &cols, "picking_id", picking_id)? {
            let lines = load_lines(&sp, &cols, "move_id", mv.id)?;
            match lines.first() {
                Some(first) => set_line_qty(&sp, &cols, first.id, mv.demand)?,
                None => {
                    insert_line(&sp, &cols, &mv, mv.demand)?;
                }
            }
        }
        sp.commit()?;
        Ok(())
    }

    /// 不保留欠单：需求量截到已完成数量
    fn drop_remainders(&self, picking_id: i64) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let cols = self.storage(&conn)?;
        let sp = conn.savepoint()?;
        let lines = load_lines(&sp, &cols, "picking_id", picking_id)?;
        let update = format!("UPDATE stock_move SET {} = ?1 WHERE id = ?2", cols.move_demand);
        for mv in load_moves(&sp, &cols, "picking_id", picking_id)? {
            let done = done_qty_for(&lines, mv.id);
            if done + QTY_EPSILON < mv.demand {
                sp.execute(&update, params![done, mv.id])?;
            }
        }
        sp.commit()?;
        Ok(())
    }
}

// ==========================================
// StockMovementService 实现
// ==========================================
impl StockMovementService for StockPickingRepository {
    fn describe_fields(&self, entity: MovementEntity) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        Ok(self.layout(&conn)?.fields(entity).to_vec())
    }

    fn create_picking(&self, header: &PickingHeader) -> RepositoryResult<PickingRef> {
        let mut conn = self.get_conn()?;
        let sp = conn.savepoint()?;

        let (sequence_code, warehouse_code): (String, String) = sp
            .query_row(
                "SELECT pt.sequence_code,
                        COALESCE(w.code,
                                 (SELECT code FROM stock_warehouse WHERE company_id = ?2 ORDER BY id LIMIT 1),
                                 'WH')
                 FROM stock_picking_type pt
                 LEFT JOIN stock_warehouse w ON w.id = pt.warehouse_id
                 WHERE pt.id = ?1",
                params![header.picking_type_id, header.company_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| RepositoryError::not_found("StockPickingType", header.picking_type_id))?;

        sp.execute(
            "INSERT INTO stock_picking (picking_type_id, location_id, location_dest_id, origin, state, company_id)
             VALUES (?1, ?2, ?3, ?4, 'draft', ?5)",
            params![
                header.picking_type_id,
                header.location_id,
                header.location_dest_id,
                header.origin,
                header.company_id
            ],
        )?;
        let picking_id = sp.last_insert_rowid();
        let name = format!("{}/{}/{:05}", warehouse_code, sequence_code, picking_id);
        sp.execute(
            "UPDATE stock_picking SET name = ?1 WHERE id = ?2",
            params![name, picking_id],
        )?;
        sp.commit()?;

        debug!(picking = %name, "创建移库单");
        Ok(PickingRef { picking_id, name })
    }

    fn create_move(&self, values: &FieldValues) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let columns = &self.layout(&conn)?.move_fields;
        let (sql, params) = build_insert("stock_move", values, columns)?;
        conn.execute(&sql, params_from_iter(params))?;
        Ok(conn.last_insert_rowid())
    }

    fn confirm_picking(&self, picking_id: i64) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let state = picking_state(&conn, picking_id)?;
        if state != PickingState::Draft {
            return Err(RepositoryError::InvalidStateTransition {
                from: state.to_string(),
                to: PickingState::Confirmed.to_string(),
            });
        }
        let sp = conn.savepoint()?;
        sp.execute(
            "UPDATE stock_picking SET state = 'confirmed' WHERE id = ?1",
            params![picking_id],
        )?;
        sp.execute(
            "UPDATE stock_move SET state = 'confirmed' WHERE picking_id = ?1",
            params![picking_id],
        )?;
        sp.commit()?;
        Ok(())
    }

    /// 按源库位预留；虚拟源库位不持有实物库存，直接返回 ReservationFailed
    fn reserve_picking(&self, picking_id: i64) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let cols = self.storage(&conn)?;

        let state = picking_state(&conn, picking_id)?;
        if !matches!(state, PickingState::Confirmed | PickingState::Assigned) {
            return Err(RepositoryError::ReservationFailed(format!(
                "移库单状态为 {}，不能预留",
                state
            )));
        }

        let (source_name, usage): (String, String) = conn.query_row(
            "SELECT l.name, l.usage FROM stock_picking p JOIN stock_location l ON l.id = p.location_id
             WHERE p.id = ?1",
            params![picking_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        if crate::domain::types::LocationUsage::from_str(&usage).is_virtual() {
            return Err(RepositoryError::ReservationFailed(format!(
                "源库位 {} 为虚拟库位，无可预留库存",
                source_name
            )));
        }

        let sp = conn.savepoint()?;
        let mut reserved_any = false;
        for mv in load_moves(&sp, &cols, "picking_id", picking_id)? {
            if !load_lines(&sp, &cols, "move_id", mv.id)?.is_empty() {
                continue;
            }
            let available: f64 = sp.query_row(
                "SELECT COALESCE(SUM(quantity), 0) FROM stock_quant WHERE product_id = ?1 AND location_id = ?2",
                params![mv.product_id, mv.location_id],
                |row| row.get(0),
            )?;
            let reserved = mv.demand.min(available);
            if reserved <= QTY_EPSILON {
                continue;
            }
            insert_line(&sp, &cols, &mv, reserved)?;
            sp.execute(
                "UPDATE stock_move SET state = 'assigned' WHERE id = ?1",
                params![mv.id],
            )?;
            reserved_any = true;
        }
        if reserved_any {
            sp.execute(
                "UPDATE stock_picking SET state = 'assigned' WHERE id = ?1",
                params![picking_id],
            )?;
        }
        sp.commit()?;
        Ok(())
    }

    fn list_moves(&self, picking_id: i64) -> RepositoryResult<Vec<i64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id FROM stock_move WHERE picking_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![picking_id], |row| row.get(0))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(ids)
    }

    fn list_move_lines(&self, picking_id: i64) -> RepositoryResult<Vec<i64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id FROM stock_move_line WHERE picking_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![picking_id], |row| row.get(0))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(ids)
    }

    fn create_move_line(&self, values: &FieldValues) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let columns = &self.layout(&conn)?.line_fields;
        let (sql, params) = build_insert("stock_move_line", values, columns)?;
        conn.execute(&sql, params_from_iter(params))?;
        Ok(conn.last_insert_rowid())
    }

    fn write_move_line(&self, line_id: i64, values: &FieldValues) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let columns = &self.layout(&conn)?.line_fields;
        let (sql, params) = build_update("stock_move_line", line_id, values, columns)?;
        if conn.execute(&sql, params_from_iter(params))? == 0 {
            return Err(RepositoryError::not_found("StockMoveLine", line_id));
        }
        Ok(())
    }

    /// 完成移库单
    ///
    /// # 返回
    /// - Finalized: 库存已过账
    /// - NeedsFollowUp(ImmediateTransfer): 所有明细数量为 0
    /// - NeedsFollowUp(Backorder): 存在完成数量小于需求量的移动
    /// - Err(ValidationFailed): 状态不对或批次追溯产品缺少批次
    fn validate_picking(&self, picking_id: i64) -> RepositoryResult<FinalizeOutcome> {
        let mut conn = self.get_conn()?;
        let cols = self.storage(&conn)?;

        let state = picking_state(&conn, picking_id)?;
        if !matches!(state, PickingState::Confirmed | PickingState::Assigned) {
            return Err(RepositoryError::ValidationFailed(format!(
                "移库单状态为 {}，无法完成",
                state
            )));
        }

        let lines = load_lines(&conn, &cols, "picking_id", picking_id)?;
        if lines.iter().all(|l| l.qty <= QTY_EPSILON) {
            return Ok(FinalizeOutcome::NeedsFollowUp(FollowUp {
                kind: FollowUpKind::ImmediateTransfer,
                picking_id,
                payload: json!({ "lines": lines.len() }),
            }));
        }

        for line in lines.iter().filter(|l| l.qty > QTY_EPSILON) {
            if line.lot_id.is_none() && is_lot_tracked(&conn, line.product_id)? {
                return Err(RepositoryError::ValidationFailed(format!(
                    "产品 {} 需要批次号",
                    line.product_id
                )));
            }
        }

        let moves = load_moves(&conn, &cols, "picking_id", picking_id)?;
        let short: Vec<_> = moves
            .iter()
            .filter_map(|mv| {
                let done = done_qty_for(&lines, mv.id);
                (done + QTY_EPSILON < mv.demand)
                    .then(|| json!({ "move_id": mv.id, "demand": mv.demand, "done": done }))
            })
            .collect();
        if !short.is_empty() {
            return Ok(FinalizeOutcome::NeedsFollowUp(FollowUp {
                kind: FollowUpKind::Backorder,
                picking_id,
                payload: json!({ "moves": short }),
            }));
        }

        let sp = conn.savepoint()?;
        apply_lines(&sp, &lines)?;
        for mv in &moves {
            finish_move(&sp, &cols, mv.id, done_qty_for(&lines, mv.id))?;
        }
        close_picking_if_done(&sp, picking_id)?;
        sp.commit()?;

        info!(picking_id, "移库单已过账");
        Ok(FinalizeOutcome::Finalized)
    }

    fn resolve_follow_up(&self, follow_up: &FollowUp, resolution: FollowUpResolution) -> RepositoryResult<FinalizeOutcome> {
        match (follow_up.kind, resolution) {
            (FollowUpKind::ImmediateTransfer, FollowUpResolution::ConfirmImmediate) => {
                self.fill_demand_quantities(follow_up.picking_id)?
            }
            (FollowUpKind::Backorder, FollowUpResolution::NoBackorder) => {
                self.drop_remainders(follow_up.picking_id)?
            }
            (kind, res) => {
                return Err(RepositoryError::ValidationFailed(format!(
                    "后续确认 {:?} 不接受处理方式 {:?}",
                    kind, res
                )))
            }
        }
        self.validate_picking(follow_up.picking_id)
    }

    /// 强制完成单个移动：不校验批次，不生成欠单
    fn force_complete_move(&self, move_id: i64) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let cols = self.storage(&conn)?;

        let mv = load_moves(&conn, &cols, "id", move_id)?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::not_found("StockMove", move_id))?;
        match mv.state.as_str() {
            "done" => return Ok(()),
            "cancel" => {
                return Err(RepositoryError::ValidationFailed(format!(
                    "移动 {} 已取消",
                    move_id
                )))
            }
            _ => {}
        }

        let sp = conn.savepoint()?;
        let mut lines = load_lines(&sp, &cols, "move_id", move_id)?;
        if lines.is_empty() {
            insert_line(&sp, &cols, &mv, mv.demand)?;
            lines = load_lines(&sp, &cols, "move_id", move_id)?;
        } else if lines.iter().all(|l| l.qty <= QTY_EPSILON) {
            set_line_qty(&sp, &cols, lines[0].id, mv.demand)?;
            lines = load_lines(&sp, &cols, "move_id", move_id)?;
        }

        apply_lines(&sp, &lines)?;
        finish_move(&sp, &cols, move_id, done_qty_for(&lines, move_id))?;
        close_picking_if_done(&sp, mv.picking_id)?;
        sp.commit()?;

        info!(move_id, "移动已强制完成");
        Ok(())
    }
}
