// ==========================================
// 石材车间加工系统 - 加工单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（派生字段由引擎计算后写入）
// 对齐: workshop_order 表
// ==========================================

use crate::domain::order::{OrderStats, WorkshopOrder};
use crate::domain::types::{OrderState, ProcessType};
use crate::repository::db_utils::{fmt_ts, parse_ts};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const ORDER_COLUMNS: &str = r#"
    id, name, state, company_id, process_id, process_code, process_type,
    product_in_id, lot_in_id, lot_in_name, qty_in,
    product_out_id, lot_out_name, qty_out,
    format_width, format_height, format_qty,
    area_sqm, process_cost, labor_cost, total_cost,
    consume_picking_id, produce_picking_id, lot_out_id,
    notes, user_id, date_planned, date_done, created_at, updated_at
"#;

// ==========================================
// WorkshopOrderRepository - 加工单仓储
// ==========================================
pub struct WorkshopOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkshopOrderRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入加工单
    ///
    /// # 返回
    /// - `Ok(order_id)`: 新分配的主键
    pub fn insert(&self, order: &WorkshopOrder) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO workshop_order (
                name, state, company_id, process_id, process_code, process_type,
                product_in_id, lot_in_id, lot_in_name, qty_in,
                product_out_id, lot_out_name, qty_out,
                format_width, format_height, format_qty,
                area_sqm, process_cost, labor_cost, total_cost,
                consume_picking_id, produce_picking_id, lot_out_id,
                notes, user_id, date_planned, date_done, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                      ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29)
            "#,
            params![
                order.name,
                order.state.to_db_str(),
                order.company_id,
                order.process_id,
                order.process_code,
                order.process_type.map(|t| t.to_db_str()),
                order.product_in_id,
                order.lot_in_id,
                order.lot_in_name,
                order.qty_in,
                order.product_out_id,
                order.lot_out_name,
                order.qty_out,
                order.format_width,
                order.format_height,
                order.format_qty,
                order.area_sqm,
                order.process_cost,
                order.labor_cost,
                order.total_cost,
                order.consume_picking_id,
                order.produce_picking_id,
                order.lot_out_id,
                order.notes,
                order.user_id,
                order.date_planned.as_ref().map(fmt_ts),
                order.date_done.as_ref().map(fmt_ts),
                fmt_ts(&order.created_at),
                fmt_ts(&order.updated_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 整行更新加工单
    pub fn update(&self, order: &WorkshopOrder) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE workshop_order SET
                name = ?2, state = ?3, company_id = ?4, process_id = ?5,
                process_code = ?6, process_type = ?7,
                product_in_id = ?8, lot_in_id = ?9, lot_in_name = ?10, qty_in = ?11,
                product_out_id = ?12, lot_out_name = ?13, qty_out = ?14,
                format_width = ?15, format_height = ?16, format_qty = ?17,
                area_sqm = ?18, process_cost = ?19, labor_cost = ?20, total_cost = ?21,
                consume_picking_id = ?22, produce_picking_id = ?23, lot_out_id = ?24,
                notes = ?25, user_id = ?26, date_planned = ?27, date_done = ?28,
                updated_at = ?29
            WHERE id = ?1
            "#,
            params![
                order.order_id,
                order.name,
                order.state.to_db_str(),
                order.company_id,
                order.process_id,
                order.process_code,
                order.process_type.map(|t| t.to_db_str()),
                order.product_in_id,
                order.lot_in_id,
                order.lot_in_name,
                order.qty_in,
                order.product_out_id,
                order.lot_out_name,
                order.qty_out,
                order.format_width,
                order.format_height,
                order.format_qty,
                order.area_sqm,
                order.process_cost,
                order.labor_cost,
                order.total_cost,
                order.consume_picking_id,
                order.produce_picking_id,
                order.lot_out_id,
                order.notes,
                order.user_id,
                order.date_planned.as_ref().map(fmt_ts),
                order.date_done.as_ref().map(fmt_ts),
                fmt_ts(&order.updated_at),
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("WorkshopOrder", order.order_id));
        }
        Ok(())
    }

    /// 删除加工单（明细行级联删除）
    pub fn delete(&self, order_id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        Ok(conn.execute("DELETE FROM workshop_order WHERE id = ?1", params![order_id])?)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, order_id: i64) -> RepositoryResult<Option<WorkshopOrder>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM workshop_order WHERE id = ?1", ORDER_COLUMNS);
        Ok(conn
            .query_row(&sql, params![order_id], |row| Self::map_row(row))
            .optional()?)
    }

    /// 按状态列出加工单（None 表示全部），按 id 倒序
    pub fn list(&self, state: Option<OrderState>) -> RepositoryResult<Vec<WorkshopOrder>> {
        let conn = self.get_conn()?;
        let orders = match state {
            Some(s) => {
                let sql = format!(
                    "SELECT {} FROM workshop_order WHERE state = ?1 ORDER BY id DESC",
                    ORDER_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![s.to_db_str()], |row| Self::map_row(row))?;
                rows.collect::<SqliteResult<Vec<_>>>()?
            }
            None => {
                let sql = format!("SELECT {} FROM workshop_order ORDER BY id DESC", ORDER_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], |row| Self::map_row(row))?;
                rows.collect::<SqliteResult<Vec<_>>>()?
            }
        };
        Ok(orders)
    }

    /// 引用某工艺的全部加工单（工艺费率变更后重算用，含已完工）
    pub fn list_by_process(&self, process_id: i64) -> RepositoryResult<Vec<WorkshopOrder>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM workshop_order WHERE process_id = ?1 ORDER BY id",
            ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map(params![process_id], |row| Self::map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(orders)
    }

    /// 看板统计（排除已取消）
    pub fn stats(&self) -> RepositoryResult<OrderStats> {
        let conn = self.get_conn()?;
        Ok(conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(state = 'in_progress'), 0),
                COALESCE(SUM(state = 'done'), 0),
                COALESCE(SUM(process_type = 'finish'), 0),
                COALESCE(SUM(process_type = 'cut'), 0)
            FROM workshop_order
            WHERE state <> 'cancel'
            "#,
            [],
            |row| {
                Ok(OrderStats {
                    in_progress: row.get(0)?,
                    done: row.get(1)?,
                    finish: row.get(2)?,
                    cut: row.get(3)?,
                })
            },
        )?)
    }

    fn map_row(row: &Row) -> SqliteResult<WorkshopOrder> {
        let state_raw: String = row.get(2)?;
        let state = OrderState::parse(&state_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("未知的加工单状态: {}", state_raw).into(),
            )
        })?;
        let ts = |idx: usize| -> SqliteResult<Option<NaiveDateTime>> {
            Ok(row.get::<_, Option<String>>(idx)?.and_then(|s| parse_ts(&s)))
        };
        let created_at = ts(28)?.unwrap_or_default();

        Ok(WorkshopOrder {
            order_id: row.get(0)?,
            name: row.get(1)?,
            state,
            company_id: row.get(3)?,
            process_id: row.get(4)?,
            process_code: row.get(5)?,
            process_type: row
                .get::<_, Option<String>>(6)?
                .map(|s| ProcessType::from_str(&s)),
            product_in_id: row.get(7)?,
            lot_in_id: row.get(8)?,
            lot_in_name: row.get(9)?,
            qty_in: row.get(10)?,
            product_out_id: row.get(11)?,
            lot_out_name: row.get(12)?,
            qty_out: row.get(13)?,
            format_width: row.get(14)?,
            format_height: row.get(15)?,
            format_qty: row.get(16)?,
            area_sqm: row.get(17)?,
            process_cost: row.get(18)?,
            labor_cost: row.get(19)?,
            total_cost: row.get(20)?,
            consume_picking_id: row.get(21)?,
            produce_picking_id: row.get(22)?,
            lot_out_id: row.get(23)?,
            notes: row.get(24)?,
            user_id: row.get(25)?,
            date_planned: ts(26)?,
            date_done: ts(27)?,
            created_at,
            updated_at: ts(29)?.unwrap_or(created_at),
        })
    }
}
