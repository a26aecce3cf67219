// ==========================================
// 石材车间加工系统 - 加工单明细行仓储
// ==========================================
// 对齐: workshop_order_line 表（随表头 ON DELETE CASCADE）
// ==========================================

use crate::domain::order::WorkshopOrderLine;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct OrderLineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderLineRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, line: &WorkshopOrderLine) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO workshop_order_line (order_id, product_id, width, height, qty, area_sqm)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                line.order_id,
                line.product_id,
                line.width,
                line.height,
                line.qty,
                line.area_sqm
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(&self, line: &WorkshopOrderLine) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE workshop_order_line
             SET product_id = ?2, width = ?3, height = ?4, qty = ?5, area_sqm = ?6
             WHERE id = ?1",
            params![
                line.line_id,
                line.product_id,
                line.width,
                line.height,
                line.qty,
                line.area_sqm
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("WorkshopOrderLine", line.line_id));
        }
        Ok(())
    }

    pub fn delete(&self, line_id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        Ok(conn.execute("DELETE FROM workshop_order_line WHERE id = ?1", params![line_id])?)
    }

    pub fn find_by_id(&self, line_id: i64) -> RepositoryResult<Option<WorkshopOrderLine>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id, order_id, product_id, width, height, qty, area_sqm
                 FROM workshop_order_line WHERE id = ?1",
                params![line_id],
                |row| Self::map_row(row),
            )
            .optional()?)
    }

    pub fn list_by_order(&self, order_id: i64) -> RepositoryResult<Vec<WorkshopOrderLine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, order_id, product_id, width, height, qty, area_sqm
             FROM workshop_order_line WHERE order_id = ?1 ORDER BY id",
        )?;
        let lines = stmt
            .query_map(params![order_id], |row| Self::map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(lines)
    }

    fn map_row(row: &Row) -> SqliteResult<WorkshopOrderLine> {
        Ok(WorkshopOrderLine {
            line_id: row.get(0)?,
            order_id: row.get(1)?,
            product_id: row.get(2)?,
            width: row.get(3)?,
            height: row.get(4)?,
            qty: row.get(5)?,
            area_sqm: row.get(6)?,
        })
    }
}
