// ==========================================
// 石材车间加工系统 - 工艺目录仓储
// ==========================================
// 对齐: workshop_process 表（code 唯一）
// 排序: (sequence, name)
// ==========================================

use crate::domain::process::{default_catalog, WorkshopProcess};
use crate::domain::types::ProcessType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};
use tracing::info;

const PROCESS_COLUMNS: &str =
    "id, name, code, sequence, process_type, active, description, cost_per_sqm, labor_cost, color";

pub struct ProcessRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProcessRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入工艺
    ///
    /// # 返回
    /// - 代码重复时返回 UniqueConstraintViolation
    pub fn insert(&self, process: &WorkshopProcess) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO workshop_process (
                name, code, sequence, process_type, active, description, cost_per_sqm, labor_cost, color
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                process.name,
                process.code,
                process.sequence,
                process.process_type.to_db_str(),
                process.active,
                process.description,
                process.cost_per_sqm,
                process.labor_cost,
                process.color,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(&self, process: &WorkshopProcess) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE workshop_process SET
                name = ?2, code = ?3, sequence = ?4, process_type = ?5, active = ?6,
                description = ?7, cost_per_sqm = ?8, labor_cost = ?9, color = ?10
             WHERE id = ?1",
            params![
                process.process_id,
                process.name,
                process.code,
                process.sequence,
                process.process_type.to_db_str(),
                process.active,
                process.description,
                process.cost_per_sqm,
                process.labor_cost,
                process.color,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("WorkshopProcess", process.process_id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, process_id: i64) -> RepositoryResult<Option<WorkshopProcess>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM workshop_process WHERE id = ?1", PROCESS_COLUMNS);
        Ok(conn
            .query_row(&sql, params![process_id], |row| Self::map_row(row))
            .optional()?)
    }

    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<WorkshopProcess>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM workshop_process WHERE code = ?1", PROCESS_COLUMNS);
        Ok(conn
            .query_row(&sql, params![code.trim()], |row| Self::map_row(row))
            .optional()?)
    }

    /// 列出工艺，按 (sequence, name) 排序
    pub fn list(&self, active_only: bool) -> RepositoryResult<Vec<WorkshopProcess>> {
        let conn = self.get_conn()?;
        let filter = if active_only { "WHERE active = 1" } else { "" };
        let sql = format!(
            "SELECT {} FROM workshop_process {} ORDER BY sequence, name",
            PROCESS_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let processes = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(processes)
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM workshop_process", [], |row| row.get(0))?)
    }

    /// 目录为空时写入默认工艺
    ///
    /// # 返回
    /// - 写入的条数（目录非空时为 0）
    pub fn seed_defaults(&self) -> RepositoryResult<usize> {
        if self.count()? > 0 {
            return Ok(0);
        }
        let catalog = default_catalog();
        for process in &catalog {
            self.insert(process)?;
        }
        info!(count = catalog.len(), "已写入默认工艺目录");
        Ok(catalog.len())
    }

    fn map_row(row: &Row) -> SqliteResult<WorkshopProcess> {
        Ok(WorkshopProcess {
            process_id: row.get(0)?,
            name: row.get(1)?,
            code: row.get(2)?,
            sequence: row.get(3)?,
            process_type: ProcessType::from_str(&row.get::<_, String>(4)?),
            active: row.get(5)?,
            description: row.get(6)?,
            cost_per_sqm: row.get(7)?,
            labor_cost: row.get(8)?,
            color: row.get(9)?,
        })
    }
}
