// ==========================================
// 石材车间加工系统 - 序列号仓储
// ==========================================
// 对齐: ir_sequence 表
// 格式: {prefix}{number 左补零至 padding 位}，例如 WS/00001
// ==========================================

use crate::engine::collaborators::SequenceService;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct SequenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SequenceRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 定义序列（已存在则保持不变）
    pub fn ensure_sequence(&self, code: &str, prefix: &str, padding: i32) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO ir_sequence (code, prefix, padding) VALUES (?1, ?2, ?3)",
            params![code, prefix, padding],
        )?;
        Ok(())
    }
}

impl SequenceService for SequenceRepository {
    fn next(&self, code: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        // 单条语句内递增并返回本次编号
        let row: Option<(String, i64, i64)> = conn
            .query_row(
                "UPDATE ir_sequence SET number_next = number_next + number_increment
                 WHERE code = ?1
                 RETURNING prefix, padding, number_next - number_increment",
                params![code],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        Ok(row.map(|(prefix, padding, number)| {
            format!("{}{:0width$}", prefix, number, width = padding.max(0) as usize)
        }))
    }
}
