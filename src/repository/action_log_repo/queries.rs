use super::core::ActionLogRepository;
use crate::domain::action_log::ActionLog;
use crate::repository::db_utils::parse_ts;
use crate::repository::error::RepositoryResult;
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

impl ActionLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 action_id 查询单个日志
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;

        let log = conn
            .query_row(
                r#"
                SELECT action_id, order_id, action_type, action_ts, actor, payload_json, detail
                FROM action_log
                WHERE action_id = ?
                "#,
                params![action_id],
                |row| self.map_row(row),
            )
            .optional()?;
        Ok(log)
    }

    /// 查询加工单的审计轨迹（时间正序）
    pub fn find_by_order(&self, order_id: i64) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, order_id, action_type, action_ts, actor, payload_json, detail
            FROM action_log
            WHERE order_id = ?
            ORDER BY action_ts ASC, rowid ASC
            "#,
        )?;

        let logs = stmt
            .query_map(params![order_id], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 查询最近的操作日志
    pub fn find_recent(&self, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, order_id, action_type, action_ts, actor, payload_json, detail
            FROM action_log
            ORDER BY action_ts DESC, rowid DESC
            LIMIT ?
            "#,
        )?;

        let logs = stmt
            .query_map(params![limit], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    fn map_row(&self, row: &Row) -> SqliteResult<ActionLog> {
        let action_ts_str: String = row.get(3)?;
        let action_ts = parse_ts(&action_ts_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("无效的时间戳: {}", action_ts_str).into(),
            )
        })?;

        let payload_json = row
            .get::<_, Option<String>>(5)?
            .and_then(|s| serde_json::from_str(&s).ok());

        Ok(ActionLog {
            action_id: row.get(0)?,
            order_id: row.get(1)?,
            action_type: row.get(2)?,
            action_ts,
            actor: row.get(4)?,
            payload_json,
            detail: row.get(6)?,
        })
    }
}
