use crate::domain::action_log::ActionLog;
use crate::repository::db_utils::fmt_ts;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入操作日志
    ///
    /// # 参数
    /// - `log`: 操作日志实体
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入,返回action_id
    /// - `Err(...)`: 数据库错误
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, order_id, action_type, action_ts, actor, payload_json, detail
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                log.action_id,
                log.order_id,
                log.action_type,
                fmt_ts(&log.action_ts),
                log.actor,
                log.payload_json.as_ref().map(|v| v.to_string()),
                log.detail,
            ],
        )?;

        Ok(log.action_id.clone())
    }

    /// 删除加工单时保留审计记录，仅解除关联
    ///
    /// # 返回
    /// - Ok(rows): 被更新的行数
    pub fn detach_order(&self, order_id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE action_log SET detail = COALESCE(detail, '') || ' [order ' || order_id || ' deleted]', order_id = NULL
             WHERE order_id = ?1",
            params![order_id],
        )?;
        Ok(rows)
    }
}
