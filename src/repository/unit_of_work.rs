// ==========================================
// 石材车间加工系统 - SQLite 事务边界
// ==========================================
// 实现: 命名 SAVEPOINT，可嵌套在外层事务内
// 约束: 仓储方法内部不得再开启 BEGIN 事务（使用 savepoint）
// ==========================================

use crate::engine::collaborators::UnitOfWork;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::debug;

const SAVEPOINT_NAME: &str = "workshop_tx";

pub struct SqliteUnitOfWork {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUnitOfWork {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn exec(&self, sql: &str) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        conn.execute_batch(sql)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }
}

impl UnitOfWork for SqliteUnitOfWork {
    fn begin(&self) -> RepositoryResult<()> {
        debug!("SAVEPOINT {}", SAVEPOINT_NAME);
        self.exec(&format!("SAVEPOINT {}", SAVEPOINT_NAME))
    }

    fn commit(&self) -> RepositoryResult<()> {
        debug!("RELEASE {}", SAVEPOINT_NAME);
        self.exec(&format!("RELEASE SAVEPOINT {}", SAVEPOINT_NAME))
    }

    /// 回滚到保存点并释放（ROLLBACK TO 不会结束保存点）
    fn rollback(&self) -> RepositoryResult<()> {
        debug!("ROLLBACK TO {}", SAVEPOINT_NAME);
        self.exec(&format!(
            "ROLLBACK TO SAVEPOINT {name}; RELEASE SAVEPOINT {name};",
            name = SAVEPOINT_NAME
        ))
    }
}
