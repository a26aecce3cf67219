// ==========================================
// 石材车间加工系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::workshop_config::WorkshopConfig;
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 车间配置 =====

    /// 加载车间配置（缺失项取默认值，格式错误的项告警后取默认值）
    pub fn load_workshop_config(&self) -> Result<WorkshopConfig, Box<dyn Error>> {
        let defaults = WorkshopConfig::default();

        let production_location_refs = match self.get_config_value(config_keys::PRODUCTION_LOCATION_REFS)? {
            Some(raw) => serde_json::from_str::<Vec<String>>(&raw).unwrap_or_else(|_| {
                tracing::warn!(
                    config_key = config_keys::PRODUCTION_LOCATION_REFS,
                    raw_value = %raw,
                    "生产库位引用配置格式错误，使用默认值"
                );
                defaults.production_location_refs.clone()
            }),
            None => defaults.production_location_refs.clone(),
        };

        let max_rounds_raw = self.get_config_or_default(
            config_keys::MAX_FOLLOW_UP_ROUNDS,
            &defaults.max_follow_up_rounds.to_string(),
        )?;

        Ok(WorkshopConfig {
            order_sequence_code: self
                .get_config_or_default(config_keys::ORDER_SEQUENCE_CODE, &defaults.order_sequence_code)?,
            default_order_name: self
                .get_config_or_default(config_keys::DEFAULT_ORDER_NAME, &defaults.default_order_name)?,
            internal_picking_code: self.get_config_or_default(
                config_keys::INTERNAL_PICKING_CODE,
                &defaults.internal_picking_code,
            )?,
            production_location_refs,
            max_follow_up_rounds: max_rounds_raw
                .trim()
                .parse::<u32>()
                .unwrap_or(defaults.max_follow_up_rounds),
            locale: self.get_config_or_default(config_keys::LOCALE, &defaults.locale)?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 加工单编号
    pub const ORDER_SEQUENCE_CODE: &str = "order_sequence_code";
    pub const DEFAULT_ORDER_NAME: &str = "default_order_name";

    // 库存移动
    pub const INTERNAL_PICKING_CODE: &str = "internal_picking_code";
    pub const PRODUCTION_LOCATION_REFS: &str = "production_location_refs"; // JSON 数组
    pub const MAX_FOLLOW_UP_ROUNDS: &str = "max_follow_up_rounds";

    // 界面
    pub const LOCALE: &str = "locale";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let cfg = manager().load_workshop_config().unwrap();
        assert_eq!(cfg, WorkshopConfig::default());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let mgr = manager();
        mgr.set_global_config_value(config_keys::PRODUCTION_LOCATION_REFS, r#"["a.b","c.d"]"#)
            .unwrap();
        mgr.set_global_config_value(config_keys::MAX_FOLLOW_UP_ROUNDS, "many").unwrap();
        mgr.set_global_config_value(config_keys::INTERNAL_PICKING_CODE, "internal_move")
            .unwrap();

        let cfg = mgr.load_workshop_config().unwrap();
        assert_eq!(cfg.production_location_refs, vec!["a.b".to_string(), "c.d".to_string()]);
        assert_eq!(cfg.max_follow_up_rounds, 3);
        assert_eq!(cfg.internal_picking_code, "internal_move");
    }

    #[test]
    fn test_snapshot_contains_keys() {
        let mgr = manager();
        mgr.set_global_config_value(config_keys::LOCALE, "es").unwrap();
        let snapshot = mgr.get_config_snapshot().unwrap();
        assert!(snapshot.contains("\"locale\":\"es\""));
    }
}
