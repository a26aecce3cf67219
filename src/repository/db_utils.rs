// ==========================================
// 石材车间加工系统 - 数据库工具模块
// ==========================================
// 职责: 时间戳编解码、表字段探测、动态 INSERT/UPDATE 构建
// ==========================================

use crate::engine::collaborators::FieldValues;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde_json::Value as JsonValue;

/// 时间戳存储格式
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// 解析时间戳（兼容 SQLite datetime('now') 输出）
pub fn parse_ts(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// 读取表的全部字段名（PRAGMA table_info）
pub fn table_columns(conn: &Connection, table: &str) -> RepositoryResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// JSON 值转换为 SQLite 值
pub fn json_to_sql(value: &JsonValue) -> SqlValue {
    match value {
        JsonValue::Null => SqlValue::Null,
        JsonValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(0.0)),
        },
        JsonValue::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn check_columns(table: &str, values: &FieldValues, columns: &[String]) -> RepositoryResult<()> {
    if let Some(unknown) = values.keys().find(|k| !columns.iter().any(|c| c == *k)) {
        return Err(RepositoryError::FieldValueError {
            field: unknown.clone(),
            message: format!("表 {} 不存在该字段", table),
        });
    }
    Ok(())
}

/// 构建 INSERT 语句
///
/// # 参数
/// - `table`: 目标表名
/// - `values`: 字段 → 值
/// - `columns`: 表的实际字段（用于校验，字段名不来自用户输入之外的任何拼接）
///
/// # 返回
/// - (SQL, 参数列表)
pub fn build_insert(
    table: &str,
    values: &FieldValues,
    columns: &[String],
) -> RepositoryResult<(String, Vec<SqlValue>)> {
    check_columns(table, values, columns)?;
    let names: Vec<&str> = values.keys().map(String::as_str).collect();
    let placeholders = names.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        names.join(", "),
        placeholders
    );
    let params = values.values().map(json_to_sql).collect();
    Ok((sql, params))
}

/// 构建按 id 更新的 UPDATE 语句
pub fn build_update(
    table: &str,
    id: i64,
    values: &FieldValues,
    columns: &[String],
) -> RepositoryResult<(String, Vec<SqlValue>)> {
    check_columns(table, values, columns)?;
    let assignments = values
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE {} SET {} WHERE id = ?", table, assignments);
    let mut params: Vec<SqlValue> = values.values().map(json_to_sql).collect();
    params.push(SqlValue::Integer(id));
    Ok((sql, params))
}
