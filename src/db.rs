// ==========================================
// 石材车间加工系统 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 建表语句幂等，可在每次启动时执行
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化全部表结构（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CORE_SCHEMA_SQL)?;
    conn.execute_batch(STOCK_MOVE_SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 使用旧版字段命名初始化库存移动表（name / product_uom_id / product_qty / quantity_done / qty_done）
///
/// 说明：只用于兼容旧库与测试字段探测逻辑，其余表与 init_schema 相同
pub fn init_schema_legacy_moves(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CORE_SCHEMA_SQL)?;
    conn.execute_batch(LEGACY_STOCK_MOVE_SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

// ==========================================
// 建表语句
// ==========================================

const CORE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS res_company (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS uom (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS product (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    default_code TEXT,
    tracking TEXT NOT NULL DEFAULT 'none',
    uom_id INTEGER REFERENCES uom(id)
);

CREATE TABLE IF NOT EXISTS stock_location (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    usage TEXT NOT NULL,
    company_id INTEGER REFERENCES res_company(id),
    xml_ref TEXT UNIQUE,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS stock_warehouse (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    code TEXT NOT NULL,
    company_id INTEGER NOT NULL REFERENCES res_company(id),
    lot_stock_id INTEGER REFERENCES stock_location(id)
);

CREATE TABLE IF NOT EXISTS stock_picking_type (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    code TEXT NOT NULL,
    sequence_code TEXT NOT NULL,
    warehouse_id INTEGER REFERENCES stock_warehouse(id),
    company_id INTEGER REFERENCES res_company(id),
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS stock_lot (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    product_id INTEGER NOT NULL REFERENCES product(id),
    company_id INTEGER REFERENCES res_company(id),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (name, product_id, company_id)
);

CREATE TABLE IF NOT EXISTS stock_quant (
    id INTEGER PRIMARY KEY,
    product_id INTEGER NOT NULL REFERENCES product(id),
    lot_id INTEGER REFERENCES stock_lot(id),
    location_id INTEGER NOT NULL REFERENCES stock_location(id),
    quantity REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS stock_picking (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '/',
    picking_type_id INTEGER NOT NULL REFERENCES stock_picking_type(id),
    location_id INTEGER NOT NULL REFERENCES stock_location(id),
    location_dest_id INTEGER NOT NULL REFERENCES stock_location(id),
    origin TEXT,
    state TEXT NOT NULL DEFAULT 'draft',
    company_id INTEGER REFERENCES res_company(id),
    date_done TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS ir_sequence (
    code TEXT PRIMARY KEY,
    prefix TEXT NOT NULL DEFAULT '',
    padding INTEGER NOT NULL DEFAULT 5,
    number_next INTEGER NOT NULL DEFAULT 1,
    number_increment INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS workshop_process (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    code TEXT NOT NULL UNIQUE,
    sequence INTEGER NOT NULL DEFAULT 10,
    process_type TEXT NOT NULL DEFAULT 'finish',
    active INTEGER NOT NULL DEFAULT 1,
    description TEXT,
    cost_per_sqm REAL,
    labor_cost REAL,
    color INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS workshop_order (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    state TEXT NOT NULL DEFAULT 'draft',
    company_id INTEGER NOT NULL,
    process_id INTEGER NOT NULL REFERENCES workshop_process(id),
    process_code TEXT,
    process_type TEXT,
    product_in_id INTEGER,
    lot_in_id INTEGER,
    lot_in_name TEXT,
    qty_in REAL,
    product_out_id INTEGER,
    lot_out_name TEXT,
    qty_out REAL,
    format_width TEXT,
    format_height TEXT,
    format_qty INTEGER NOT NULL DEFAULT 0,
    area_sqm REAL NOT NULL DEFAULT 0,
    process_cost REAL NOT NULL DEFAULT 0,
    labor_cost REAL,
    total_cost REAL NOT NULL DEFAULT 0,
    consume_picking_id INTEGER,
    produce_picking_id INTEGER,
    lot_out_id INTEGER,
    notes TEXT,
    user_id TEXT,
    date_planned TEXT,
    date_done TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_workshop_order_state ON workshop_order(state);

CREATE TABLE IF NOT EXISTS workshop_order_line (
    id INTEGER PRIMARY KEY,
    order_id INTEGER NOT NULL REFERENCES workshop_order(id) ON DELETE CASCADE,
    product_id INTEGER,
    width TEXT,
    height TEXT,
    qty INTEGER NOT NULL DEFAULT 1,
    area_sqm REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    order_id INTEGER,
    action_type TEXT NOT NULL,
    action_ts TEXT NOT NULL,
    actor TEXT NOT NULL,
    payload_json TEXT,
    detail TEXT
);

CREATE INDEX IF NOT EXISTS idx_action_log_order ON action_log(order_id, action_ts);
"#;

const STOCK_MOVE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS stock_move (
    id INTEGER PRIMARY KEY,
    picking_id INTEGER REFERENCES stock_picking(id) ON DELETE CASCADE,
    product_id INTEGER NOT NULL REFERENCES product(id),
    description_picking TEXT,
    product_uom INTEGER,
    product_uom_qty REAL NOT NULL DEFAULT 0,
    quantity REAL NOT NULL DEFAULT 0,
    location_id INTEGER NOT NULL REFERENCES stock_location(id),
    location_dest_id INTEGER NOT NULL REFERENCES stock_location(id),
    company_id INTEGER,
    state TEXT NOT NULL DEFAULT 'draft'
);

CREATE TABLE IF NOT EXISTS stock_move_line (
    id INTEGER PRIMARY KEY,
    move_id INTEGER REFERENCES stock_move(id) ON DELETE CASCADE,
    picking_id INTEGER REFERENCES stock_picking(id) ON DELETE CASCADE,
    product_id INTEGER NOT NULL REFERENCES product(id),
    lot_id INTEGER REFERENCES stock_lot(id),
    product_uom_id INTEGER,
    quantity REAL NOT NULL DEFAULT 0,
    location_id INTEGER NOT NULL REFERENCES stock_location(id),
    location_dest_id INTEGER NOT NULL REFERENCES stock_location(id),
    state TEXT NOT NULL DEFAULT 'draft'
);
"#;

const LEGACY_STOCK_MOVE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS stock_move (
    id INTEGER PRIMARY KEY,
    picking_id INTEGER REFERENCES stock_picking(id) ON DELETE CASCADE,
    product_id INTEGER NOT NULL REFERENCES product(id),
    name TEXT,
    product_uom_id INTEGER,
    product_qty REAL NOT NULL DEFAULT 0,
    quantity_done REAL NOT NULL DEFAULT 0,
    location_id INTEGER NOT NULL REFERENCES stock_location(id),
    location_dest_id INTEGER NOT NULL REFERENCES stock_location(id),
    company_id INTEGER,
    state TEXT NOT NULL DEFAULT 'draft'
);

CREATE TABLE IF NOT EXISTS stock_move_line (
    id INTEGER PRIMARY KEY,
    move_id INTEGER REFERENCES stock_move(id) ON DELETE CASCADE,
    picking_id INTEGER REFERENCES stock_picking(id) ON DELETE CASCADE,
    product_id INTEGER NOT NULL REFERENCES product(id),
    lot_id INTEGER REFERENCES stock_lot(id),
    product_uom INTEGER,
    qty_done REAL NOT NULL DEFAULT 0,
    location_id INTEGER NOT NULL REFERENCES stock_location(id),
    location_dest_id INTEGER NOT NULL REFERENCES stock_location(id),
    state TEXT NOT NULL DEFAULT 'draft'
);
"#;
