// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、库存基础数据（公司/仓库/库位/作业类型/产品/批次/库存）
// ==========================================
#![allow(dead_code)]

use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

pub const COMPANY_ID: i64 = 1;
pub const STOCK_LOCATION_ID: i64 = 10;
pub const GLOBAL_PRODUCTION_LOCATION_ID: i64 = 30;
pub const COMPANY_PRODUCTION_LOCATION_ID: i64 = 31;
pub const WAREHOUSE_ID: i64 = 1;
pub const INTERNAL_PICKING_TYPE_ID: i64 = 5;
pub const BLOCK_PRODUCT_ID: i64 = 100; // 投入: 荒料（批次追溯）
pub const SLAB_PRODUCT_ID: i64 = 101; // 产出: 板材（批次追溯）
pub const GRIT_PRODUCT_ID: i64 = 102; // 磨料（不追溯）
pub const LOT_IN_ID: i64 = 500;
pub const SLAB_LOT_ID: i64 = 501; // 属于板材的批次
pub const LOT_IN_NAME: &str = "B-0042";
pub const LOT_IN_QTY: f64 = 12.5;

/// 基础数据选项
#[derive(Debug, Clone, Copy)]
pub struct SeedOptions {
    /// 是否创建公司仓库
    pub with_warehouse: bool,
    /// 是否创建公司自己的生产库位（否则只有全局引用 stock.location_production）
    pub company_production_location: bool,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            with_warehouse: true,
            company_production_location: false,
        }
    }
}

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    stone_workshop::logging::init_test();
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();

    let conn = stone_workshop::db::open_sqlite_connection(&db_path)?;
    stone_workshop::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 创建使用旧版移动字段命名的临时数据库
pub fn create_legacy_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    stone_workshop::logging::init_test();
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();

    let conn = stone_workshop::db::open_sqlite_connection(&db_path)?;
    stone_workshop::db::init_schema_legacy_moves(&conn)?;

    Ok((temp_file, db_path))
}

/// 写入库存基础数据
pub fn seed_stock(db_path: &str, options: SeedOptions) -> Result<(), Box<dyn Error>> {
    let conn = stone_workshop::db::open_sqlite_connection(db_path)?;

    conn.execute_batch(
        r#"
        INSERT INTO res_company (id, name) VALUES (1, 'Marmoles del Sur');
        INSERT INTO uom (id, name) VALUES (1, 'm2');
        INSERT INTO product (id, name, default_code, tracking, uom_id) VALUES
            (100, 'Bloque Crema Marfil', 'BLK-CM', 'lot', 1),
            (101, 'Tabla Crema Marfil', 'TAB-CM', 'lot', 1),
            (102, 'Abrasivo', 'ABR', 'none', 1);
        INSERT INTO stock_location (id, name, usage, company_id) VALUES
            (10, 'WH/Stock', 'internal', 1);
        INSERT INTO stock_location (id, name, usage, company_id, xml_ref) VALUES
            (30, 'Virtual Locations/Production', 'production', NULL, 'stock.location_production');
        "#,
    )?;

    if options.company_production_location {
        conn.execute(
            "INSERT INTO stock_location (id, name, usage, company_id) VALUES (?1, 'Taller/Produccion', 'production', ?2)",
            params![COMPANY_PRODUCTION_LOCATION_ID, COMPANY_ID],
        )?;
    }

    if options.with_warehouse {
        conn.execute(
            "INSERT INTO stock_warehouse (id, name, code, company_id, lot_stock_id) VALUES (?1, 'Almacen', 'WH', ?2, ?3)",
            params![WAREHOUSE_ID, COMPANY_ID, STOCK_LOCATION_ID],
        )?;
        conn.execute(
            "INSERT INTO stock_picking_type (id, name, code, sequence_code, warehouse_id, company_id)
             VALUES (?1, 'Internal Transfers', 'internal', 'INT', ?2, ?3)",
            params![INTERNAL_PICKING_TYPE_ID, WAREHOUSE_ID, COMPANY_ID],
        )?;
    } else {
        conn.execute(
            "INSERT INTO stock_picking_type (id, name, code, sequence_code, warehouse_id, company_id)
             VALUES (?1, 'Internal Transfers', 'internal', 'INT', NULL, ?2)",
            params![INTERNAL_PICKING_TYPE_ID, COMPANY_ID],
        )?;
    }

    conn.execute(
        "INSERT INTO stock_lot (id, name, product_id, company_id) VALUES (?1, ?2, ?3, ?4)",
        params![LOT_IN_ID, LOT_IN_NAME, BLOCK_PRODUCT_ID, COMPANY_ID],
    )?;
    conn.execute(
        "INSERT INTO stock_lot (id, name, product_id, company_id) VALUES (?1, 'T-0007', ?2, ?3)",
        params![SLAB_LOT_ID, SLAB_PRODUCT_ID, COMPANY_ID],
    )?;
    conn.execute(
        "INSERT INTO stock_quant (product_id, lot_id, location_id, quantity) VALUES (?1, ?2, ?3, ?4)",
        params![BLOCK_PRODUCT_ID, LOT_IN_ID, STOCK_LOCATION_ID, LOT_IN_QTY],
    )?;

    Ok(())
}

/// 指定产品/批次/库位的库存数量
pub fn quant(conn: &Arc<Mutex<Connection>>, product_id: i64, lot_id: Option<i64>, location_id: i64) -> f64 {
    conn.lock()
        .unwrap()
        .query_row(
            "SELECT COALESCE(SUM(quantity), 0) FROM stock_quant
             WHERE product_id = ?1 AND lot_id IS ?2 AND location_id = ?3",
            params![product_id, lot_id, location_id],
            |row| row.get(0),
        )
        .unwrap()
}

/// 表行数
pub fn count_rows(conn: &Arc<Mutex<Connection>>, table: &str) -> i64 {
    conn.lock()
        .unwrap()
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}
