// ==========================================
// 石材车间加工系统 - 库存登记仓储
// ==========================================
// 职责: InventoryRegistry / WarehouseRegistry 的 SQLite 实现
// 对齐: product / stock_lot / stock_quant / stock_location /
//       stock_warehouse / stock_picking_type 表
// ==========================================

use crate::domain::stock::{LotAvailability, PickingType, Product, StockLocation, StockLot, Warehouse};
use crate::domain::types::{LocationUsage, ProductTracking};
use crate::engine::collaborators::{InventoryRegistry, WarehouseRegistry};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};
use tracing::debug;

const LOCATION_COLUMNS: &str = "id, name, usage, company_id, xml_ref, active";
const PICKING_TYPE_COLUMNS: &str = "id, name, code, sequence_code, warehouse_id, company_id";

// ==========================================
// StockRegistryRepository
// ==========================================
pub struct StockRegistryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StockRegistryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_location(row: &Row) -> SqliteResult<StockLocation> {
        Ok(StockLocation {
            location_id: row.get(0)?,
            name: row.get(1)?,
            usage: LocationUsage::from_str(&row.get::<_, String>(2)?),
            company_id: row.get(3)?,
            xml_ref: row.get(4)?,
            active: row.get(5)?,
        })
    }

    fn map_picking_type(row: &Row) -> SqliteResult<PickingType> {
        Ok(PickingType {
            picking_type_id: row.get(0)?,
            name: row.get(1)?,
            code: row.get(2)?,
            sequence_code: row.get(3)?,
            warehouse_id: row.get(4)?,
            company_id: row.get(5)?,
        })
    }

    fn map_lot(row: &Row) -> SqliteResult<StockLot> {
        Ok(StockLot {
            lot_id: row.get(0)?,
            name: row.get(1)?,
            product_id: row.get(2)?,
            company_id: row.get(3)?,
        })
    }

    /// 批次在指定库位的数量
    pub fn quant_qty(&self, lot_id: i64, location_id: i64) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;
        Ok(conn.query_row(
            "SELECT COALESCE(SUM(quantity), 0) FROM stock_quant WHERE lot_id = ?1 AND location_id = ?2",
            params![lot_id, location_id],
            |row| row.get(0),
        )?)
    }

    pub fn find_lot_by_name(&self, name: &str, product_id: i64) -> RepositoryResult<Option<StockLot>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id, name, product_id, company_id FROM stock_lot
                 WHERE name = ?1 AND product_id = ?2 ORDER BY id LIMIT 1",
                params![name, product_id],
                |row| Self::map_lot(row),
            )
            .optional()?)
    }
}

// ==========================================
// InventoryRegistry 实现
// ==========================================
impl InventoryRegistry for StockRegistryRepository {
    fn on_hand_qty(&self, lot_id: i64) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;
        Ok(conn.query_row(
            "SELECT COALESCE(SUM(q.quantity), 0)
             FROM stock_quant q JOIN stock_location l ON l.id = q.location_id
             WHERE q.lot_id = ?1 AND l.usage = 'internal'",
            params![lot_id],
            |row| row.get(0),
        )?)
    }

    fn find_lot(&self, lot_id: i64) -> RepositoryResult<Option<StockLot>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id, name, product_id, company_id FROM stock_lot WHERE id = ?1",
                params![lot_id],
                |row| Self::map_lot(row),
            )
            .optional()?)
    }

    fn find_product(&self, product_id: i64) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id, name, default_code, tracking, uom_id FROM product WHERE id = ?1",
                params![product_id],
                |row| {
                    Ok(Product {
                        product_id: row.get(0)?,
                        name: row.get(1)?,
                        default_code: row.get(2)?,
                        tracking: ProductTracking::from_str(&row.get::<_, String>(3)?),
                        uom_id: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    /// 只汇总正数量的库存行；无批次的库存忽略
    fn available_lots(&self, product_id: i64) -> RepositoryResult<Vec<LotAvailability>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT lot.id, lot.name, SUM(q.quantity)
             FROM stock_quant q
             JOIN stock_location l ON l.id = q.location_id
             JOIN stock_lot lot ON lot.id = q.lot_id
             WHERE q.product_id = ?1 AND l.usage = 'internal' AND q.quantity > 0
             GROUP BY lot.id, lot.name
             ORDER BY lot.name",
        )?;
        let lots = stmt
            .query_map(params![product_id], |row| {
                Ok(LotAvailability {
                    lot_id: row.get(0)?,
                    name: row.get(1)?,
                    qty: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(lots)
    }

    fn find_or_create_lot(&self, name: &str, product_id: i64, company_id: i64) -> RepositoryResult<StockLot> {
        let conn = self.get_conn()?;
        let existing = conn
            .query_row(
                "SELECT id, name, product_id, company_id FROM stock_lot
                 WHERE name = ?1 AND product_id = ?2 AND company_id = ?3",
                params![name, product_id, company_id],
                |row| Self::map_lot(row),
            )
            .optional()?;
        if let Some(lot) = existing {
            debug!(lot = %lot.name, "复用已有批次");
            return Ok(lot);
        }

        conn.execute(
            "INSERT INTO stock_lot (name, product_id, company_id) VALUES (?1, ?2, ?3)",
            params![name, product_id, company_id],
        )?;
        Ok(StockLot {
            lot_id: conn.last_insert_rowid(),
            name: name.to_string(),
            product_id,
            company_id: Some(company_id),
        })
    }
}

// ==========================================
// WarehouseRegistry 实现
// ==========================================
impl WarehouseRegistry for StockRegistryRepository {
    /// 公司仓库（多个时取最小 id）
    fn warehouse_for_company(&self, company_id: i64) -> RepositoryResult<Option<Warehouse>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id, name, code, company_id, lot_stock_id FROM stock_warehouse
                 WHERE company_id = ?1 ORDER BY id LIMIT 1",
                params![company_id],
                |row| {
                    Ok(Warehouse {
                        warehouse_id: row.get(0)?,
                        name: row.get(1)?,
                        code: row.get(2)?,
                        company_id: row.get(3)?,
                        lot_stock_id: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    fn find_location(&self, location_id: i64) -> RepositoryResult<Option<StockLocation>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM stock_location WHERE id = ?1", LOCATION_COLUMNS);
        Ok(conn
            .query_row(&sql, params![location_id], |row| Self::map_location(row))
            .optional()?)
    }

    fn find_location_by_ref(&self, xml_ref: &str) -> RepositoryResult<Option<StockLocation>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM stock_location WHERE xml_ref = ?1 AND active = 1",
            LOCATION_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![xml_ref], |row| Self::map_location(row))
            .optional()?)
    }

    fn production_location_for_company(&self, company_id: i64) -> RepositoryResult<Option<StockLocation>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM stock_location
             WHERE usage = 'production' AND company_id = ?1 AND active = 1
             ORDER BY id LIMIT 1",
            LOCATION_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![company_id], |row| Self::map_location(row))
            .optional()?)
    }

    fn operation_type_for_warehouse(&self, warehouse_id: i64, code: &str) -> RepositoryResult<Option<PickingType>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM stock_picking_type
             WHERE code = ?1 AND warehouse_id = ?2 AND active = 1
             ORDER BY id LIMIT 1",
            PICKING_TYPE_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![code, warehouse_id], |row| Self::map_picking_type(row))
            .optional()?)
    }

    fn operation_type_for_company(&self, company_id: i64, code: &str) -> RepositoryResult<Option<PickingType>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM stock_picking_type
             WHERE code = ?1 AND active = 1
               AND (company_id = ?2
                    OR warehouse_id IN (SELECT id FROM stock_warehouse WHERE company_id = ?2))
             ORDER BY id LIMIT 1",
            PICKING_TYPE_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![code, company_id], |row| Self::map_picking_type(row))
            .optional()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> StockRegistryRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO res_company (id, name) VALUES (1, 'Marmoles'), (2, 'Granitos');
            INSERT INTO product (id, name, tracking) VALUES (1, 'Bloque', 'lot');
            INSERT INTO stock_location (id, name, usage, company_id) VALUES
                (10, 'WH/Stock', 'internal', 1),
                (11, 'Partners/Customers', 'customer', NULL),
                (30, 'Virtual/Production', 'production', NULL);
            UPDATE stock_location SET xml_ref = 'stock.location_production' WHERE id = 30;
            INSERT INTO stock_warehouse (id, name, code, company_id, lot_stock_id) VALUES (1, 'Main', 'WH', 1, 10);
            INSERT INTO stock_picking_type (id, name, code, sequence_code, warehouse_id, company_id) VALUES
                (5, 'Internal', 'internal', 'INT', NULL, 1);
            INSERT INTO stock_lot (id, name, product_id, company_id) VALUES (100, 'B-0042', 1, 1);
            INSERT INTO stock_quant (product_id, lot_id, location_id, quantity) VALUES
                (1, 100, 10, 8.0), (1, 100, 10, 4.5), (1, 100, 11, 3.0);
            "#,
        )
        .unwrap();
        StockRegistryRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_on_hand_counts_internal_only() {
        assert_eq!(setup().on_hand_qty(100).unwrap(), 12.5);
    }

    #[test]
    fn test_available_lots_sum_positive_internal_quants() {
        let repo = setup();
        {
            let conn = repo.get_conn().unwrap();
            conn.execute_batch(
                r#"
                INSERT INTO stock_lot (id, name, product_id, company_id) VALUES
                    (101, 'A-0001', 1, 1), (102, 'C-0003', 1, 1);
                INSERT INTO stock_quant (product_id, lot_id, location_id, quantity) VALUES
                    (1, 101, 10, -2.0),
                    (1, 102, 10, 6.0),
                    (1, 102, 10, -1.0),
                    (1, NULL, 10, 9.0);
                "#,
            )
            .unwrap();
        }

        let lots = repo.available_lots(1).unwrap();
        let summary: Vec<(i64, &str, f64)> = lots.iter().map(|l| (l.lot_id, l.name.as_str(), l.qty)).collect();
        assert_eq!(summary, vec![(100, "B-0042", 12.5), (102, "C-0003", 6.0)]);
        assert!(repo.available_lots(2).unwrap().is_empty());
    }

    #[test]
    fn test_find_or_create_lot_reuses() {
        let repo = setup();
        let a = repo.find_or_create_lot("B-0042-PUL", 1, 1).unwrap();
        let b = repo.find_or_create_lot("B-0042-PUL", 1, 1).unwrap();
        assert_eq!(a.lot_id, b.lot_id);
        assert_eq!(repo.find_lot_by_name("B-0042-PUL", 1).unwrap().unwrap().lot_id, a.lot_id);
    }

    #[test]
    fn test_warehouse_lookup_by_company() {
        let repo = setup();
        assert_eq!(repo.warehouse_for_company(1).unwrap().unwrap().code, "WH");
        assert!(repo.warehouse_for_company(2).unwrap().is_none());
        assert!(repo.production_location_for_company(1).unwrap().is_none());
        assert_eq!(
            repo.find_location_by_ref("stock.location_production").unwrap().unwrap().location_id,
            30
        );
    }

    #[test]
    fn test_operation_type_scopes() {
        let repo = setup();
        assert!(repo.operation_type_for_warehouse(1, "internal").unwrap().is_none());
        assert_eq!(
            repo.operation_type_for_company(1, "internal").unwrap().unwrap().picking_type_id,
            5
        );
        assert!(repo.operation_type_for_company(2, "internal").unwrap().is_none());
    }
}
