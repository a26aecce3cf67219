// ==========================================
// 石材车间加工系统 - 移库字段探测
// ==========================================
// 背景: 不同版本的库存系统对同一语义字段使用不同名称
//   - 移动描述: description_picking | name
//   - 移动单位: product_uom | product_uom_id
//   - 需求数量: product_uom_qty | product_qty
//   - 完成数量: quantity | quantity_done（可缺省）
//   - 明细单位: product_uom_id | product_uom
//   - 明细数量: quantity | qty_done | quantity_done
// 红线: 构造时探测一次并缓存，之后不再按调用重复探测
// ==========================================

use crate::engine::collaborators::{FieldValues, MovementEntity};
use crate::engine::error::{EngineError, EngineResult};
use serde_json::json;

const MOVE_DESCRIPTION: &[&str] = &["description_picking", "name"];
const MOVE_UOM: &[&str] = &["product_uom", "product_uom_id"];
const MOVE_DEMAND_QTY: &[&str] = &["product_uom_qty", "product_qty"];
const MOVE_DONE_QTY: &[&str] = &["quantity", "quantity_done"];
const LINE_UOM: &[&str] = &["product_uom_id", "product_uom"];
const LINE_QTY: &[&str] = &["quantity", "qty_done", "quantity_done"];

/// 移动实体的必备字段（不随版本变化）
const MOVE_REQUIRED: &[&str] = &["picking_id", "product_id", "location_id", "location_dest_id"];
const LINE_REQUIRED: &[&str] = &[
    "move_id",
    "picking_id",
    "product_id",
    "lot_id",
    "location_id",
    "location_dest_id",
];

/// 一次移动的业务参数
#[derive(Debug, Clone, PartialEq)]
pub struct MoveSpec {
    pub product_id: i64,
    pub uom_id: Option<i64>,
    pub quantity: f64,
    pub location_id: i64,
    pub location_dest_id: i64,
    pub company_id: i64,
    pub description: String,
}

/// 移动的实际字段名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveFields {
    pub description: Option<String>,
    pub uom: Option<String>,
    pub demand_qty: String,
    pub done_qty: Option<String>,
    pub has_company: bool,
}

/// 明细行的实际字段名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFields {
    pub uom: Option<String>,
    pub qty: String,
}

// ==========================================
// MovementSchema - 归一化后的字段访问器
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementSchema {
    pub moves: MoveFields,
    pub lines: LineFields,
}

fn pick(available: &[String], candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find(|c| available.iter().any(|a| a == *c))
        .map(|c| c.to_string())
}

fn require(available: &[String], candidates: &[&str], entity: MovementEntity) -> EngineResult<String> {
    pick(available, candidates).ok_or_else(|| EngineError::UnsupportedSchema {
        entity: entity.to_string(),
        field: candidates.join("|"),
    })
}

impl MovementSchema {
    /// 从实时字段列表探测字段名
    ///
    /// # 参数
    /// - `move_fields`: 移动实体字段
    /// - `line_fields`: 明细行实体字段
    ///
    /// # 返回
    /// - 缺少必备字段或数量字段时返回 UnsupportedSchema
    pub fn detect(move_fields: &[String], line_fields: &[String]) -> EngineResult<Self> {
        for field in MOVE_REQUIRED {
            require(move_fields, &[field], MovementEntity::Move)?;
        }
        for field in LINE_REQUIRED {
            require(line_fields, &[field], MovementEntity::MoveLine)?;
        }

        let moves = MoveFields {
            description: pick(move_fields, MOVE_DESCRIPTION),
            uom: pick(move_fields, MOVE_UOM),
            demand_qty: require(move_fields, MOVE_DEMAND_QTY, MovementEntity::Move)?,
            done_qty: pick(move_fields, MOVE_DONE_QTY),
            has_company: move_fields.iter().any(|f| f == "company_id"),
        };
        let lines = LineFields {
            uom: pick(line_fields, LINE_UOM),
            qty: require(line_fields, LINE_QTY, MovementEntity::MoveLine)?,
        };

        Ok(Self { moves, lines })
    }

    /// 构造创建移动的载荷
    pub fn move_values(&self, picking_id: i64, spec: &MoveSpec) -> FieldValues {
        let mut values = FieldValues::new();
        values.insert("picking_id".to_string(), json!(picking_id));
        values.insert("product_id".to_string(), json!(spec.product_id));
        values.insert("location_id".to_string(), json!(spec.location_id));
        values.insert("location_dest_id".to_string(), json!(spec.location_dest_id));
        values.insert(self.moves.demand_qty.clone(), json!(spec.quantity));
        if let Some(field) = &self.moves.description {
            values.insert(field.clone(), json!(spec.description));
        }
        if let (Some(field), Some(uom_id)) = (&self.moves.uom, spec.uom_id) {
            values.insert(field.clone(), json!(uom_id));
        }
        if self.moves.has_company {
            values.insert("company_id".to_string(), json!(spec.company_id));
        }
        values
    }

    /// 构造写入已有明细行的载荷（批次 + 数量）
    pub fn line_update_values(&self, lot_id: Option<i64>, quantity: f64) -> FieldValues {
        let mut values = FieldValues::new();
        values.insert("lot_id".to_string(), json!(lot_id));
        values.insert(self.lines.qty.clone(), json!(quantity));
        values
    }

    /// 构造显式创建明细行的载荷
    pub fn line_create_values(
        &self,
        picking_id: i64,
        move_id: i64,
        spec: &MoveSpec,
        lot_id: Option<i64>,
    ) -> FieldValues {
        let mut values = self.line_update_values(lot_id, spec.quantity);
        values.insert("move_id".to_string(), json!(move_id));
        values.insert("picking_id".to_string(), json!(picking_id));
        values.insert("product_id".to_string(), json!(spec.product_id));
        values.insert("location_id".to_string(), json!(spec.location_id));
        values.insert("location_dest_id".to_string(), json!(spec.location_dest_id));
        if let (Some(field), Some(uom_id)) = (&self.lines.uom, spec.uom_id) {
            values.insert(field.clone(), json!(uom_id));
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn spec() -> MoveSpec {
        MoveSpec {
            product_id: 7,
            uom_id: Some(1),
            quantity: 12.5,
            location_id: 10,
            location_dest_id: 20,
            company_id: 1,
            description: "WS/00001".to_string(),
        }
    }

    #[test]
    fn test_detect_current_names() {
        let schema = MovementSchema::detect(
            &names(&[
                "id", "picking_id", "product_id", "description_picking", "product_uom",
                "product_uom_qty", "quantity", "location_id", "location_dest_id", "company_id",
            ]),
            &names(&[
                "id", "move_id", "picking_id", "product_id", "lot_id", "product_uom_id", "quantity",
                "location_id", "location_dest_id",
            ]),
        )
        .unwrap();

        assert_eq!(schema.moves.description.as_deref(), Some("description_picking"));
        assert_eq!(schema.moves.uom.as_deref(), Some("product_uom"));
        assert_eq!(schema.moves.demand_qty, "product_uom_qty");
        assert_eq!(schema.lines.qty, "quantity");

        let values = schema.move_values(3, &spec());
        assert_eq!(values["product_uom_qty"], json!(12.5));
        assert_eq!(values["description_picking"], json!("WS/00001"));
        assert_eq!(values["company_id"], json!(1));
        assert!(!values.contains_key("name"));
    }

    #[test]
    fn test_detect_legacy_names() {
        let schema = MovementSchema::detect(
            &names(&[
                "picking_id", "product_id", "name", "product_uom_id", "product_qty", "quantity_done",
                "location_id", "location_dest_id",
            ]),
            &names(&[
                "move_id", "picking_id", "product_id", "lot_id", "product_uom", "qty_done",
                "location_id", "location_dest_id",
            ]),
        )
        .unwrap();

        assert_eq!(schema.moves.description.as_deref(), Some("name"));
        assert_eq!(schema.moves.uom.as_deref(), Some("product_uom_id"));
        assert_eq!(schema.moves.demand_qty, "product_qty");
        assert_eq!(schema.moves.done_qty.as_deref(), Some("quantity_done"));
        assert!(!schema.moves.has_company);

        let line = schema.line_create_values(3, 4, &spec(), Some(9));
        assert_eq!(line["qty_done"], json!(12.5));
        assert_eq!(line["product_uom"], json!(1));
        assert_eq!(line["lot_id"], json!(9));
    }

    #[test]
    fn test_missing_quantity_field_is_unsupported() {
        let err = MovementSchema::detect(
            &names(&["picking_id", "product_id", "location_id", "location_dest_id"]),
            &names(&["move_id", "picking_id", "product_id", "lot_id", "location_id", "location_dest_id", "quantity"]),
        )
        .unwrap_err();
        match err {
            EngineError::UnsupportedSchema { entity, field } => {
                assert_eq!(entity, "stock_move");
                assert_eq!(field, "product_uom_qty|product_qty");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
