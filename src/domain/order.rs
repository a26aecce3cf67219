// ==========================================
// 石材车间加工系统 - 加工单领域模型
// ==========================================
// 用途: 一张加工单把一个投入批次经某工艺加工为一个产出批次
// 对齐: workshop_order / workshop_order_line 表
// ==========================================
// 红线: area_sqm / process_cost / total_cost 只能由计算器派生，不可单独编辑
// 红线: 状态为 done 时工艺、投入/产出产品、批次与数量不可变更
// ==========================================

use crate::domain::types::{OrderState, ProcessType};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// WorkshopOrder - 加工单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkshopOrder {
    // ===== 标识 =====
    pub order_id: i64,
    pub name: String, // 参考号（序列生成）
    pub state: OrderState,
    pub company_id: i64,

    // ===== 工艺 =====
    pub process_id: i64,
    pub process_code: Option<String>,       // 冗余: 工艺代码
    pub process_type: Option<ProcessType>,  // 冗余: 工艺类型

    // ===== 投入 =====
    pub product_in_id: Option<i64>,
    pub lot_in_id: Option<i64>,
    pub lot_in_name: Option<String>, // 冗余: 投入批次号
    pub qty_in: Option<f64>,

    // ===== 产出 =====
    pub product_out_id: Option<i64>,
    pub lot_out_name: Option<String>, // 派生: {投入批次}-{工艺代码}
    pub qty_out: Option<f64>,

    // ===== 规格（仅切割）=====
    pub format_width: Option<String>,  // 宽 (cm)，自由文本
    pub format_height: Option<String>, // 高 (cm)，自由文本
    pub format_qty: i32,               // 片数

    // ===== 成本（派生）=====
    pub area_sqm: f64,
    pub process_cost: f64,
    pub labor_cost: Option<f64>, // 人工成本（手工录入）
    pub total_cost: f64,

    // ===== 完工关联（仅完工时写入）=====
    pub consume_picking_id: Option<i64>,
    pub produce_picking_id: Option<i64>,
    pub lot_out_id: Option<i64>,

    // ===== 其他 =====
    pub notes: Option<String>,
    pub user_id: Option<String>, // 负责人
    pub date_planned: Option<NaiveDateTime>,
    pub date_done: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 确认时缺失的字段类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingField {
    InputProductOrLot, // 投入产品或批次
    OutputProduct,     // 产出产品
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::InputProductOrLot => write!(f, "input_product_lot"),
            MissingField::OutputProduct => write!(f, "output_product"),
        }
    }
}

impl WorkshopOrder {
    /// 创建草稿加工单（尚未持久化）
    pub fn new_draft(name: String, process_id: i64, company_id: i64, now: NaiveDateTime) -> Self {
        Self {
            order_id: 0,
            name,
            state: OrderState::Draft,
            company_id,
            process_id,
            process_code: None,
            process_type: None,
            product_in_id: None,
            lot_in_id: None,
            lot_in_name: None,
            qty_in: None,
            product_out_id: None,
            lot_out_name: None,
            qty_out: None,
            format_width: None,
            format_height: None,
            format_qty: 0,
            area_sqm: 0.0,
            process_cost: 0.0,
            labor_cost: None,
            total_cost: 0.0,
            consume_picking_id: None,
            produce_picking_id: None,
            lot_out_id: None,
            notes: None,
            user_id: None,
            date_planned: None,
            date_done: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 确认前检查必填字段，按类别返回缺失项
    pub fn missing_confirm_fields(&self) -> Vec<MissingField> {
        let mut missing = Vec::new();
        if self.product_in_id.is_none() || self.lot_in_id.is_none() {
            missing.push(MissingField::InputProductOrLot);
        }
        if self.product_out_id.is_none() {
            missing.push(MissingField::OutputProduct);
        }
        missing
    }

    /// 工艺是否已锁定（完工后不可改）
    pub fn is_process_locked(&self) -> bool {
        self.state == OrderState::Done
    }

    /// 物化输入是否已锁定（完工后投入/产出与数量须与移库单一致）
    pub fn is_production_locked(&self) -> bool {
        self.state == OrderState::Done
    }

    pub fn is_materialized(&self) -> bool {
        self.consume_picking_id.is_some() && self.produce_picking_id.is_some()
    }
}

// ==========================================
// WorkshopOrderLine - 多规格明细行
// ==========================================
// 与表头相同的解析与面积公式；随表头级联删除；不回写成本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkshopOrderLine {
    pub line_id: i64,
    pub order_id: i64,
    pub product_id: Option<i64>, // 规格产品
    pub width: Option<String>,   // 宽 (cm)
    pub height: Option<String>,  // 高 (cm)
    pub qty: i32,                // 片数（默认 1）
    pub area_sqm: f64,
}

impl WorkshopOrderLine {
    pub fn new(order_id: i64) -> Self {
        Self {
            line_id: 0,
            order_id,
            product_id: None,
            width: None,
            height: None,
            qty: 1,
            area_sqm: 0.0,
        }
    }
}

// ==========================================
// OrderStats - 看板统计
// ==========================================
/// 未取消加工单的计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStats {
    pub in_progress: i64,
    pub done: i64,
    pub finish: i64, // 表面加工
    pub cut: i64,    // 切割
}
