// ==========================================
// 石材车间加工系统 - 面积/成本计算器
// ==========================================
// 红线: 面积、工艺成本、总成本只能由本模块派生
// 红线: 纯函数，任何输入变化后整体重算
// ==========================================

use crate::domain::order::{WorkshopOrder, WorkshopOrderLine};
use crate::domain::process::WorkshopProcess;
use crate::domain::types::ProcessType;
use crate::engine::dimension::parse_dimension;
use serde::{Deserialize, Serialize};

/// 成本派生结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub area_sqm: f64,
    pub process_cost: f64,
    pub total_cost: f64,
}

// ==========================================
// CostCalculator - 面积/成本计算器
// ==========================================
pub struct CostCalculator;

impl CostCalculator {
    /// 计算加工面积（m²）
    ///
    /// - 切割: 宽/100 × 高/100 × 片数，三者均非零才有效，否则 0
    /// - 其他: 投入数量 > 0 时取投入数量，否则 0
    pub fn compute_area(
        process_type: Option<ProcessType>,
        qty_in: Option<f64>,
        width: Option<&str>,
        height: Option<&str>,
        piece_count: i32,
    ) -> f64 {
        if process_type == Some(ProcessType::Cut) {
            return Self::geometry_area(width, height, piece_count);
        }
        match qty_in {
            Some(q) if q > 0.0 => q,
            _ => 0.0,
        }
    }

    /// 工艺成本与总成本
    pub fn compute_costs(area: f64, cost_per_sqm: Option<f64>, labor_cost: Option<f64>) -> (f64, f64) {
        let process_cost = area * cost_per_sqm.unwrap_or(0.0);
        let total_cost = process_cost + labor_cost.unwrap_or(0.0);
        (process_cost, total_cost)
    }

    /// 明细行面积（与表头切割公式一致）
    pub fn compute_line_area(width: Option<&str>, height: Option<&str>, qty: i32) -> f64 {
        Self::geometry_area(width, height, qty)
    }

    fn geometry_area(width: Option<&str>, height: Option<&str>, pieces: i32) -> f64 {
        let w = parse_dimension(width);
        let h = parse_dimension(height);
        if w != 0.0 && h != 0.0 && pieces != 0 {
            (w / 100.0) * (h / 100.0) * f64::from(pieces)
        } else {
            0.0
        }
    }

    /// 产出批次号: {投入批次}-{工艺代码}，任一缺失则为 None
    pub fn output_lot_name(lot_in_name: Option<&str>, process_code: Option<&str>) -> Option<String> {
        match (lot_in_name, process_code) {
            (Some(lot), Some(code)) if !lot.is_empty() && !code.is_empty() => {
                Some(format!("{}-{}", lot, code))
            }
            _ => None,
        }
    }

    /// 产出数量: 显式产出 > 投入 > 1
    pub fn resolve_output_qty(qty_out: Option<f64>, qty_in: Option<f64>) -> f64 {
        match (qty_out, qty_in) {
            (Some(out), _) if out > 0.0 => out,
            (_, Some(inp)) if inp > 0.0 => inp,
            _ => 1.0,
        }
    }

    /// 消耗数量: 显式投入，否则取产出数量
    pub fn resolve_input_qty(qty_in: Option<f64>, output_qty: f64) -> f64 {
        match qty_in {
            Some(q) if q > 0.0 => q,
            _ => output_qty,
        }
    }

    /// 对加工单做完整派生重算（面积、成本、产出批次号、工艺冗余字段）
    pub fn recompute(order: &mut WorkshopOrder, process: Option<&WorkshopProcess>) -> CostBreakdown {
        if let Some(p) = process {
            order.process_code = Some(p.code.clone());
            order.process_type = Some(p.process_type);
        }

        let area = Self::compute_area(
            order.process_type,
            order.qty_in,
            order.format_width.as_deref(),
            order.format_height.as_deref(),
            order.format_qty,
        );
        let (process_cost, total_cost) =
            Self::compute_costs(area, process.and_then(|p| p.cost_per_sqm), order.labor_cost);

        order.area_sqm = area;
        order.process_cost = process_cost;
        order.total_cost = total_cost;
        order.lot_out_name =
            Self::output_lot_name(order.lot_in_name.as_deref(), order.process_code.as_deref());

        CostBreakdown {
            area_sqm: area,
            process_cost,
            total_cost,
        }
    }

    pub fn recompute_line(line: &mut WorkshopOrderLine) {
        line.area_sqm =
            Self::compute_line_area(line.width.as_deref(), line.height.as_deref(), line.qty);
    }
}
