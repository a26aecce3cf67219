// ==========================================
// 石材车间加工系统 - 工艺目录领域模型
// ==========================================
// 用途: 加工单引用的工艺（表面加工/切割），带单位面积成本
// 对齐: workshop_process 表
// ==========================================

use crate::domain::types::ProcessType;
use serde::{Deserialize, Serialize};

/// 工艺默认排序键
pub const DEFAULT_PROCESS_SEQUENCE: i32 = 10;

// ==========================================
// WorkshopProcess - 工艺
// ==========================================
// 红线: code 唯一，用于生成产出批次号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkshopProcess {
    pub process_id: i64,
    pub name: String,
    pub code: String,                // 短代码，例如 ACB / CRT
    pub sequence: i32,               // 排序键
    pub process_type: ProcessType,
    pub active: bool,
    pub description: Option<String>,
    pub cost_per_sqm: Option<f64>,   // 单位面积成本
    pub labor_cost: Option<f64>,     // 人工成本基准
    pub color: i32,                  // 看板颜色
}

impl WorkshopProcess {
    /// 创建新的工艺（尚未持久化，process_id=0）
    pub fn new(name: &str, code: &str, process_type: ProcessType, cost_per_sqm: Option<f64>) -> Self {
        Self {
            process_id: 0,
            name: name.trim().to_string(),
            code: code.trim().to_string(),
            sequence: DEFAULT_PROCESS_SEQUENCE,
            process_type,
            active: true,
            description: None,
            cost_per_sqm,
            labor_cost: None,
            color: 0,
        }
    }

    /// 单位面积成本（缺省为 0）
    pub fn rate(&self) -> f64 {
        self.cost_per_sqm.unwrap_or(0.0)
    }

    pub fn is_cut(&self) -> bool {
        self.process_type == ProcessType::Cut
    }
}

/// 默认工艺目录（首次初始化数据库时写入）
pub fn default_catalog() -> Vec<WorkshopProcess> {
    let mut polish = WorkshopProcess::new("Pulido", "PUL", ProcessType::Finish, Some(0.0));
    polish.sequence = 10;
    let mut flamed = WorkshopProcess::new("Flameado", "FLA", ProcessType::Finish, Some(0.0));
    flamed.sequence = 20;
    let mut cut = WorkshopProcess::new("Corte a formato", "CRT", ProcessType::Cut, Some(0.0));
    cut.sequence = 30;
    vec![polish, flamed, cut]
}
