// ==========================================
// 石材车间加工系统 - 车间配置
// ==========================================
// 启动时加载一次，注入解析器/物化器/生命周期引擎
// ==========================================

use serde::{Deserialize, Serialize};

/// 默认加工单序列代码
pub const DEFAULT_ORDER_SEQUENCE_CODE: &str = "workshop.order";

/// 全局生产虚拟库位引用
pub const DEFAULT_PRODUCTION_LOCATION_REF: &str = "stock.location_production";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkshopConfig {
    pub order_sequence_code: String,
    pub default_order_name: String, // 序列未定义时的占位名称
    pub internal_picking_code: String,
    pub production_location_refs: Vec<String>, // 公司无生产库位时按序尝试
    pub max_follow_up_rounds: u32,
    pub locale: String,
}

impl Default for WorkshopConfig {
    fn default() -> Self {
        Self {
            order_sequence_code: DEFAULT_ORDER_SEQUENCE_CODE.to_string(),
            default_order_name: "New".to_string(),
            internal_picking_code: "internal".to_string(),
            production_location_refs: vec![DEFAULT_PRODUCTION_LOCATION_REF.to_string()],
            max_follow_up_rounds: 3,
            locale: "en".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: WorkshopConfig = serde_json::from_str(r#"{"locale":"es"}"#).unwrap();
        assert_eq!(cfg.locale, "es");
        assert_eq!(cfg.internal_picking_code, "internal");
        assert_eq!(cfg.max_follow_up_rounds, 3);
    }
}
