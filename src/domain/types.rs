// ==========================================
// 石材车间加工系统 - 领域类型定义
// ==========================================
// 职责: 状态、工艺类型、库位用途等枚举
// 约束: 数据库存储统一使用小写 snake_case 字符串
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 加工单状态 (Order State)
// ==========================================
// 顺序: draft → confirmed → in_progress → done, 另有 cancel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Draft,      // 草稿
    Confirmed,  // 已确认
    InProgress, // 加工中
    Done,       // 已完成
    Cancel,     // 已取消
}

impl OrderState {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderState::Draft => "draft",
            OrderState::Confirmed => "confirmed",
            OrderState::InProgress => "in_progress",
            OrderState::Done => "done",
            OrderState::Cancel => "cancel",
        }
    }

    /// 从数据库字符串解析（未知值返回 None）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(OrderState::Draft),
            "confirmed" => Some(OrderState::Confirmed),
            "in_progress" => Some(OrderState::InProgress),
            "done" => Some(OrderState::Done),
            "cancel" => Some(OrderState::Cancel),
            _ => None,
        }
    }

    /// 是否终态（done 仅可通过显式重置回到草稿）
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Done | OrderState::Cancel)
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 工艺类型 (Process Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    Finish, // 表面加工（抛光/火烧/荔枝面等）
    Cut,    // 切割/规格板
    Other,  // 其他
}

impl ProcessType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProcessType::Finish => "finish",
            ProcessType::Cut => "cut",
            ProcessType::Other => "other",
        }
    }

    /// 从数据库字符串解析（未知值按 other 处理）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "finish" => ProcessType::Finish,
            "cut" => ProcessType::Cut,
            _ => ProcessType::Other,
        }
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 库位用途 (Location Usage)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationUsage {
    Internal,   // 实物库位
    Production, // 生产虚拟库位
    Supplier,
    Customer,
    Inventory,
    View,
    Transit,
}

impl LocationUsage {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LocationUsage::Internal => "internal",
            LocationUsage::Production => "production",
            LocationUsage::Supplier => "supplier",
            LocationUsage::Customer => "customer",
            LocationUsage::Inventory => "inventory",
            LocationUsage::View => "view",
            LocationUsage::Transit => "transit",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "internal" => LocationUsage::Internal,
            "production" => LocationUsage::Production,
            "supplier" => LocationUsage::Supplier,
            "customer" => LocationUsage::Customer,
            "inventory" => LocationUsage::Inventory,
            "transit" => LocationUsage::Transit,
            _ => LocationUsage::View,
        }
    }

    /// 是否为虚拟库位（不持有实物库存）
    pub fn is_virtual(&self) -> bool {
        !matches!(self, LocationUsage::Internal | LocationUsage::Transit)
    }
}

impl fmt::Display for LocationUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 产品追溯方式 (Tracking)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductTracking {
    None,
    Lot,
    Serial,
}

impl ProductTracking {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProductTracking::None => "none",
            ProductTracking::Lot => "lot",
            ProductTracking::Serial => "serial",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "lot" => ProductTracking::Lot,
            "serial" => ProductTracking::Serial,
            _ => ProductTracking::None,
        }
    }
}

// ==========================================
// 移库单/移动状态 (Picking / Move State)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickingState {
    Draft,     // 草稿
    Confirmed, // 待预留
    Assigned,  // 已预留
    Done,      // 已完成
    Cancel,    // 已取消
}

impl PickingState {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PickingState::Draft => "draft",
            PickingState::Confirmed => "confirmed",
            PickingState::Assigned => "assigned",
            PickingState::Done => "done",
            PickingState::Cancel => "cancel",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "confirmed" => PickingState::Confirmed,
            "assigned" => PickingState::Assigned,
            "done" => PickingState::Done,
            "cancel" => PickingState::Cancel,
            _ => PickingState::Draft,
        }
    }
}

impl fmt::Display for PickingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_state_round_trip_names() {
        assert_eq!(OrderState::parse("in_progress"), Some(OrderState::InProgress));
        assert_eq!(OrderState::parse(" DONE "), Some(OrderState::Done));
        assert_eq!(OrderState::parse("archived"), None);
        assert_eq!(OrderState::Cancel.to_string(), "cancel");
    }

    #[test]
    fn test_location_usage_virtual() {
        assert!(LocationUsage::Production.is_virtual());
        assert!(!LocationUsage::Internal.is_virtual());
        assert_eq!(LocationUsage::from_str("production"), LocationUsage::Production);
    }

    #[test]
    fn test_process_type_unknown_is_other() {
        assert_eq!(ProcessType::from_str("polish"), ProcessType::Other);
        assert_eq!(ProcessType::from_str("CUT"), ProcessType::Cut);
    }
}
