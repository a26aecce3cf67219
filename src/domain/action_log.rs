// ==========================================
// 石材车间加工系统 - 操作日志领域模型
// ==========================================
// 红线: 所有状态变更必须记录（谁/何时/做了什么）
// 对齐: action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,         // 日志ID (uuid)
    pub order_id: Option<i64>,     // 关联加工单 (工艺目录维护等操作可为None)
    pub action_type: String,       // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,  // 操作时间戳
    pub actor: String,             // 操作人
    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,    // 详细描述
}

impl ActionLog {
    /// 以当前时间创建日志
    pub fn now(order_id: Option<i64>, action_type: ActionType, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            order_id,
            action_type: action_type.to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateOrder,    // 新建加工单
    UpdateOrder,    // 修改加工单
    DeleteOrder,    // 删除加工单
    Confirm,        // 确认
    Start,          // 开工
    Complete,       // 完工（含库存移动）
    Cancel,         // 取消
    ResetToDraft,   // 重置为草稿
    CreateProcess,  // 新建工艺
    UpdateProcess,  // 修改工艺
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::CreateOrder => "CREATE_ORDER",
            ActionType::UpdateOrder => "UPDATE_ORDER",
            ActionType::DeleteOrder => "DELETE_ORDER",
            ActionType::Confirm => "CONFIRM",
            ActionType::Start => "START",
            ActionType::Complete => "COMPLETE",
            ActionType::Cancel => "CANCEL",
            ActionType::ResetToDraft => "RESET_TO_DRAFT",
            ActionType::CreateProcess => "CREATE_PROCESS",
            ActionType::UpdateProcess => "UPDATE_PROCESS",
        };
        write!(f, "{}", s)
    }
}
