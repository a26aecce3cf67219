// ==========================================
// 石材车间加工系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合加工单引擎所需的 Repository
// 目标: 减少构造函数参数数量
// ==========================================

use std::sync::Arc;

use crate::repository::{
    ActionLogRepository, OrderLineRepository, ProcessRepository, WorkshopOrderRepository,
};

/// 加工单引擎仓储集合
///
/// # 包含的仓储
/// - `order_repo`: 加工单
/// - `line_repo`: 多规格明细行
/// - `process_repo`: 工艺目录
/// - `action_log_repo`: 操作日志
#[derive(Clone)]
pub struct WorkshopRepositories {
    pub order_repo: Arc<WorkshopOrderRepository>,
    pub line_repo: Arc<OrderLineRepository>,
    pub process_repo: Arc<ProcessRepository>,
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl WorkshopRepositories {
    pub fn new(
        order_repo: Arc<WorkshopOrderRepository>,
        line_repo: Arc<OrderLineRepository>,
        process_repo: Arc<ProcessRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            order_repo,
            line_repo,
            process_repo,
            action_log_repo,
        }
    }

    /// 基于同一个连接创建全部仓储
    pub fn from_connection(conn: Arc<std::sync::Mutex<rusqlite::Connection>>) -> Self {
        Self {
            order_repo: Arc::new(WorkshopOrderRepository::new(conn.clone())),
            line_repo: Arc::new(OrderLineRepository::new(conn.clone())),
            process_repo: Arc::new(ProcessRepository::new(conn.clone())),
            action_log_repo: Arc::new(ActionLogRepository::new(conn)),
        }
    }
}
