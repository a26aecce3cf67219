// ==========================================
// 石材车间加工系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化；动态字段名必须先经 PRAGMA 校验
// ==========================================

pub mod action_log_repo;
pub mod db_utils;
pub mod error;
pub mod order_line_repo;
pub mod order_repo;
pub mod picking_repo;
pub mod process_repo;
pub mod sequence_repo;
pub mod stock_repo;
pub mod unit_of_work;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use order_line_repo::OrderLineRepository;
pub use order_repo::WorkshopOrderRepository;
pub use picking_repo::StockPickingRepository;
pub use process_repo::ProcessRepository;
pub use sequence_repo::SequenceRepository;
pub use stock_repo::StockRegistryRepository;
pub use unit_of_work::SqliteUnitOfWork;
