// ==========================================
// 石材车间加工系统 - 操作日志数据仓储
// ==========================================
// 对齐: action_log 表
// 红线: 所有状态变更必须记录
// ==========================================

mod core;
mod queries;


pub use core::ActionLogRepository;
