// ==========================================
// 石材车间加工系统 - API 层
// ==========================================
// 职责: 输入校验、错误转换、面向用户的业务操作
// ==========================================

pub mod error;
pub mod order_api;
pub mod process_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use order_api::{CreateOrderRequest, LineInput, OrderPatch, WorkshopOrderApi};
pub use process_api::{NewProcess, ProcessCatalogApi};
