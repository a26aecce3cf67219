// ==========================================
// 石材车间加工系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 加工单生命周期与库存移动对账
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问与协作服务实现
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{LocationUsage, OrderState, PickingState, ProcessType, ProductTracking};

// 领域实体
pub use domain::{ActionLog, ActionType, WorkshopOrder, WorkshopOrderLine, WorkshopProcess};

// 引擎
pub use engine::{
    CostCalculator, OrderLifecycleEngine, ProductionMaterializer, StockMoveBuilder,
};

// API
pub use api::{ProcessCatalogApi, WorkshopOrderApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "石材车间加工系统";
