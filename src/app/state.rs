// ==========================================
// 石材车间加工系统 - 应用状态
// ==========================================
// 职责: 打开数据库、加载配置、装配仓储/协作服务/引擎/API
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{ProcessCatalogApi, WorkshopOrderApi};
use crate::config::{ConfigManager, WorkshopConfig};
use crate::engine::{OrderLifecycleEngine, WorkshopCollaborators, WorkshopRepositories};
use crate::repository::{
    ActionLogRepository, SequenceRepository, SqliteUnitOfWork, StockPickingRepository,
    StockRegistryRepository,
};

/// 加工单参考号前缀与补零位数
pub const ORDER_SEQUENCE_PREFIX: &str = "WS/";
pub const ORDER_SEQUENCE_PADDING: i32 = 5;

/// 应用状态
///
/// 所有仓储共享同一个连接；完工事务依赖这一点
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 共享连接
    pub conn: Arc<Mutex<Connection>>,

    /// 启动时加载的车间配置
    pub config: WorkshopConfig,

    pub config_manager: Arc<ConfigManager>,

    /// 加工单API
    pub order_api: Arc<WorkshopOrderApi>,

    /// 工艺目录API
    pub process_api: Arc<ProcessCatalogApi>,

    /// 库存登记（批次/库位/仓库查询）
    pub stock_repo: Arc<StockRegistryRepository>,

    /// 移库单查询
    pub picking_repo: Arc<StockPickingRepository>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

/// 基于同一连接创建全部 SQLite 协作服务
pub fn sqlite_collaborators(conn: Arc<Mutex<Connection>>) -> WorkshopCollaborators {
    let stock = Arc::new(StockRegistryRepository::new(conn.clone()));
    WorkshopCollaborators {
        sequences: Arc::new(SequenceRepository::new(conn.clone())),
        inventory: stock.clone(),
        movements: Arc::new(StockPickingRepository::new(conn.clone())),
        warehouses: stock,
        unit_of_work: Arc::new(SqliteUnitOfWork::new(conn)),
    }
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Err(String): 打开数据库/建表/加载配置失败
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        Self::from_connection(db_path, Arc::new(Mutex::new(conn)))
    }

    /// 在已打开的连接上装配（建表为幂等操作，已有表保持原样）
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        {
            let guard = conn.lock().map_err(|e| format!("数据库锁获取失败: {}", e))?;
            crate::db::init_schema(&guard).map_err(|e| format!("初始化数据库结构失败: {}", e))?;
        }

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config = config_manager
            .load_workshop_config()
            .map_err(|e| format!("加载车间配置失败: {}", e))?;
        crate::i18n::set_locale(&config.locale);

        // ==========================================
        // Repository / 协作服务
        // ==========================================
        let repos = WorkshopRepositories::from_connection(conn.clone());
        repos
            .process_repo
            .seed_defaults()
            .map_err(|e| format!("写入默认工艺失败: {}", e))?;

        SequenceRepository::new(conn.clone())
            .ensure_sequence(&config.order_sequence_code, ORDER_SEQUENCE_PREFIX, ORDER_SEQUENCE_PADDING)
            .map_err(|e| format!("初始化加工单序列失败: {}", e))?;

        let collaborators = sqlite_collaborators(conn.clone());

        // ==========================================
        // Engine / API
        // ==========================================
        let lifecycle = Arc::new(
            OrderLifecycleEngine::new(repos.clone(), &collaborators, &config)
                .map_err(|e| format!("无法创建OrderLifecycleEngine: {}", e))?,
        );
        let order_api = Arc::new(WorkshopOrderApi::new(
            repos.clone(),
            lifecycle,
            &collaborators,
            &config,
        ));
        let process_api = Arc::new(ProcessCatalogApi::new(
            repos.process_repo.clone(),
            repos.order_repo.clone(),
            repos.action_log_repo.clone(),
            collaborators.unit_of_work.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            conn: conn.clone(),
            config,
            config_manager,
            order_api,
            process_api,
            stock_repo: Arc::new(StockRegistryRepository::new(conn.clone())),
            picking_repo: Arc::new(StockPickingRepository::new(conn)),
            action_log_repo: repos.action_log_repo,
        })
    }
}

/// 默认数据库路径
///
/// 优先使用环境变量 STONE_WORKSHOP_DB_PATH，否则放在用户数据目录下
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("STONE_WORKSHOP_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./stone_workshop.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("stone-workshop");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("stone_workshop.db");
        }
    }
    path.to_string_lossy().to_string()
}
