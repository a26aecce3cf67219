// ==========================================
// 石材车间加工系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把仓储/引擎错误转换为用户可读消息
// 说明: 面向用户的消息通过 rust-i18n 本地化
// ==========================================

use crate::domain::order::MissingField;
use crate::engine::error::EngineError;
use crate::i18n;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("缺少必填字段: {0}")]
    MissingRequiredFields(String),

    #[error("无效的状态转换: {0}")]
    InvalidStateTransition(String),

    // ==========================================
    // 配置与库存错误
    // ==========================================
    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("库存移动失败: {0}")]
    StockMovement(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn missing_field_message(field: &MissingField) -> String {
    match field {
        MissingField::InputProductOrLot => i18n::t("order.missing_input_product_lot"),
        MissingField::OutputProduct => i18n::t("order.missing_output_product"),
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 库存操作
            RepositoryError::ReservationFailed(msg) | RepositoryError::ValidationFailed(msg) => {
                ApiError::StockMovement(msg)
            }

            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition(format!("from={} to={}", from, to))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::MissingRequiredFields(fields) => ApiError::MissingRequiredFields(
                fields
                    .iter()
                    .map(missing_field_message)
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            EngineError::InvalidStateTransition { from, action } => {
                ApiError::InvalidStateTransition(i18n::t_with_args(
                    "order.invalid_transition",
                    &[("action", &action), ("state", from.to_db_str())],
                ))
            }
            EngineError::Configuration(msg) => ApiError::Configuration(msg),
            EngineError::UnsupportedSchema { entity, field } => {
                ApiError::Configuration(i18n::t_with_args(
                    "stock.unsupported_schema",
                    &[("entity", &entity), ("field", &field)],
                ))
            }
            EngineError::Finalization {
                picking,
                primary,
                fallback,
            } => ApiError::StockMovement(i18n::t_with_args(
                "stock.finalize_failed",
                &[
                    ("picking", &picking),
                    ("reason", &primary),
                    ("fallback", &fallback),
                ],
            )),
            EngineError::Repository(e) => ApiError::from(e),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
