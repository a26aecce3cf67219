// ==========================================
// 石材车间加工系统 - 引擎层错误类型
// ==========================================
// 分类:
// - 用户输入/配置错误: 同步返回，不重试，状态不变
// - 完工物化错误: 先走兜底强制完成，两者都失败才上抛
// ==========================================

use crate::domain::order::MissingField;
use crate::domain::types::OrderState;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 用户输入错误 =====
    #[error("缺少必填字段: {}", join_fields(.0))]
    MissingRequiredFields(Vec<MissingField>),

    #[error("无效的状态转换: state={from}, action={action}")]
    InvalidStateTransition { from: OrderState, action: String },

    // ===== 配置错误 =====
    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("库存移动字段不受支持: entity={entity}, field={field}")]
    UnsupportedSchema { entity: String, field: String },

    // ===== 物化错误 =====
    #[error("移库单 {picking} 完成失败: {primary}; 强制完成也失败: {fallback}")]
    Finalization {
        picking: String,
        primary: String,
        fallback: String,
    },

    // ===== 下层错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn join_fields(fields: &[MissingField]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl EngineError {
    /// 是否为配置类错误（仓库/库位/作业类型缺失）
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EngineError::Configuration(_) | EngineError::UnsupportedSchema { .. }
        )
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_names_categories() {
        let err = EngineError::MissingRequiredFields(vec![
            MissingField::InputProductOrLot,
            MissingField::OutputProduct,
        ]);
        let msg = err.to_string();
        assert!(msg.contains("input_product_lot"));
        assert!(msg.contains("output_product"));
    }

    #[test]
    fn test_finalization_message_carries_both_causes() {
        let err = EngineError::Finalization {
            picking: "WH/INT/00007".to_string(),
            primary: "lot missing".to_string(),
            fallback: "move locked".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("WH/INT/00007"));
        assert!(msg.contains("lot missing"));
        assert!(msg.contains("move locked"));
    }
}
