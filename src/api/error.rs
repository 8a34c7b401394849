// ==========================================
// 订单履约引擎 - API层错误类型
// ==========================================
// 职责: 将引擎错误转换为调用方可展示的错误,保留逐行校验明细
// ==========================================

use crate::engine::error::EngineError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入校验错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    /// 逐行校验失败（停靠点编辑、路线序号）
    #[error("校验失败: {reason}")]
    ValidationFailed {
        reason: String,
        violations: Vec<ValidationViolation>,
    },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 逐行校验明细(其他错误为空)
    pub fn violations(&self) -> &[ValidationViolation] {
        match self {
            ApiError::ValidationFailed { violations, .. } => violations,
            _ => &[],
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let reason = err.to_string();
        match err {
            EngineError::StopEditRejected { violations } => ApiError::ValidationFailed {
                reason,
                violations: violations
                    .into_values()
                    .map(|v| ValidationViolation {
                        violation_type: v.kind.code().to_string(),
                        target_id: v.stop_id,
                        reason: v.message,
                        details: serde_json::to_value(&v.kind).ok(),
                    })
                    .collect(),
            },
            EngineError::InvalidSequence(violation) => ApiError::ValidationFailed {
                reason,
                violations: vec![ValidationViolation {
                    violation_type: violation.code().to_string(),
                    target_id: violation.location().to_string(),
                    reason: violation.message(),
                    details: serde_json::to_value(&violation).ok(),
                }],
            },

            EngineError::DispatchLocked { dispatch_id, status } => {
                ApiError::InvalidStateTransition {
                    from: status.to_string(),
                    to: format!("{}(已锁定)", dispatch_id),
                }
            }

            EngineError::OrderNotFound(_)
            | EngineError::DispatchNotFound(_)
            | EngineError::ProductNotFound { .. }
            | EngineError::UnknownProduct(_)
            | EngineError::VehicleNotFound(_)
            | EngineError::EmployeeNotFound(_) => ApiError::NotFound(reason),

            EngineError::NotCancellable { .. }
            | EngineError::NotModifiable { .. }
            | EngineError::ProductAlreadyDispatched { .. }
            | EngineError::OperatorNotEligible { .. }
            | EngineError::VehicleNotOperational(_)
            | EngineError::DispatchCodeExhausted { .. }
            | EngineError::AssistantNotEligible { .. } => ApiError::BusinessRuleViolation(reason),

            EngineError::Config(_) => ApiError::ConfigError(reason),

            EngineError::ReasonRequired
            | EngineError::NoProductsSelected
            | EngineError::NoRescheduleChange
            | EngineError::DuplicateAssistant { .. }
            | EngineError::IncompleteAssistants { .. }
            | EngineError::AssistantSlotOutOfRange { .. }
            | EngineError::InvalidTimeFormat { .. }
            | EngineError::InvalidTimeRange { .. } => ApiError::InvalidInput(reason),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 校验违规详情
// ==========================================

/// 校验违规详情
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValidationViolation {
    /// 违规类型（ARRIVAL_TIME_OUT_OF_WINDOW / SEQUENCE_DUPLICATE / ...）
    pub violation_type: String,
    /// 停靠点ID 或 地点名
    pub target_id: String,
    /// 违规原因（已本地化）
    pub reason: String,
    /// 额外信息（可选）
    pub details: Option<serde_json::Value>,
}
