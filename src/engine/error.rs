// ==========================================
// 订单履约引擎 - 引擎层错误类型
// ==========================================
// 分类:
// 1. 校验错误 - 用户输入不完整/格式错误,变更前拦截
// 2. 一致性违反 - 回退状态、修改已出发商品等,直接拒绝
// 3. 查找失败 - 快照中不存在的实体
// 工具: thiserror 派生宏
// ==========================================

use crate::config::ConfigError;
use crate::domain::types::{DispatchStatus, ProductId, ProductStatus};
use crate::engine::sequencing::SequenceViolation;
use crate::engine::stop_transition::StopEditViolation;
use chrono::NaiveTime;
use std::collections::BTreeMap;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 校验错误 =====
    #[error("原因不能为空")]
    ReasonRequired,

    #[error("未选择任何商品")]
    NoProductsSelected,

    #[error("改期至少需要提供新日期或新目的地")]
    NoRescheduleChange,

    #[error("路线序号无效: {0}")]
    InvalidSequence(SequenceViolation),

    #[error("停靠点编辑校验失败: {}个停靠点有误", .violations.len())]
    StopEditRejected {
        violations: BTreeMap<String, StopEditViolation>,
    },

    #[error("助手重复: slot={slot}, employee={employee_code}")]
    DuplicateAssistant { slot: usize, employee_code: String },

    #[error("助手未填写: slot={slot}")]
    IncompleteAssistants { slot: usize },

    #[error("助手不可选: employee={employee_code}")]
    AssistantNotEligible { employee_code: String },

    #[error("助手槽位越界: slot={slot}, count={count}")]
    AssistantSlotOutOfRange { slot: usize, count: usize },

    #[error("时间格式错误 (field={field}): {value}")]
    InvalidTimeFormat { field: String, value: String },

    #[error("时间区间无效: start={start}, end={end}")]
    InvalidTimeRange { start: NaiveTime, end: NaiveTime },

    // ===== 一致性违反 =====
    #[error("商品不可取消: product_id={product_id}, status={status}")]
    NotCancellable {
        product_id: ProductId,
        status: ProductStatus,
    },

    #[error("商品不可改期: product_id={product_id}, status={status}")]
    NotModifiable {
        product_id: ProductId,
        status: ProductStatus,
    },

    #[error("商品已派车: product_id={product_id}, dispatch={dispatch_id}")]
    ProductAlreadyDispatched {
        product_id: ProductId,
        dispatch_id: String,
    },

    #[error("配送单已锁定: dispatch={dispatch_id}, status={status}")]
    DispatchLocked {
        dispatch_id: String,
        status: DispatchStatus,
    },

    #[error("司机不具备驾驶资格: employee={employee_code}, vehicle={vehicle_placa}")]
    OperatorNotEligible {
        employee_code: String,
        vehicle_placa: String,
    },

    #[error("车辆不可运营: {0}")]
    VehicleNotOperational(String),

    #[error("配送单号已用尽: prefix={prefix}")]
    DispatchCodeExhausted { prefix: String },

    // ===== 查找失败 =====
    #[error("订单不存在: {0}")]
    OrderNotFound(String),

    #[error("配送单不存在: {0}")]
    DispatchNotFound(String),

    #[error("商品不属于订单: order={order_code}, product_id={product_id}")]
    ProductNotFound {
        order_code: String,
        product_id: ProductId,
    },

    #[error("商品不存在: product_id={0}")]
    UnknownProduct(ProductId),

    #[error("车辆不存在: {0}")]
    VehicleNotFound(String),

    #[error("员工不存在: {0}")]
    EmployeeNotFound(String),

    // ===== 配置错误 =====
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// 是否为用户输入校验错误（可由用户修正后重试）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::ReasonRequired
                | EngineError::NoProductsSelected
                | EngineError::NoRescheduleChange
                | EngineError::InvalidSequence(_)
                | EngineError::StopEditRejected { .. }
                | EngineError::DuplicateAssistant { .. }
                | EngineError::IncompleteAssistants { .. }
                | EngineError::AssistantSlotOutOfRange { .. }
                | EngineError::InvalidTimeFormat { .. }
                | EngineError::InvalidTimeRange { .. }
        )
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
