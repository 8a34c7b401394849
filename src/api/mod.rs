// ==========================================
// 订单履约引擎 - API 层
// ==========================================
// 职责: 供外部 UI / 数据层调用的业务接口
// ==========================================

pub mod error;
pub mod fulfillment_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult, ValidationViolation};
pub use fulfillment_api::FulfillmentApi;
