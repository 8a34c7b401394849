// ==========================================
// 订单履约引擎 - 核心库
// ==========================================
// 职责: 订单/商品履约状态派生、停靠点状态机、
//       配送路线排序、资源可用性判定、取消与改期
// 定位: 纯内存计算,持久化/网络/界面由调用方负责
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "es");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 引擎配置
pub mod config;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    DispatchStatus, EmployeeStatus, OrderStatus, PermissionStatus, ProductId, ProductStatus,
    Shift, StopStatus, VehicleStatus,
};

// 领域实体
pub use domain::{
    CancellationLog, CancellationRecord, Dispatch, Employee, FulfillmentSnapshot, Order,
    OrderStatusView, PendingProduct, Permission, Product, Stop, Vehicle,
};

// 引擎
pub use engine::{
    CancellationEngine, EngineError, EngineResult, ResourceEligibilityEngine, SequencingEngine,
    StatusDerivationEngine, StopTransitionEngine,
};

// API
pub use api::{ApiError, ApiResult, FulfillmentApi};

// 配置
pub use config::{ConfigManager, EngineConfigReader};

// ==========================================
// 常量定义
// ==========================================

// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
