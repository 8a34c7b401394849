// ==========================================
// 订单履约引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod dispatch;
pub mod fleet;
pub mod order;
pub mod snapshot;
pub mod types;

// 重导出核心类型
pub use dispatch::{Dispatch, Stop};
pub use fleet::{Employee, Permission, Vehicle};
pub use order::{CancellationLog, CancellationRecord, Order, Product};
pub use snapshot::{FulfillmentSnapshot, OrderStatusView, PendingProduct};
pub use types::{
    DispatchStatus, EmployeeStatus, OrderStatus, PermissionStatus, ProductId, ProductStatus,
    Shift, StopStatus, VehicleStatus,
};
