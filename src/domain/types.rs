// ==========================================
// 订单履约引擎 - 领域类型定义
// ==========================================
// 职责: 履约状态、配送状态、停靠点状态、资源状态枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与上游数据一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 商品（订单行）全系统唯一 ID
pub type ProductId = u64;

// ==========================================
// 商品履约状态 (Product Status)
// ==========================================
// 进度顺序: Received < Scheduled < InTransit < Delivered
// Cancelled 为终态,不参与进度比较
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Received,  // 已接收(未派车)
    Scheduled, // 已排入配送
    InTransit, // 运输中
    Delivered, // 已送达
    Cancelled, // 已取消
}

impl ProductStatus {
    /// 进度序号 (Cancelled 返回 None)
    pub fn progress_rank(&self) -> Option<u8> {
        match self {
            ProductStatus::Received => Some(0),
            ProductStatus::Scheduled => Some(1),
            ProductStatus::InTransit => Some(2),
            ProductStatus::Delivered => Some(3),
            ProductStatus::Cancelled => None,
        }
    }

    /// 是否仍可取消/改期
    ///
    /// 运输中与已送达的商品已离开仓库,不允许再修改
    pub fn is_modifiable(&self) -> bool {
        !matches!(self, ProductStatus::InTransit | ProductStatus::Delivered)
    }

    /// 转换为存储字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProductStatus::Received => "RECEIVED",
            ProductStatus::Scheduled => "SCHEDULED",
            ProductStatus::InTransit => "IN_TRANSIT",
            ProductStatus::Delivered => "DELIVERED",
            ProductStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 由在途商品状态归约得到
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Received,  // 全部未派车
    InProcess, // 有进度
    Completed, // 全部送达
    Cancelled, // 无在途商品
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Received => write!(f, "RECEIVED"),
            OrderStatus::InProcess => write!(f, "IN_PROCESS"),
            OrderStatus::Completed => write!(f, "COMPLETED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ==========================================
// 配送单状态 (Dispatch Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    Scheduled, // 已排班
    Picking,   // 拣货中
    EnRoute,   // 在途
    Completed, // 已完成
}

impl DispatchStatus {
    /// 在途/已完成的配送单不允许改派或删除
    pub fn is_locked(&self) -> bool {
        matches!(self, DispatchStatus::EnRoute | DispatchStatus::Completed)
    }

    /// 转换为存储字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            DispatchStatus::Scheduled => "SCHEDULED",
            DispatchStatus::Picking => "PICKING",
            DispatchStatus::EnRoute => "EN_ROUTE",
            DispatchStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 停靠点状态 (Stop Status)
// ==========================================
// 进度序号: Pending(0) → Picking(1) → EnRoute/InTransit(2) → Delivered(3)
// EnRoute 与 InTransit 同序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopStatus {
    Pending,   // 待处理
    Picking,   // 拣货中
    EnRoute,   // 随车在途
    InTransit, // 前往本站
    Delivered, // 已送达
}

impl StopStatus {
    /// 状态机序号
    pub fn ordinal(&self) -> u8 {
        match self {
            StopStatus::Pending => 0,
            StopStatus::Picking => 1,
            StopStatus::EnRoute | StopStatus::InTransit => 2,
            StopStatus::Delivered => 3,
        }
    }

    /// 是否已出发 (序号 ≥ 2)
    pub fn is_moving(&self) -> bool {
        self.ordinal() >= 2
    }

    /// 转换为存储字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            StopStatus::Pending => "PENDING",
            StopStatus::Picking => "PICKING",
            StopStatus::EnRoute => "EN_ROUTE",
            StopStatus::InTransit => "IN_TRANSIT",
            StopStatus::Delivered => "DELIVERED",
        }
    }
}

impl fmt::Display for StopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 配送班次 (Shift)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Shift {
    Morning,   // 上午
    Afternoon, // 下午
    Night,     // 夜间
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shift::Morning => write!(f, "MORNING"),
            Shift::Afternoon => write!(f, "AFTERNOON"),
            Shift::Night => write!(f, "NIGHT"),
        }
    }
}

// ==========================================
// 车辆状态 (Vehicle Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Operational, // 可运营
    Maintenance, // 维修中
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleStatus::Operational => write!(f, "OPERATIONAL"),
            VehicleStatus::Maintenance => write!(f, "MAINTENANCE"),
        }
    }
}

// ==========================================
// 员工状态 (Employee Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmployeeStatus {
    Active,     // 在岗
    Inactive,   // 离岗
    OnLeave,    // 休假(许可)
    OnVacation, // 年假
}

impl fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmployeeStatus::Active => write!(f, "ACTIVE"),
            EmployeeStatus::Inactive => write!(f, "INACTIVE"),
            EmployeeStatus::OnLeave => write!(f, "ON_LEAVE"),
            EmployeeStatus::OnVacation => write!(f, "ON_VACATION"),
        }
    }
}

// ==========================================
// 驾驶授权状态 (Permission Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionStatus {
    Enabled,   // 已授权
    Disabled,  // 未授权
    Suspended, // 暂停
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionStatus::Enabled => write!(f, "ENABLED"),
            PermissionStatus::Disabled => write!(f, "DISABLED"),
            PermissionStatus::Suspended => write!(f, "SUSPENDED"),
        }
    }
}
