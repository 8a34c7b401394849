// ==========================================
// 订单履约引擎 - 车队资源领域模型
// ==========================================
// 职责: 车辆、员工、驾驶授权
// ==========================================

use crate::domain::types::{EmployeeStatus, PermissionStatus, VehicleStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Vehicle - 车辆
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub placa: String,            // 车牌(唯一)
    pub vehicle_type: String,     // 车型
    pub required_license: String, // 要求驾照等级
    pub status: VehicleStatus,    // 运营状态
}

impl Vehicle {
    pub fn is_operational(&self) -> bool {
        self.status == VehicleStatus::Operational
    }
}

// ==========================================
// Employee - 员工
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub code: String,               // 员工编码(唯一)
    pub name: String,               // 姓名
    pub license_category: String,   // 驾照等级 (brevete)
    pub license_expiry: NaiveDate,  // 驾照到期日
    pub status: EmployeeStatus,     // 在岗状态
}

impl Employee {
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}

// ==========================================
// Permission - 驾驶授权
// ==========================================
// 一名员工 × 一辆车
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub employee_code: String,
    pub vehicle_placa: String,
    pub status: PermissionStatus,
    pub last_change_date: Option<NaiveDate>,  // 最近变更日期
    pub change_reason: Option<String>,        // 最近变更原因
}

impl Permission {
    pub fn links(&self, employee_code: &str, vehicle_placa: &str) -> bool {
        self.employee_code == employee_code && self.vehicle_placa == vehicle_placa
    }
}
