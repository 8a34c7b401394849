// ==========================================
// 订单履约引擎 - 资源可用性判定
// ==========================================
// 职责: 判定可派司机/车辆/助手,维护驾驶授权
// 红线: 司机 = 驾照等级匹配 AND 授权 Enabled,二者缺一不可
// 红线: 依赖变化导致选择失效时清空选择,不报错
// ==========================================

use crate::domain::fleet::{Employee, Permission, Vehicle};
use crate::domain::types::PermissionStatus;
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

// ==========================================
// AssistantOption - 助手下拉选项
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantOption {
    pub employee_code: String,
    pub name: String,
    pub disabled: bool, // 已被其他槽位选中
}

// ==========================================
// AssistantSlots - 助手槽位草稿
// ==========================================
// 槽位编号从 1 开始
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantSlots {
    slots: Vec<Option<String>>,
}

impl AssistantSlots {
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![None; count],
        }
    }

    pub fn count(&self) -> usize {
        self.slots.len()
    }

    /// 调整槽位数量,保留仍存在槽位上的选择
    pub fn resize(&mut self, count: usize) {
        self.slots.resize(count, None);
    }

    pub fn get(&self, slot: usize) -> Option<&str> {
        slot.checked_sub(1)
            .and_then(|idx| self.slots.get(idx))
            .and_then(|s| s.as_deref())
    }

    /// 选择助手
    ///
    /// 同一员工不得占用两个槽位;空串等同于清空
    pub fn set(&mut self, slot: usize, employee_code: &str) -> EngineResult<()> {
        let idx = self.index(slot)?;
        let code = employee_code.trim();
        if code.is_empty() {
            self.slots[idx] = None;
            return Ok(());
        }
        let taken_elsewhere = self
            .slots
            .iter()
            .enumerate()
            .any(|(i, s)| i != idx && s.as_deref() == Some(code));
        if taken_elsewhere {
            return Err(EngineError::DuplicateAssistant {
                slot,
                employee_code: code.to_string(),
            });
        }
        self.slots[idx] = Some(code.to_string());
        Ok(())
    }

    pub fn clear(&mut self, slot: usize) -> EngineResult<()> {
        let idx = self.index(slot)?;
        self.slots[idx] = None;
        Ok(())
    }

    /// 某槽位的候选列表
    ///
    /// 其他槽位已选的员工标记为 disabled
    pub fn options(&self, slot: usize, employees: &[Employee], operator: &str) -> Vec<AssistantOption> {
        let own = self.get(slot);
        ResourceEligibilityEngine::eligible_assistants(employees, operator)
            .into_iter()
            .map(|e| AssistantOption {
                employee_code: e.code.clone(),
                name: e.name.clone(),
                disabled: own != Some(e.code.as_str())
                    && self.slots.iter().any(|s| s.as_deref() == Some(e.code.as_str())),
            })
            .collect()
    }

    /// 全部槽位已填写时返回助手列表
    pub fn validate_complete(&self) -> EngineResult<Vec<String>> {
        self.slots
            .iter()
            .enumerate()
            .map(|(idx, s)| {
                s.clone()
                    .ok_or(EngineError::IncompleteAssistants { slot: idx + 1 })
            })
            .collect()
    }

    fn index(&self, slot: usize) -> EngineResult<usize> {
        match slot {
            s if s >= 1 && s <= self.slots.len() => Ok(s - 1),
            _ => Err(EngineError::AssistantSlotOutOfRange {
                slot,
                count: self.slots.len(),
            }),
        }
    }
}

// ==========================================
// ResourceEligibilityEngine
// ==========================================
pub struct ResourceEligibilityEngine;

impl ResourceEligibilityEngine {
    /// 员工能否驾驶该车辆
    pub fn is_eligible_operator(employee: &Employee, vehicle: &Vehicle, permissions: &[Permission]) -> bool {
        employee.license_category == vehicle.required_license
            && permissions.iter().any(|p| {
                p.links(&employee.code, &vehicle.placa) && p.status == PermissionStatus::Enabled
            })
    }

    /// 可驾驶所选车辆的员工
    #[instrument(skip(vehicle, employees, permissions), fields(vehicle = %vehicle.placa))]
    pub fn eligible_operators<'a>(
        vehicle: &Vehicle,
        employees: &'a [Employee],
        permissions: &[Permission],
    ) -> Vec<&'a Employee> {
        let eligible: Vec<&Employee> = employees
            .iter()
            .filter(|e| Self::is_eligible_operator(e, vehicle, permissions))
            .collect();
        tracing::debug!(count = eligible.len(), "可选司机");
        eligible
    }

    /// 可派车辆(仅 Operational)
    pub fn available_vehicles(vehicles: &[Vehicle]) -> Vec<&Vehicle> {
        vehicles.iter().filter(|v| v.is_operational()).collect()
    }

    /// 车辆变更后重新核对已选司机
    ///
    /// # 返回
    /// - Some(code): 原选择仍有效
    /// - None: 未选择,或原选择已失效(记录 warn 并清空)
    pub fn reconcile_operator(
        selected: Option<&str>,
        vehicle: &Vehicle,
        employees: &[Employee],
        permissions: &[Permission],
    ) -> Option<String> {
        let code = selected?;
        let still_eligible = employees
            .iter()
            .find(|e| e.code == code)
            .map_or(false, |e| Self::is_eligible_operator(e, vehicle, permissions));
        if still_eligible {
            Some(code.to_string())
        } else {
            tracing::warn!(operator = %code, vehicle = %vehicle.placa, "司机不再具备资格,已清空选择");
            None
        }
    }

    /// 可选助手: 在岗员工且不是司机本人
    pub fn eligible_assistants<'a>(employees: &'a [Employee], operator: &str) -> Vec<&'a Employee> {
        employees
            .iter()
            .filter(|e| e.is_active() && e.code != operator)
            .collect()
    }

    /// 校验已提交的助手列表
    ///
    /// # 规则
    /// 1. 每个槽位非空
    /// 2. 员工在岗且不是司机
    /// 3. 互不重复
    pub fn validate_assistants(
        assistants: &[String],
        operator: &str,
        employees: &[Employee],
    ) -> EngineResult<()> {
        let eligible = Self::eligible_assistants(employees, operator);
        for (idx, raw) in assistants.iter().enumerate() {
            let slot = idx + 1;
            let code = raw.trim();
            if code.is_empty() {
                return Err(EngineError::IncompleteAssistants { slot });
            }
            if !eligible.iter().any(|e| e.code == code) {
                return Err(EngineError::AssistantNotEligible {
                    employee_code: code.to_string(),
                });
            }
            if assistants[..idx].iter().any(|prev| prev.trim() == code) {
                return Err(EngineError::DuplicateAssistant {
                    slot,
                    employee_code: code.to_string(),
                });
            }
        }
        Ok(())
    }

    /// 变更驾驶授权
    ///
    /// 原因必填;记录变更日期与原因
    pub fn update_permission(
        permission: &Permission,
        status: PermissionStatus,
        reason: &str,
        today: NaiveDate,
    ) -> EngineResult<Permission> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::ReasonRequired);
        }
        tracing::info!(
            employee = %permission.employee_code,
            vehicle = %permission.vehicle_placa,
            from = %permission.status,
            to = %status,
            "驾驶授权变更"
        );
        Ok(Permission {
            status,
            last_change_date: Some(today),
            change_reason: Some(reason.to_string()),
            ..permission.clone()
        })
    }

    /// 新车辆: 为每名员工生成 Disabled 授权
    pub fn seed_permissions_for_vehicle(placa: &str, employees: &[Employee]) -> Vec<Permission> {
        employees
            .iter()
            .map(|e| Self::disabled_permission(&e.code, placa))
            .collect()
    }

    /// 新员工: 为每辆车生成 Disabled 授权
    pub fn seed_permissions_for_employee(employee_code: &str, vehicles: &[Vehicle]) -> Vec<Permission> {
        vehicles
            .iter()
            .map(|v| Self::disabled_permission(employee_code, &v.placa))
            .collect()
    }

    fn disabled_permission(employee_code: &str, vehicle_placa: &str) -> Permission {
        Permission {
            employee_code: employee_code.to_string(),
            vehicle_placa: vehicle_placa.to_string(),
            status: PermissionStatus::Disabled,
            last_change_date: None,
            change_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{EmployeeStatus, VehicleStatus};

    fn employee(code: &str, license: &str, status: EmployeeStatus) -> Employee {
        Employee {
            code: code.to_string(),
            name: format!("Empleado {}", code),
            license_category: license.to_string(),
            license_expiry: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            status,
        }
    }

    fn vehicle(placa: &str, license: &str) -> Vehicle {
        Vehicle {
            placa: placa.to_string(),
            vehicle_type: "Camión".to_string(),
            required_license: license.to_string(),
            status: VehicleStatus::Operational,
        }
    }

    fn permission(emp: &str, placa: &str, status: PermissionStatus) -> Permission {
        Permission {
            employee_code: emp.to_string(),
            vehicle_placa: placa.to_string(),
            status,
            last_change_date: None,
            change_reason: None,
        }
    }

    #[test]
    fn test_license_mismatch_dominates_permission() {
        let v1 = vehicle("V1", "A-I");
        let employees = vec![employee("E1", "A-IIIb", EmployeeStatus::Active)];
        let permissions = vec![permission("E1", "V1", PermissionStatus::Enabled)];
        assert!(ResourceEligibilityEngine::eligible_operators(&v1, &employees, &permissions).is_empty());
    }

    #[test]
    fn test_permission_must_be_enabled() {
        let v1 = vehicle("V1", "A-I");
        let employees = vec![
            employee("E1", "A-I", EmployeeStatus::Active),
            employee("E2", "A-I", EmployeeStatus::Active),
            employee("E3", "A-I", EmployeeStatus::Active),
        ];
        let permissions = vec![
            permission("E1", "V1", PermissionStatus::Enabled),
            permission("E2", "V1", PermissionStatus::Suspended),
        ];
        let eligible = ResourceEligibilityEngine::eligible_operators(&v1, &employees, &permissions);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].code, "E1");
    }

    #[test]
    fn test_reconcile_clears_stale_operator() {
        let v1 = vehicle("V1", "A-I");
        let v2 = vehicle("V2", "A-IIb");
        let employees = vec![employee("E1", "A-I", EmployeeStatus::Active)];
        let permissions = vec![permission("E1", "V1", PermissionStatus::Enabled)];

        assert_eq!(
            ResourceEligibilityEngine::reconcile_operator(Some("E1"), &v1, &employees, &permissions),
            Some("E1".to_string())
        );
        assert_eq!(
            ResourceEligibilityEngine::reconcile_operator(Some("E1"), &v2, &employees, &permissions),
            None
        );
    }

    #[test]
    fn test_assistant_slots_reject_duplicates() {
        let employees = vec![
            employee("E1", "A-I", EmployeeStatus::Active),
            employee("E2", "A-I", EmployeeStatus::Active),
            employee("E3", "A-I", EmployeeStatus::Inactive),
            employee("E4", "A-I", EmployeeStatus::Active),
        ];
        let mut slots = AssistantSlots::new(2);
        slots.set(1, "E2").unwrap();
        assert!(matches!(
            slots.set(2, "E2"),
            Err(EngineError::DuplicateAssistant { slot: 2, .. })
        ));

        let options = slots.options(2, &employees, "E1");
        let codes: Vec<_> = options.iter().map(|o| (o.employee_code.as_str(), o.disabled)).collect();
        assert_eq!(codes, vec![("E2", true), ("E4", false)]);

        assert!(matches!(
            slots.validate_complete(),
            Err(EngineError::IncompleteAssistants { slot: 2 })
        ));
        slots.set(2, "E4").unwrap();
        assert_eq!(slots.validate_complete().unwrap(), vec!["E2", "E4"]);
    }

    #[test]
    fn test_assistant_slots_resize_keeps_choices() {
        let mut slots = AssistantSlots::new(2);
        slots.set(1, "E2").unwrap();
        slots.set(2, "E4").unwrap();
        slots.resize(3);
        assert_eq!(slots.get(1), Some("E2"));
        assert_eq!(slots.get(3), None);
        slots.resize(1);
        assert_eq!(slots.count(), 1);
        assert!(matches!(
            slots.set(2, "E4"),
            Err(EngineError::AssistantSlotOutOfRange { slot: 2, count: 1 })
        ));
    }

    #[test]
    fn test_update_permission_requires_reason() {
        let p = permission("E1", "V1", PermissionStatus::Disabled);
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert!(matches!(
            ResourceEligibilityEngine::update_permission(&p, PermissionStatus::Enabled, "  ", today),
            Err(EngineError::ReasonRequired)
        ));
        let updated =
            ResourceEligibilityEngine::update_permission(&p, PermissionStatus::Enabled, "Capacitación", today)
                .unwrap();
        assert_eq!(updated.status, PermissionStatus::Enabled);
        assert_eq!(updated.last_change_date, Some(today));
        assert_eq!(updated.change_reason.as_deref(), Some("Capacitación"));
    }

    #[test]
    fn test_seed_permissions() {
        let employees = vec![
            employee("E1", "A-I", EmployeeStatus::Active),
            employee("E2", "A-I", EmployeeStatus::OnLeave),
        ];
        let seeded = ResourceEligibilityEngine::seed_permissions_for_vehicle("V9", &employees);
        assert_eq!(seeded.len(), 2);
        assert!(seeded.iter().all(|p| p.status == PermissionStatus::Disabled && p.vehicle_placa == "V9"));
    }
}
