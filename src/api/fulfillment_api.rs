// ==========================================
// 订单履约引擎 - 履约 API
// ==========================================
// 职责: 对外暴露状态派生/校验函数,以及基于快照的"先校验后提交"流程
// 红线: 每个提交流程返回新的快照;任何一步失败,原快照保持不变
// ==========================================

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::EngineConfigReader;
use crate::domain::dispatch::Dispatch;
use crate::domain::fleet::{Employee, Permission, Vehicle};
use crate::domain::order::{CancellationLog, Order};
use crate::domain::snapshot::{FulfillmentSnapshot, OrderStatusView, PendingProduct};
use crate::domain::types::{OrderStatus, PermissionStatus, ProductId};
use crate::engine::cancellation::{
    CancellationEngine, CancellationOutcome, CancellationSelection, RescheduleRequest,
};
use crate::engine::error::EngineError;
use crate::engine::resource_eligibility::ResourceEligibilityEngine;
use crate::engine::sequencing::{DispatchDraft, SequencingEngine};
use crate::engine::status_derivation::{ProductStatusMap, StatusDerivationEngine};
use crate::engine::stop_transition::{StopEditDraft, StopTransitionEngine};

// ==========================================
// FulfillmentApi - 履约 API
// ==========================================

/// 履约API
///
/// 职责：
/// 1. 状态派生（商品 / 订单）
/// 2. 停靠点编辑、派车、拣货、取消、改期的校验与提交
/// 3. 司机 / 车辆 / 助手可用性与驾驶授权维护
pub struct FulfillmentApi {
    config: Arc<dyn EngineConfigReader>,
}

impl FulfillmentApi {
    pub fn new(config: Arc<dyn EngineConfigReader>) -> Self {
        Self { config }
    }

    /// 按配置切换界面提示语言
    pub fn apply_default_locale(&self) -> ApiResult<String> {
        let locale = self.config.get_default_locale().map_err(EngineError::from)?;
        crate::i18n::set_locale(&locale);
        info!(locale = %locale, "提示语言已切换");
        Ok(locale)
    }

    // ==========================================
    // 状态派生
    // ==========================================

    pub fn derive_product_statuses(
        &self,
        order: &Order,
        dispatches: &[Dispatch],
        cancellation_log: &CancellationLog,
    ) -> ProductStatusMap {
        StatusDerivationEngine::derive_product_statuses(order, dispatches, cancellation_log)
    }

    pub fn derive_order_status(&self, order: &Order, statuses: &ProductStatusMap) -> OrderStatus {
        StatusDerivationEngine::derive_order_status(order, statuses)
    }

    /// 订单总览（含整单取消订单）
    pub fn order_overview(&self, snapshot: &FulfillmentSnapshot) -> Vec<OrderStatusView> {
        StatusDerivationEngine::summarize_orders(snapshot)
    }

    /// 未完成订单
    pub fn pending_orders(&self, snapshot: &FulfillmentSnapshot) -> Vec<OrderStatusView> {
        StatusDerivationEngine::pending_orders(snapshot)
    }

    // ==========================================
    // 校验函数
    // ==========================================

    /// 校验停靠点编辑草稿（不提交）
    pub fn validate_stop_edits(&self, dispatch: &Dispatch, draft: &StopEditDraft) -> ApiResult<()> {
        StopTransitionEngine::validate_stop_edits(dispatch, draft, self.config.as_ref())?;
        Ok(())
    }

    pub fn validate_sequence(
        &self,
        unique_locations: &[String],
        assigned: &std::collections::HashMap<String, String>,
    ) -> bool {
        SequencingEngine::validate_sequence(unique_locations, assigned)
    }

    pub fn resolve_eligible_operators(
        &self,
        vehicle: &Vehicle,
        employees: &[Employee],
        permissions: &[Permission],
    ) -> Vec<Employee> {
        ResourceEligibilityEngine::eligible_operators(vehicle, employees, permissions)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn apply_cancellation(
        &self,
        order: &Order,
        statuses: &ProductStatusMap,
        selection: &CancellationSelection,
        reason: &str,
        cancellation_log: &CancellationLog,
        now: NaiveDateTime,
    ) -> ApiResult<CancellationOutcome> {
        Ok(CancellationEngine::apply_cancellation(
            order,
            statuses,
            selection,
            reason,
            cancellation_log,
            now,
        )?)
    }

    pub fn apply_reschedule(
        &self,
        order: &Order,
        statuses: &ProductStatusMap,
        request: &RescheduleRequest,
    ) -> ApiResult<Order> {
        Ok(CancellationEngine::apply_reschedule(order, statuses, request)?)
    }

    // ==========================================
    // 派车
    // ==========================================

    /// 待派车商品
    pub fn unassigned_products(
        &self,
        snapshot: &FulfillmentSnapshot,
        date: Option<NaiveDate>,
    ) -> Vec<PendingProduct> {
        SequencingEngine::unassigned_products(snapshot, date)
    }

    /// 可派车辆
    pub fn available_vehicles<'a>(&self, snapshot: &'a FulfillmentSnapshot) -> Vec<&'a Vehicle> {
        ResourceEligibilityEngine::available_vehicles(&snapshot.vehicles)
    }

    /// 创建配送单
    ///
    /// # 返回
    /// - Ok((新快照, 配送单号))
    #[instrument(skip(self, snapshot, draft))]
    pub fn create_dispatch(
        &self,
        snapshot: &FulfillmentSnapshot,
        draft: &DispatchDraft,
    ) -> ApiResult<(FulfillmentSnapshot, String)> {
        let dispatch = SequencingEngine::build_dispatch(draft, snapshot, self.config.as_ref())?;
        let dispatch_id = dispatch.id.clone();

        let mut next = snapshot.clone();
        next.dispatches.push(dispatch);
        Ok((next, dispatch_id))
    }

    /// 开始拣货
    pub fn start_picking(
        &self,
        snapshot: &FulfillmentSnapshot,
        dispatch_id: &str,
    ) -> ApiResult<FulfillmentSnapshot> {
        self.replace_dispatch(snapshot, dispatch_id, |d| Ok(StopTransitionEngine::start_picking(d)))
    }

    /// 提交停靠点编辑（整批校验,全部通过才写入）
    #[instrument(skip(self, snapshot, draft))]
    pub fn commit_stop_edits(
        &self,
        snapshot: &FulfillmentSnapshot,
        dispatch_id: &str,
        draft: &StopEditDraft,
    ) -> ApiResult<FulfillmentSnapshot> {
        let config = self.config.as_ref();
        self.replace_dispatch(snapshot, dispatch_id, |d| {
            StopTransitionEngine::apply_stop_edits(d, draft, config)
        })
    }

    /// 记录实际出车/收车时间
    pub fn record_actual_times(
        &self,
        snapshot: &FulfillmentSnapshot,
        dispatch_id: &str,
        actual_start: &str,
        actual_end: &str,
    ) -> ApiResult<FulfillmentSnapshot> {
        self.replace_dispatch(snapshot, dispatch_id, |d| {
            StopTransitionEngine::record_actual_times(d, actual_start, actual_end)
        })
    }

    /// 变更配送单的车辆/司机/助手
    ///
    /// EnRoute / Completed 的配送单已锁定
    #[instrument(skip(self, snapshot, assistants))]
    pub fn reassign_dispatch(
        &self,
        snapshot: &FulfillmentSnapshot,
        dispatch_id: &str,
        vehicle_placa: &str,
        operator_code: &str,
        assistants: &[String],
    ) -> ApiResult<FulfillmentSnapshot> {
        self.replace_dispatch(snapshot, dispatch_id, |d| {
            if d.status.is_locked() {
                return Err(EngineError::DispatchLocked {
                    dispatch_id: d.id.clone(),
                    status: d.status,
                });
            }
            let vehicle = snapshot
                .vehicle(vehicle_placa)
                .ok_or_else(|| EngineError::VehicleNotFound(vehicle_placa.to_string()))?;
            if !vehicle.is_operational() {
                return Err(EngineError::VehicleNotOperational(vehicle.placa.clone()));
            }
            let operator = snapshot
                .employee(operator_code)
                .ok_or_else(|| EngineError::EmployeeNotFound(operator_code.to_string()))?;
            if !ResourceEligibilityEngine::is_eligible_operator(operator, vehicle, &snapshot.permissions) {
                return Err(EngineError::OperatorNotEligible {
                    employee_code: operator.code.clone(),
                    vehicle_placa: vehicle.placa.clone(),
                });
            }
            ResourceEligibilityEngine::validate_assistants(assistants, &operator.code, &snapshot.employees)?;

            let mut updated = d.clone();
            updated.vehicle = vehicle.placa.clone();
            updated.operator = operator.code.clone();
            updated.assistants = assistants.iter().map(|a| a.trim().to_string()).collect();
            Ok(updated)
        })
    }

    /// 删除配送单,商品回到待派车
    pub fn remove_dispatch(
        &self,
        snapshot: &FulfillmentSnapshot,
        dispatch_id: &str,
    ) -> ApiResult<FulfillmentSnapshot> {
        let dispatch = snapshot
            .dispatch(dispatch_id)
            .ok_or_else(|| EngineError::DispatchNotFound(dispatch_id.to_string()))?;
        if dispatch.status.is_locked() {
            return Err(EngineError::DispatchLocked {
                dispatch_id: dispatch.id.clone(),
                status: dispatch.status,
            }
            .into());
        }

        let mut next = snapshot.clone();
        next.dispatches.retain(|d| d.id != dispatch_id);
        info!(dispatch_id, "配送单已删除");
        Ok(next)
    }

    // ==========================================
    // 取消 / 改期
    // ==========================================

    /// 取消订单商品
    ///
    /// # 提交内容（同时生效）
    /// 1. 订单替换为剩余商品;整单取消时从在途列表移除
    /// 2. 追加取消记录
    /// 3. 已排班的被取消商品从配送单停靠点中摘除,空停靠点删除并重新编号;
    ///    停靠点全部删除的配送单一并删除
    ///
    /// 已整单取消的订单再次提交同一请求时,原样返回快照
    #[instrument(skip(self, snapshot, selection, reason))]
    pub fn cancel_order_items(
        &self,
        snapshot: &FulfillmentSnapshot,
        order_code: &str,
        selection: &CancellationSelection,
        reason: &str,
        now: NaiveDateTime,
    ) -> ApiResult<FulfillmentSnapshot> {
        let Some(order) = snapshot.order(order_code) else {
            CancellationEngine::check_closed_order_retry(
                order_code,
                selection,
                reason,
                &snapshot.cancellation_log,
            )?;
            return Ok(snapshot.clone());
        };
        let statuses = StatusDerivationEngine::derive_product_statuses(
            order,
            &snapshot.dispatches,
            &snapshot.cancellation_log,
        );
        let outcome = CancellationEngine::apply_cancellation(
            order,
            &statuses,
            selection,
            reason,
            &snapshot.cancellation_log,
            now,
        )?;

        let Some(record) = outcome.record else {
            return Ok(snapshot.clone());
        };

        let cancelled: Vec<ProductId> = record.products.iter().map(|p| p.id).collect();
        let mut next = snapshot.clone();
        if outcome.fully_cancelled {
            next.orders.retain(|o| o.code != order_code);
        } else if let Some(slot) = next.orders.iter_mut().find(|o| o.code == order_code) {
            *slot = outcome.updated_order;
        }
        for dispatch in &mut next.dispatches {
            Self::detach_products(dispatch, &cancelled);
        }
        next.dispatches.retain(|d| {
            let emptied = d.stops.is_empty()
                && snapshot
                    .dispatch(&d.id)
                    .map_or(false, |before| !before.stops.is_empty());
            if emptied {
                info!(dispatch_id = %d.id, "配送单商品已全部取消,配送单删除");
            }
            !emptied
        });
        next.cancellation_log.append(record);
        Ok(next)
    }

    /// 改期订单商品
    ///
    /// 已排班商品在停靠点中的副本同步更新;停靠点路线不变
    pub fn reschedule_order(
        &self,
        snapshot: &FulfillmentSnapshot,
        order_code: &str,
        request: &RescheduleRequest,
    ) -> ApiResult<FulfillmentSnapshot> {
        let order = snapshot
            .order(order_code)
            .ok_or_else(|| EngineError::OrderNotFound(order_code.to_string()))?;
        let statuses = StatusDerivationEngine::derive_product_statuses(
            order,
            &snapshot.dispatches,
            &snapshot.cancellation_log,
        );
        let updated = CancellationEngine::apply_reschedule(order, &statuses, request)?;

        let mut next = snapshot.clone();
        for stop_product in next
            .dispatches
            .iter_mut()
            .flat_map(|d| d.stops.iter_mut())
            .flat_map(|s| s.products.iter_mut())
            .filter(|p| request.product_ids.contains(&p.id))
        {
            if let Some(product) = updated.product(stop_product.id) {
                *stop_product = product.clone();
            }
        }
        if let Some(slot) = next.orders.iter_mut().find(|o| o.code == order_code) {
            *slot = updated;
        }
        Ok(next)
    }

    // ==========================================
    // 车队与授权
    // ==========================================

    /// 可驾驶某车辆的司机
    pub fn eligible_operators_for<'a>(
        &self,
        snapshot: &'a FulfillmentSnapshot,
        vehicle_placa: &str,
    ) -> ApiResult<Vec<&'a Employee>> {
        let vehicle = snapshot
            .vehicle(vehicle_placa)
            .ok_or_else(|| EngineError::VehicleNotFound(vehicle_placa.to_string()))?;
        Ok(ResourceEligibilityEngine::eligible_operators(
            vehicle,
            &snapshot.employees,
            &snapshot.permissions,
        ))
    }

    /// 新增车辆,为每名员工生成 Disabled 授权
    pub fn add_vehicle(
        &self,
        snapshot: &FulfillmentSnapshot,
        vehicle: Vehicle,
    ) -> ApiResult<FulfillmentSnapshot> {
        if snapshot.vehicle(&vehicle.placa).is_some() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "车牌已存在: {}",
                vehicle.placa
            )));
        }
        let mut next = snapshot.clone();
        next.permissions.extend(ResourceEligibilityEngine::seed_permissions_for_vehicle(
            &vehicle.placa,
            &snapshot.employees,
        ));
        next.vehicles.push(vehicle);
        Ok(next)
    }

    /// 新增员工,为每辆车生成 Disabled 授权
    pub fn add_employee(
        &self,
        snapshot: &FulfillmentSnapshot,
        employee: Employee,
    ) -> ApiResult<FulfillmentSnapshot> {
        if snapshot.employee(&employee.code).is_some() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "员工编码已存在: {}",
                employee.code
            )));
        }
        let mut next = snapshot.clone();
        next.permissions.extend(ResourceEligibilityEngine::seed_permissions_for_employee(
            &employee.code,
            &snapshot.vehicles,
        ));
        next.employees.push(employee);
        Ok(next)
    }

    /// 变更驾驶授权（原因必填）
    pub fn update_permission(
        &self,
        snapshot: &FulfillmentSnapshot,
        employee_code: &str,
        vehicle_placa: &str,
        status: PermissionStatus,
        reason: &str,
        today: NaiveDate,
    ) -> ApiResult<FulfillmentSnapshot> {
        let mut next = snapshot.clone();
        let permission = next
            .permissions
            .iter_mut()
            .find(|p| p.links(employee_code, vehicle_placa))
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "驾驶授权不存在: employee={}, vehicle={}",
                    employee_code, vehicle_placa
                ))
            })?;
        *permission = ResourceEligibilityEngine::update_permission(permission, status, reason, today)?;
        Ok(next)
    }

    // ==========================================
    // 内部工具
    // ==========================================

    fn replace_dispatch<F>(
        &self,
        snapshot: &FulfillmentSnapshot,
        dispatch_id: &str,
        update: F,
    ) -> ApiResult<FulfillmentSnapshot>
    where
        F: FnOnce(&Dispatch) -> Result<Dispatch, EngineError>,
    {
        let current = snapshot
            .dispatch(dispatch_id)
            .ok_or_else(|| EngineError::DispatchNotFound(dispatch_id.to_string()))?;
        let updated = update(current)?;

        let mut next = snapshot.clone();
        if let Some(slot) = next.dispatches.iter_mut().find(|d| d.id == dispatch_id) {
            *slot = updated;
        }
        Ok(next)
    }

    fn detach_products(dispatch: &mut Dispatch, product_ids: &[ProductId]) {
        if !product_ids.iter().any(|id| dispatch.carries(*id)) {
            return;
        }
        for stop in &mut dispatch.stops {
            stop.products.retain(|p| !product_ids.contains(&p.id));
        }
        dispatch.stops.retain(|s| !s.products.is_empty());
        for (idx, stop) in dispatch.stops.iter_mut().enumerate() {
            stop.sequence = idx as u32 + 1;
        }
        debug_assert!(dispatch.has_contiguous_sequence());
        warn!(dispatch_id = %dispatch.id, stops = dispatch.stops.len(), "已取消商品从配送单摘除");
    }
}
