// ==========================================
// 订单履约引擎 - 履约状态派生引擎
// ==========================================
// 职责: 从配送单/停靠点派生商品状态,再归约出订单状态
// 红线: 纯函数,每次全量重算,不缓存
// 红线: Delivered 不得被降级;取消记录具有最终效力
// ==========================================

use crate::domain::dispatch::Dispatch;
use crate::domain::order::{CancellationLog, Order};
use crate::domain::snapshot::{FulfillmentSnapshot, OrderStatusView};
use crate::domain::types::{DispatchStatus, OrderStatus, ProductId, ProductStatus, StopStatus};
use std::collections::{BTreeMap, HashSet};
use tracing::instrument;

/// 商品状态表
pub type ProductStatusMap = BTreeMap<ProductId, ProductStatus>;

// ==========================================
// StatusDerivationEngine
// ==========================================
pub struct StatusDerivationEngine;

impl StatusDerivationEngine {
    /// 单个停靠点对其承运商品给出的状态
    ///
    /// # 规则
    /// 1. 停靠点 Delivered → Delivered
    /// 2. 停靠点 InTransit(含同序号的 EnRoute) 或 配送单 EnRoute → InTransit
    /// 3. 否则 → Scheduled
    pub fn observed_status(stop_status: StopStatus, dispatch_status: DispatchStatus) -> ProductStatus {
        if stop_status == StopStatus::Delivered {
            ProductStatus::Delivered
        } else if stop_status.is_moving() || dispatch_status == DispatchStatus::EnRoute {
            ProductStatus::InTransit
        } else {
            ProductStatus::Scheduled
        }
    }

    /// 合并两次观测,取进度较高者
    ///
    /// Cancelled 不参与合并(由取消记录单独覆盖)
    fn merge(current: ProductStatus, observed: ProductStatus) -> ProductStatus {
        match (current.progress_rank(), observed.progress_rank()) {
            (Some(cur), Some(obs)) if obs > cur => observed,
            _ => current,
        }
    }

    /// 派生订单内每个商品的状态（主入口）
    ///
    /// # 参数
    /// - order: 在途订单
    /// - dispatches: 全部配送单
    /// - cancellation_log: 取消历史
    ///
    /// # 返回
    /// - 在途商品 + 该订单已取消商品 的状态表
    #[instrument(skip(order, dispatches, cancellation_log), fields(order_code = %order.code))]
    pub fn derive_product_statuses(
        order: &Order,
        dispatches: &[Dispatch],
        cancellation_log: &CancellationLog,
    ) -> ProductStatusMap {
        // === 步骤 1: 在途商品初始化为 Received ===
        let mut statuses: ProductStatusMap = order
            .products
            .iter()
            .map(|p| (p.id, ProductStatus::Received))
            .collect();

        // === 步骤 2: 遍历停靠点,按进度取最大值 ===
        // 与遍历顺序无关: 已 Delivered 的商品不会被后续停靠点降级
        for dispatch in dispatches {
            for stop in &dispatch.stops {
                let observed = Self::observed_status(stop.status, dispatch.status);
                for product in &stop.products {
                    if let Some(current) = statuses.get_mut(&product.id) {
                        *current = Self::merge(*current, observed);
                    }
                }
            }
        }

        // === 步骤 3: 取消记录覆盖为 Cancelled ===
        for id in cancellation_log.cancelled_ids_for(&order.code) {
            statuses.insert(id, ProductStatus::Cancelled);
        }

        tracing::debug!(product_count = statuses.len(), "商品状态派生完成");
        statuses
    }

    /// 归约订单状态
    ///
    /// # 规则
    /// 0. 商品总数为 0 → Completed
    /// 1. 无在途商品 → Cancelled
    /// 2. 在途商品全部 Delivered → Completed
    /// 3. 任一在途商品 Scheduled/InTransit/Delivered → InProcess
    /// 4. 否则 → Received
    pub fn derive_order_status(order: &Order, statuses: &ProductStatusMap) -> OrderStatus {
        let live: Vec<ProductStatus> = order
            .products
            .iter()
            .map(|p| statuses.get(&p.id).copied().unwrap_or(ProductStatus::Received))
            .filter(|s| *s != ProductStatus::Cancelled)
            .collect();

        let order_ids: HashSet<ProductId> = order.products.iter().map(|p| p.id).collect();
        let logged_cancelled = statuses
            .iter()
            .filter(|(id, s)| **s == ProductStatus::Cancelled && !order_ids.contains(*id))
            .count();
        let total = order.products.len() + logged_cancelled;

        if total == 0 {
            return OrderStatus::Completed;
        }
        if live.is_empty() {
            return OrderStatus::Cancelled;
        }
        if live.iter().all(|s| *s == ProductStatus::Delivered) {
            return OrderStatus::Completed;
        }
        if live.iter().any(|s| *s != ProductStatus::Received) {
            return OrderStatus::InProcess;
        }
        OrderStatus::Received
    }

    /// 派生单个订单的完整视图
    pub fn order_view(
        order: &Order,
        dispatches: &[Dispatch],
        cancellation_log: &CancellationLog,
    ) -> OrderStatusView {
        let product_statuses = Self::derive_product_statuses(order, dispatches, cancellation_log);
        let status = Self::derive_order_status(order, &product_statuses);
        let cancelled_count = product_statuses
            .values()
            .filter(|s| **s == ProductStatus::Cancelled)
            .count();

        OrderStatusView {
            order_code: order.code.clone(),
            client_name: order.client_name.clone(),
            status,
            live_count: product_statuses.len() - cancelled_count,
            cancelled_count,
            product_statuses,
        }
    }

    /// 汇总全部订单（在途订单 + 已整单取消订单）
    ///
    /// 整单取消的订单已不在在途列表中,由取消记录重建为 Cancelled 视图
    #[instrument(skip(snapshot), fields(order_count = snapshot.orders.len()))]
    pub fn summarize_orders(snapshot: &FulfillmentSnapshot) -> Vec<OrderStatusView> {
        let mut views: Vec<OrderStatusView> = snapshot
            .orders
            .iter()
            .map(|order| Self::order_view(order, &snapshot.dispatches, &snapshot.cancellation_log))
            .collect();

        let live_codes: HashSet<&str> = snapshot.orders.iter().map(|o| o.code.as_str()).collect();
        for code in snapshot.cancellation_log.order_codes() {
            if live_codes.contains(code) {
                continue;
            }
            let Some(first) = snapshot.cancellation_log.records_for(code).next() else {
                continue;
            };
            let product_statuses: ProductStatusMap = snapshot
                .cancellation_log
                .cancelled_ids_for(code)
                .into_iter()
                .map(|id| (id, ProductStatus::Cancelled))
                .collect();
            views.push(OrderStatusView {
                order_code: code.to_string(),
                client_name: first.client_name.clone(),
                status: OrderStatus::Cancelled,
                live_count: 0,
                cancelled_count: product_statuses.len(),
                product_statuses,
            });
        }

        views
    }

    /// 未完成订单（过滤 Completed）
    pub fn pending_orders(snapshot: &FulfillmentSnapshot) -> Vec<OrderStatusView> {
        Self::summarize_orders(snapshot)
            .into_iter()
            .filter(|v| v.status != OrderStatus::Completed)
            .collect()
    }
}
