// ==========================================
// 订单履约引擎 - 取消与改期
// ==========================================
// 职责: 划分可取消/可改期商品,生成更新后的订单与取消记录
// 红线: InTransit / Delivered 商品不得取消或改期
// 红线: 取消记录只追加;重复取消同一商品为空操作
// 红线: 校验全部通过后才生成结果,不做部分应用
// ==========================================

use crate::domain::order::{CancellationLog, CancellationRecord, Order, Product};
use crate::domain::types::{ProductId, ProductStatus};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::status_derivation::ProductStatusMap;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// CancellationSelection - 取消范围
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "product_ids", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancellationSelection {
    /// 取消全部可取消商品
    All,
    /// 取消指定商品
    Products(Vec<ProductId>),
}

// ==========================================
// CancellationOutcome - 取消结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationOutcome {
    pub updated_order: Order,
    /// 重复提交(商品均已取消)时为 None
    pub record: Option<CancellationRecord>,
    /// 订单已无在途商品
    pub fully_cancelled: bool,
}

// ==========================================
// RescheduleRequest - 改期请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub product_ids: Vec<ProductId>,
    pub new_date: Option<NaiveDate>,
    /// 空白视为不修改
    pub new_destination: Option<String>,
}

// ==========================================
// CancellationEngine
// ==========================================
pub struct CancellationEngine;

impl CancellationEngine {
    fn status_of(statuses: &ProductStatusMap, id: ProductId) -> ProductStatus {
        statuses.get(&id).copied().unwrap_or(ProductStatus::Received)
    }

    fn is_open(status: ProductStatus) -> bool {
        status.is_modifiable() && status != ProductStatus::Cancelled
    }

    /// 可取消(亦即可改期)的商品
    pub fn cancellable_products<'a>(order: &'a Order, statuses: &ProductStatusMap) -> Vec<&'a Product> {
        order
            .products
            .iter()
            .filter(|p| Self::is_open(Self::status_of(statuses, p.id)))
            .collect()
    }

    /// 已整单取消订单的重复提交
    ///
    /// # 规则
    /// 1. 原因为空 → ReasonRequired
    /// 2. 取消历史覆盖本次请求的全部商品 → Ok(()),调用方按空操作处理
    /// 3. 否则 → OrderNotFound
    pub fn check_closed_order_retry(
        order_code: &str,
        selection: &CancellationSelection,
        reason: &str,
        log: &CancellationLog,
    ) -> EngineResult<()> {
        if reason.trim().is_empty() {
            return Err(EngineError::ReasonRequired);
        }
        let logged = log.cancelled_ids_for(order_code);
        let covered = !logged.is_empty()
            && match selection {
                CancellationSelection::All => true,
                CancellationSelection::Products(ids) => ids.iter().all(|id| logged.contains(id)),
            };
        if !covered {
            return Err(EngineError::OrderNotFound(order_code.to_string()));
        }
        tracing::warn!(order_code, "订单已整单取消,忽略重复提交");
        Ok(())
    }

    /// 执行取消（主入口）
    ///
    /// # 参数
    /// - order: 在途订单
    /// - statuses: 当前商品状态表
    /// - selection: 全部可取消 / 指定商品
    /// - reason: 取消原因(必填)
    /// - log: 既有取消历史(用于识别重复提交)
    /// - now: 取消时间
    ///
    /// # 规则
    /// 1. 原因为空 → ReasonRequired
    /// 2. 指定商品: 已在取消历史中的跳过;不属于订单的 → ProductNotFound;
    ///    InTransit / Delivered → NotCancellable
    /// 3. 实际取消集合为空: 重复提交返回空操作,否则 NoProductsSelected
    /// 4. 生成剩余订单与取消记录;剩余为空即整单取消
    #[instrument(skip(order, statuses, selection, reason, log), fields(order_code = %order.code))]
    pub fn apply_cancellation(
        order: &Order,
        statuses: &ProductStatusMap,
        selection: &CancellationSelection,
        reason: &str,
        log: &CancellationLog,
        now: NaiveDateTime,
    ) -> EngineResult<CancellationOutcome> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::ReasonRequired);
        }

        let (to_cancel, retried): (Vec<ProductId>, bool) = match selection {
            CancellationSelection::All => (
                Self::cancellable_products(order, statuses)
                    .into_iter()
                    .map(|p| p.id)
                    .collect(),
                false,
            ),
            CancellationSelection::Products(ids) => {
                let already_cancelled = log.cancelled_ids_for(&order.code);
                let mut to_cancel: Vec<ProductId> = Vec::new();
                let mut retried = false;
                for &id in ids {
                    if to_cancel.contains(&id) {
                        continue;
                    }
                    if !order.contains(id) {
                        if already_cancelled.contains(&id) {
                            retried = true;
                            continue;
                        }
                        return Err(EngineError::ProductNotFound {
                            order_code: order.code.clone(),
                            product_id: id,
                        });
                    }
                    let status = Self::status_of(statuses, id);
                    if !Self::is_open(status) {
                        return Err(EngineError::NotCancellable {
                            product_id: id,
                            status,
                        });
                    }
                    to_cancel.push(id);
                }
                (to_cancel, retried)
            }
        };

        if to_cancel.is_empty() {
            if retried {
                tracing::warn!("商品均已取消,忽略重复提交");
                return Ok(CancellationOutcome {
                    updated_order: order.clone(),
                    record: None,
                    fully_cancelled: order.products.is_empty(),
                });
            }
            return Err(EngineError::NoProductsSelected);
        }

        let (cancelled, remaining): (Vec<Product>, Vec<Product>) = order
            .products
            .iter()
            .cloned()
            .partition(|p| to_cancel.contains(&p.id));

        let fully_cancelled = remaining.is_empty();
        let record = CancellationRecord {
            record_id: Uuid::new_v4().to_string(),
            order_code: order.code.clone(),
            client_name: order.client_name.clone(),
            phone: order.phone.clone(),
            reason: reason.to_string(),
            products: cancelled,
            is_partial: !fully_cancelled,
            cancelled_at: now,
        };

        tracing::info!(
            cancelled = record.products.len(),
            remaining = remaining.len(),
            fully_cancelled,
            "订单商品已取消"
        );

        Ok(CancellationOutcome {
            updated_order: Order {
                products: remaining,
                ..order.clone()
            },
            record: Some(record),
            fully_cancelled,
        })
    }

    /// 执行改期
    ///
    /// # 规则
    /// 1. 新日期与新目的地至少提供一个(空白目的地视为未提供)
    /// 2. 至少选择一个商品
    /// 3. 商品属于订单且可修改
    /// 4. 原地修改属性,不改变派车状态
    #[instrument(skip(order, statuses, request), fields(order_code = %order.code))]
    pub fn apply_reschedule(
        order: &Order,
        statuses: &ProductStatusMap,
        request: &RescheduleRequest,
    ) -> EngineResult<Order> {
        let new_destination = request
            .new_destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if request.new_date.is_none() && new_destination.is_none() {
            return Err(EngineError::NoRescheduleChange);
        }
        if request.product_ids.is_empty() {
            return Err(EngineError::NoProductsSelected);
        }

        for &id in &request.product_ids {
            if !order.contains(id) {
                return Err(EngineError::ProductNotFound {
                    order_code: order.code.clone(),
                    product_id: id,
                });
            }
            let status = Self::status_of(statuses, id);
            if !Self::is_open(status) {
                return Err(EngineError::NotModifiable {
                    product_id: id,
                    status,
                });
            }
        }

        let mut updated = order.clone();
        for product in updated
            .products
            .iter_mut()
            .filter(|p| request.product_ids.contains(&p.id))
        {
            if let Some(date) = request.new_date {
                product.delivery_date = date;
            }
            if let Some(destination) = new_destination {
                product.destination = destination.to_string();
            }
        }

        tracing::info!(count = request.product_ids.len(), "订单商品已改期");
        Ok(updated)
    }
}
