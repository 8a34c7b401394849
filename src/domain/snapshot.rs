// ==========================================
// 订单履约引擎 - 数据快照与视图对象
// ==========================================
// 职责: 调用方持有的全量内存数据 + 派生视图
// 红线: 引擎只读快照计算,提交由 api 层原子完成
// ==========================================

use crate::domain::dispatch::Dispatch;
use crate::domain::fleet::{Employee, Permission, Vehicle};
use crate::domain::order::{CancellationLog, Order, Product};
use crate::domain::types::{OrderStatus, ProductId, ProductStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// FulfillmentSnapshot - 全量快照
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentSnapshot {
    pub orders: Vec<Order>,
    pub dispatches: Vec<Dispatch>,
    pub cancellation_log: CancellationLog,
    pub vehicles: Vec<Vehicle>,
    pub employees: Vec<Employee>,
    pub permissions: Vec<Permission>,
}

impl FulfillmentSnapshot {
    pub fn order(&self, code: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.code == code)
    }

    pub fn dispatch(&self, id: &str) -> Option<&Dispatch> {
        self.dispatches.iter().find(|d| d.id == id)
    }

    pub fn vehicle(&self, placa: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.placa == placa)
    }

    pub fn employee(&self, code: &str) -> Option<&Employee> {
        self.employees.iter().find(|e| e.code == code)
    }

    /// 包含某商品的在途订单
    pub fn order_of_product(&self, id: ProductId) -> Option<&Order> {
        self.orders.iter().find(|o| o.contains(id))
    }

    /// 承运某商品的配送单
    pub fn dispatch_of_product(&self, id: ProductId) -> Option<&Dispatch> {
        self.dispatches.iter().find(|d| d.carries(id))
    }
}

// ==========================================
// OrderStatusView - 订单状态视图
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusView {
    pub order_code: String,
    pub client_name: String,
    pub status: OrderStatus,
    pub product_statuses: BTreeMap<ProductId, ProductStatus>,
    pub live_count: usize,      // 在途商品数
    pub cancelled_count: usize, // 已取消商品数
}

// ==========================================
// PendingProduct - 待派车商品
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingProduct {
    pub order_code: String,
    pub client_name: String,
    pub product: Product,
}
