// ==========================================
// 订单履约引擎 - 订单领域模型
// ==========================================
// 职责: 订单、订单行(商品)、取消记录
// 红线: 取消记录只追加,不覆盖
// ==========================================

use crate::domain::types::{ProductId, Shift};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==========================================
// Product - 订单行
// ==========================================
// 归属唯一订单;派车后被 Stop 引用(不转移所有权)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,               // 全系统唯一
    pub name: String,                // 品名
    pub quantity: f64,               // 数量
    pub unit: String,                // 单位
    pub origin: String,              // 起点
    pub destination: String,         // 终点
    pub delivery_date: NaiveDate,    // 交付日期
    pub shift: Shift,                // 班次
}

// ==========================================
// Order - 客户订单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub code: String,          // 订单号(唯一)
    pub client_name: String,   // 客户名称
    pub phone: String,         // 联系方式
    pub products: Vec<Product>, // 在途商品
}

impl Order {
    /// 按 ID 查找商品
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// 商品 ID 集合
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.products.iter().map(|p| p.id).collect()
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.products.iter().any(|p| p.id == id)
    }
}

// ==========================================
// CancellationRecord - 取消记录
// ==========================================
// 部分取消与整单取消共用同一结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationRecord {
    pub record_id: String,           // 记录ID (uuid)
    pub order_code: String,          // 订单号
    pub client_name: String,         // 客户名称
    pub phone: String,               // 联系方式
    pub reason: String,              // 取消原因(必填)
    pub products: Vec<Product>,      // 本次取消的商品
    pub is_partial: bool,            // 订单仍有在途商品
    pub cancelled_at: NaiveDateTime, // 取消时间
}

// ==========================================
// CancellationLog - 取消历史
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CancellationLog {
    records: Vec<CancellationRecord>,
}

impl CancellationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<CancellationRecord>) -> Self {
        Self { records }
    }

    /// 追加一条记录（历史只增不改）
    pub fn append(&mut self, record: CancellationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[CancellationRecord] {
        &self.records
    }

    /// 某订单的全部取消记录
    pub fn records_for<'a>(
        &'a self,
        order_code: &'a str,
    ) -> impl Iterator<Item = &'a CancellationRecord> + 'a {
        self.records.iter().filter(move |r| r.order_code == order_code)
    }

    /// 某订单已取消的商品
    pub fn cancelled_products_for<'a>(&'a self, order_code: &'a str) -> Vec<&'a Product> {
        self.records_for(order_code)
            .flat_map(|r| r.products.iter())
            .collect()
    }

    /// 某订单已取消的商品 ID
    pub fn cancelled_ids_for(&self, order_code: &str) -> HashSet<ProductId> {
        self.records_for(order_code)
            .flat_map(|r| r.products.iter().map(|p| p.id))
            .collect()
    }

    /// 有取消记录的订单号(按首次出现顺序)
    pub fn order_codes(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.order_code.as_str()))
            .map(|r| r.order_code.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
