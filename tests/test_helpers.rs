// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试数据构建器、标准快照与 Mock 配置
// ==========================================
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use dispatch_fulfillment::config::{ConfigError, EngineConfigReader};
use dispatch_fulfillment::domain::{
    Dispatch, Employee, FulfillmentSnapshot, Order, Permission, Product, Stop, Vehicle,
};
use dispatch_fulfillment::domain::types::{
    DispatchStatus, EmployeeStatus, PermissionStatus, ProductId, Shift, StopStatus, VehicleStatus,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn now() -> NaiveDateTime {
    date(2025, 3, 9).and_hms_opt(9, 30, 0).unwrap()
}

/// 标准交付日期
pub fn delivery_day() -> NaiveDate {
    date(2025, 3, 10)
}

// ==========================================
// Product 构建器
// ==========================================

pub struct ProductBuilder {
    id: ProductId,
    name: String,
    origin: String,
    destination: String,
    delivery_date: NaiveDate,
    shift: Shift,
}

impl ProductBuilder {
    pub fn new(id: ProductId) -> Self {
        Self {
            id,
            name: format!("Producto {}", id),
            origin: "W1".to_string(),
            destination: "C1".to_string(),
            delivery_date: delivery_day(),
            shift: Shift::Morning,
        }
    }

    pub fn route(mut self, origin: &str, destination: &str) -> Self {
        self.origin = origin.to_string();
        self.destination = destination.to_string();
        self
    }

    pub fn delivery_date(mut self, date: NaiveDate) -> Self {
        self.delivery_date = date;
        self
    }

    pub fn shift(mut self, shift: Shift) -> Self {
        self.shift = shift;
        self
    }

    pub fn build(self) -> Product {
        Product {
            id: self.id,
            name: self.name,
            quantity: 10.0,
            unit: "kg".to_string(),
            origin: self.origin,
            destination: self.destination,
            delivery_date: self.delivery_date,
            shift: self.shift,
        }
    }
}

// ==========================================
// Order 构建器
// ==========================================

pub struct OrderBuilder {
    code: String,
    client_name: String,
    products: Vec<Product>,
}

impl OrderBuilder {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            client_name: format!("Cliente {}", code),
            products: Vec::new(),
        }
    }

    pub fn client(mut self, name: &str) -> Self {
        self.client_name = name.to_string();
        self
    }

    pub fn product(mut self, product: Product) -> Self {
        self.products.push(product);
        self
    }

    pub fn build(self) -> Order {
        Order {
            code: self.code,
            client_name: self.client_name,
            phone: "987654321".to_string(),
            products: self.products,
        }
    }
}

// ==========================================
// Dispatch 构建器
// ==========================================

pub struct DispatchBuilder {
    id: String,
    status: DispatchStatus,
    stops: Vec<Stop>,
}

impl DispatchBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            status: DispatchStatus::Scheduled,
            stops: Vec::new(),
        }
    }

    pub fn status(mut self, status: DispatchStatus) -> Self {
        self.status = status;
        self
    }

    /// 追加停靠点,序号按追加顺序编号
    pub fn stop(mut self, status: StopStatus, products: Vec<Product>) -> Self {
        let sequence = self.stops.len() as u32 + 1;
        let (origin, destination) = products
            .first()
            .map(|p| (p.origin.clone(), p.destination.clone()))
            .unwrap_or_default();
        self.stops.push(Stop {
            id: format!("{}-{:02}", self.id, sequence),
            sequence,
            origin,
            destination,
            status,
            arrival_time: (status == StopStatus::Delivered).then(|| time(10, 0)),
            client_name: "Cliente".to_string(),
            products,
        });
        self
    }

    pub fn build(self) -> Dispatch {
        Dispatch {
            id: self.id,
            date: delivery_day(),
            operator: "E1".to_string(),
            vehicle: "V1".to_string(),
            assistants: vec![],
            planned_start: time(8, 0),
            planned_end: time(12, 0),
            actual_start: None,
            actual_end: None,
            status: self.status,
            stops: self.stops,
        }
    }
}

// ==========================================
// 车队数据
// ==========================================

pub fn vehicle(placa: &str, license: &str, status: VehicleStatus) -> Vehicle {
    Vehicle {
        placa: placa.to_string(),
        vehicle_type: "Furgón".to_string(),
        required_license: license.to_string(),
        status,
    }
}

pub fn employee(code: &str, license: &str, status: EmployeeStatus) -> Employee {
    Employee {
        code: code.to_string(),
        name: format!("Empleado {}", code),
        license_category: license.to_string(),
        license_expiry: date(2027, 6, 30),
        status,
    }
}

pub fn permission(employee_code: &str, placa: &str, status: PermissionStatus) -> Permission {
    Permission {
        employee_code: employee_code.to_string(),
        vehicle_placa: placa.to_string(),
        status,
        last_change_date: None,
        change_reason: None,
    }
}

/// 标准快照
///
/// - 订单 P-001: 商品 1 (W1→Store-1), 2 (W1→Store-2)
/// - 订单 P-002: 商品 3 (W1→C1), 4 (W1→C2), 5 (C1→C2)
/// - 车辆 V1 (A-I, 运营), V2 (A-IIb, 维修)
/// - 员工 E1 (A-I, 授权 V1), E2 (A-IIIb, 授权 V1), E3/E4 在岗, E5 休假
pub fn sample_snapshot() -> FulfillmentSnapshot {
    FulfillmentSnapshot {
        orders: vec![
            OrderBuilder::new("P-001")
                .client("Bodega Central")
                .product(ProductBuilder::new(1).route("W1", "Store-1").build())
                .product(ProductBuilder::new(2).route("W1", "Store-2").build())
                .build(),
            OrderBuilder::new("P-002")
                .client("Minimarket Norte")
                .product(ProductBuilder::new(3).route("W1", "C1").build())
                .product(ProductBuilder::new(4).route("W1", "C2").build())
                .product(ProductBuilder::new(5).route("C1", "C2").build())
                .build(),
        ],
        dispatches: vec![],
        cancellation_log: Default::default(),
        vehicles: vec![
            vehicle("V1", "A-I", VehicleStatus::Operational),
            vehicle("V2", "A-IIb", VehicleStatus::Maintenance),
        ],
        employees: vec![
            employee("E1", "A-I", EmployeeStatus::Active),
            employee("E2", "A-IIIb", EmployeeStatus::Active),
            employee("E3", "A-I", EmployeeStatus::Active),
            employee("E4", "A-I", EmployeeStatus::Active),
            employee("E5", "A-I", EmployeeStatus::OnVacation),
        ],
        permissions: vec![
            permission("E1", "V1", PermissionStatus::Enabled),
            permission("E2", "V1", PermissionStatus::Enabled),
            permission("E3", "V1", PermissionStatus::Suspended),
        ],
    }
}

// ==========================================
// Mock 配置
// ==========================================

/// Mock 配置结构
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub dispatch_code_prefix: String,
    pub dispatch_code_width: usize,
    pub stop_code_width: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            window_start: time(7, 0),
            window_end: time(22, 0),
            dispatch_code_prefix: "DP".to_string(),
            dispatch_code_width: 3,
            stop_code_width: 2,
        }
    }
}

impl EngineConfigReader for MockConfig {
    fn get_operating_window(&self) -> Result<(NaiveTime, NaiveTime), ConfigError> {
        Ok((self.window_start, self.window_end))
    }

    fn get_dispatch_code_prefix(&self) -> Result<String, ConfigError> {
        Ok(self.dispatch_code_prefix.clone())
    }

    fn get_dispatch_code_width(&self) -> Result<usize, ConfigError> {
        Ok(self.dispatch_code_width)
    }

    fn get_stop_code_width(&self) -> Result<usize, ConfigError> {
        Ok(self.stop_code_width)
    }

    fn get_default_locale(&self) -> Result<String, ConfigError> {
        Ok("es".to_string())
    }
}
