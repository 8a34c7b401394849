// ==========================================
// 订单履约引擎 - 配送路线排序与派车单构建
// ==========================================
// 职责: 校验路线序号分配,按序号生成停靠点,分配配送单号
// 红线: 序号必须恰好是 1..N 的排列(N = 唯一地点数)
// 红线: 一个商品同一时刻最多出现在一张配送单中
// ==========================================

use crate::config::EngineConfigReader;
use crate::domain::dispatch::{Dispatch, Stop};
use crate::domain::order::Product;
use crate::domain::snapshot::{FulfillmentSnapshot, PendingProduct};
use crate::domain::types::{DispatchStatus, ProductId, StopStatus};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::resource_eligibility::ResourceEligibilityEngine;
use crate::engine::stop_transition::StopTransitionEngine;
use crate::i18n::t_with_args;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::instrument;

// ==========================================
// SequenceViolation - 路线序号错误
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SequenceViolation {
    /// 地点未填写序号
    Missing { location: String },
    /// 序号不是正整数
    NotNumeric { location: String, value: String },
    /// 序号重复
    Duplicate { location: String, value: u32 },
    /// 序号超出 1..N
    OutOfRange { location: String, value: u32, max: u32 },
}

impl SequenceViolation {
    pub fn location(&self) -> &str {
        match self {
            SequenceViolation::Missing { location }
            | SequenceViolation::NotNumeric { location, .. }
            | SequenceViolation::Duplicate { location, .. }
            | SequenceViolation::OutOfRange { location, .. } => location,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SequenceViolation::Missing { .. } => "SEQUENCE_MISSING",
            SequenceViolation::NotNumeric { .. } => "SEQUENCE_NOT_NUMERIC",
            SequenceViolation::Duplicate { .. } => "SEQUENCE_DUPLICATE",
            SequenceViolation::OutOfRange { .. } => "SEQUENCE_OUT_OF_RANGE",
        }
    }

    /// 本地化提示
    pub fn message(&self) -> String {
        match self {
            SequenceViolation::Missing { location } => {
                t_with_args("sequence.missing", &[("location", location.as_str())])
            }
            SequenceViolation::NotNumeric { location, value } => t_with_args(
                "sequence.not_numeric",
                &[("location", location.as_str()), ("value", value.as_str())],
            ),
            SequenceViolation::Duplicate { value, .. } => {
                t_with_args("sequence.duplicate", &[("value", value.to_string().as_str())])
            }
            SequenceViolation::OutOfRange { location, max, .. } => t_with_args(
                "sequence.out_of_range",
                &[("location", location.as_str()), ("max", max.to_string().as_str())],
            ),
        }
    }
}

impl fmt::Display for SequenceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

// ==========================================
// DispatchDraft - 派车草稿
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchDraft {
    pub product_ids: Vec<ProductId>,
    /// 地点 → 序号文本
    pub sequence: HashMap<String, String>,
    pub date: NaiveDate,
    pub vehicle: String,
    pub operator: String,
    pub assistants: Vec<String>,
    pub planned_start: String, // HH:MM
    pub planned_end: String,   // HH:MM
}

// ==========================================
// SequencingEngine
// ==========================================
pub struct SequencingEngine;

impl SequencingEngine {
    /// 所选商品涉及的唯一地点
    ///
    /// 起点在前、终点在后,各自按首次出现顺序;同一地点只出现一次
    pub fn unique_locations<'a, I>(products: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a Product>,
    {
        let products: Vec<&Product> = products.into_iter().collect();
        let mut locations: Vec<String> = Vec::new();
        let origins = products.iter().map(|p| &p.origin);
        let destinations = products.iter().map(|p| &p.destination);
        for location in origins.chain(destinations) {
            if !locations.contains(location) {
                locations.push(location.clone());
            }
        }
        locations
    }

    /// 校验序号分配并解析为整数
    ///
    /// # 规则
    /// 1. 每个唯一地点都必须有非空的纯数字序号
    /// 2. 序号落在 1..=N
    /// 3. 序号两两不同
    ///
    /// 三条同时满足即为 1..N 的排列;多余的地点键被忽略
    ///
    /// # 返回
    /// - Ok: 地点 → 序号
    /// - Err: 按地点顺序遇到的第一个错误
    pub fn check_sequence(
        locations: &[String],
        assigned: &HashMap<String, String>,
    ) -> Result<BTreeMap<String, u32>, SequenceViolation> {
        let max = locations.len() as u32;
        let mut parsed: BTreeMap<String, u32> = BTreeMap::new();
        let mut seen: HashMap<u32, &str> = HashMap::new();

        for location in locations {
            let raw = assigned.get(location).map(|v| v.trim()).unwrap_or("");
            if raw.is_empty() {
                return Err(SequenceViolation::Missing {
                    location: location.clone(),
                });
            }
            let value = raw
                .chars()
                .all(|c| c.is_ascii_digit())
                .then(|| raw.parse::<u32>().ok())
                .flatten()
                .ok_or_else(|| SequenceViolation::NotNumeric {
                    location: location.clone(),
                    value: raw.to_string(),
                })?;

            if value == 0 || value > max {
                return Err(SequenceViolation::OutOfRange {
                    location: location.clone(),
                    value,
                    max,
                });
            }
            if seen.insert(value, location).is_some() {
                return Err(SequenceViolation::Duplicate {
                    location: location.clone(),
                    value,
                });
            }
            parsed.insert(location.clone(), value);
        }

        Ok(parsed)
    }

    /// 路线序号是否有效
    pub fn validate_sequence(locations: &[String], assigned: &HashMap<String, String>) -> bool {
        Self::check_sequence(locations, assigned).is_ok()
    }

    /// 下一个配送单号
    ///
    /// 前缀 + (现有最大数字后缀 + 1) 左补零;无法解析的单号忽略
    /// 后缀已达 u64 上限时返回 DispatchCodeExhausted
    pub fn next_dispatch_code(
        dispatches: &[Dispatch],
        config: &dyn EngineConfigReader,
    ) -> EngineResult<String> {
        let prefix = config.get_dispatch_code_prefix()?;
        let width = config.get_dispatch_code_width()?;
        let max = dispatches
            .iter()
            .filter_map(|d| d.id.strip_prefix(prefix.as_str()))
            .filter_map(|suffix| suffix.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        let next = max
            .checked_add(1)
            .ok_or_else(|| EngineError::DispatchCodeExhausted {
                prefix: prefix.clone(),
            })?;
        Ok(format!("{}{:0width$}", prefix, next, width = width))
    }

    /// 尚未派车的商品
    ///
    /// # 参数
    /// - date: 指定时只返回该交付日期的商品
    pub fn unassigned_products(
        snapshot: &FulfillmentSnapshot,
        date: Option<NaiveDate>,
    ) -> Vec<PendingProduct> {
        snapshot
            .orders
            .iter()
            .flat_map(|order| {
                order.products.iter().map(move |product| PendingProduct {
                    order_code: order.code.clone(),
                    client_name: order.client_name.clone(),
                    product: product.clone(),
                })
            })
            .filter(|pending| snapshot.dispatch_of_product(pending.product.id).is_none())
            .filter(|pending| date.map_or(true, |d| pending.product.delivery_date == d))
            .collect()
    }

    /// 由派车草稿构建新配送单
    ///
    /// # 校验顺序
    /// 1. 至少选择一个商品;商品存在且未被派车
    /// 2. 路线序号有效
    /// 3. 车辆存在且可运营;司机具备驾驶资格
    /// 4. 助手全部填写、互不重复
    /// 5. 计划开始 < 计划结束
    ///
    /// # 构建规则
    /// - 同一 (起点, 终点) 的商品合并为一个停靠点,按首次出现顺序
    /// - 停靠点按 (起点序号, 终点序号) 稳定排序,编号 1..N
    /// - 停靠点全部 Pending,配送单 Scheduled
    #[instrument(skip(draft, snapshot, config), fields(vehicle = %draft.vehicle, operator = %draft.operator))]
    pub fn build_dispatch(
        draft: &DispatchDraft,
        snapshot: &FulfillmentSnapshot,
        config: &dyn EngineConfigReader,
    ) -> EngineResult<Dispatch> {
        // === 步骤 1: 商品 ===
        if draft.product_ids.is_empty() {
            return Err(EngineError::NoProductsSelected);
        }
        let mut selected: Vec<(&Product, &str)> = Vec::with_capacity(draft.product_ids.len());
        for &id in &draft.product_ids {
            if selected.iter().any(|(p, _)| p.id == id) {
                continue;
            }
            if let Some(dispatch) = snapshot.dispatch_of_product(id) {
                return Err(EngineError::ProductAlreadyDispatched {
                    product_id: id,
                    dispatch_id: dispatch.id.clone(),
                });
            }
            let order = snapshot
                .order_of_product(id)
                .ok_or(EngineError::UnknownProduct(id))?;
            let product = order.product(id).ok_or(EngineError::UnknownProduct(id))?;
            selected.push((product, order.client_name.as_str()));
        }

        // === 步骤 2: 路线序号 ===
        let locations = Self::unique_locations(selected.iter().map(|(p, _)| *p));
        let sequence =
            Self::check_sequence(&locations, &draft.sequence).map_err(EngineError::InvalidSequence)?;

        // === 步骤 3: 车辆与司机 ===
        let vehicle = snapshot
            .vehicle(&draft.vehicle)
            .ok_or_else(|| EngineError::VehicleNotFound(draft.vehicle.clone()))?;
        if !vehicle.is_operational() {
            return Err(EngineError::VehicleNotOperational(vehicle.placa.clone()));
        }
        let operator = snapshot
            .employee(&draft.operator)
            .ok_or_else(|| EngineError::EmployeeNotFound(draft.operator.clone()))?;
        if !ResourceEligibilityEngine::is_eligible_operator(operator, vehicle, &snapshot.permissions) {
            return Err(EngineError::OperatorNotEligible {
                employee_code: operator.code.clone(),
                vehicle_placa: vehicle.placa.clone(),
            });
        }

        // === 步骤 4: 助手 ===
        ResourceEligibilityEngine::validate_assistants(
            &draft.assistants,
            &operator.code,
            &snapshot.employees,
        )?;

        // === 步骤 5: 计划时间 ===
        let planned_start = Self::parse_planned_time("planned_start", &draft.planned_start)?;
        let planned_end = Self::parse_planned_time("planned_end", &draft.planned_end)?;
        if planned_start >= planned_end {
            return Err(EngineError::InvalidTimeRange {
                start: planned_start,
                end: planned_end,
            });
        }

        // === 步骤 6: 停靠点 ===
        let id = Self::next_dispatch_code(&snapshot.dispatches, config)?;
        let stop_width = config.get_stop_code_width()?;

        let mut journeys: Vec<Journey> = Vec::new();
        for (product, client_name) in &selected {
            match journeys
                .iter_mut()
                .find(|j| j.origin == product.origin && j.destination == product.destination)
            {
                Some(journey) => journey.push(product, client_name),
                None => {
                    let mut journey = Journey::new(&product.origin, &product.destination);
                    journey.push(product, client_name);
                    journeys.push(journey);
                }
            }
        }
        let position = |location: &str| sequence.get(location).copied().unwrap_or(u32::MAX);
        journeys.sort_by_key(|j| (position(&j.origin), position(&j.destination)));

        let stops = journeys
            .into_iter()
            .enumerate()
            .map(|(idx, journey)| Stop {
                id: format!("{}-{:0width$}", id, idx + 1, width = stop_width),
                sequence: idx as u32 + 1,
                origin: journey.origin,
                destination: journey.destination,
                status: StopStatus::Pending,
                arrival_time: None,
                client_name: journey.client_names.join(", "),
                products: journey.products,
            })
            .collect::<Vec<_>>();

        tracing::info!(dispatch_id = %id, stop_count = stops.len(), "配送单已生成");

        Ok(Dispatch {
            id,
            date: draft.date,
            operator: operator.code.clone(),
            vehicle: vehicle.placa.clone(),
            assistants: draft.assistants.iter().map(|a| a.trim().to_string()).collect(),
            planned_start,
            planned_end,
            actual_start: None,
            actual_end: None,
            status: DispatchStatus::Scheduled,
            stops,
        })
    }

    fn parse_planned_time(field: &str, raw: &str) -> EngineResult<NaiveTime> {
        StopTransitionEngine::parse_time(raw).ok_or_else(|| EngineError::InvalidTimeFormat {
            field: field.to_string(),
            value: raw.to_string(),
        })
    }
}

/// 同一 (起点, 终点) 的商品分组
struct Journey {
    origin: String,
    destination: String,
    client_names: Vec<String>,
    products: Vec<Product>,
}

impl Journey {
    fn new(origin: &str, destination: &str) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            client_names: Vec::new(),
            products: Vec::new(),
        }
    }

    fn push(&mut self, product: &Product, client_name: &str) {
        if !self.client_names.iter().any(|c| c == client_name) {
            self.client_names.push(client_name.to_string());
        }
        self.products.push(product.clone());
    }
}
