// ==========================================
// 订单履约引擎 - 配送领域模型
// ==========================================
// 职责: 配送单(一次出车)与停靠点
// 约束: 同一配送单内 sequence 为 1..N 的排列
// ==========================================

use crate::domain::order::Product;
use crate::domain::types::{DispatchStatus, ProductId, StopStatus};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Stop - 停靠点
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,                        // 停靠点ID
    pub sequence: u32,                     // 路线序号 (1..N)
    pub origin: String,                    // 起点
    pub destination: String,               // 终点
    pub status: StopStatus,                // 当前状态
    pub arrival_time: Option<NaiveTime>,   // 到达时间 (仅 Delivered)
    pub client_name: String,               // 收货客户
    pub products: Vec<Product>,            // 本站承运商品(引用快照)
}

impl Stop {
    pub fn carries(&self, id: ProductId) -> bool {
        self.products.iter().any(|p| p.id == id)
    }
}

// ==========================================
// Dispatch - 配送单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub id: String,                             // 配送单号 (DP001...)
    pub date: NaiveDate,                        // 出车日期
    pub operator: String,                       // 司机(员工编码)
    pub vehicle: String,                        // 车牌
    pub assistants: Vec<String>,                // 助手(员工编码)
    pub planned_start: NaiveTime,               // 计划开始
    pub planned_end: NaiveTime,                 // 计划结束
    pub actual_start: Option<NaiveTime>,        // 实际开始
    pub actual_end: Option<NaiveTime>,          // 实际结束
    pub status: DispatchStatus,                 // 状态
    pub stops: Vec<Stop>,                       // 停靠点(按 sequence 排序)
}

impl Dispatch {
    pub fn stop(&self, stop_id: &str) -> Option<&Stop> {
        self.stops.iter().find(|s| s.id == stop_id)
    }

    /// 本配送单承运的全部商品 ID
    pub fn product_ids(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.stops
            .iter()
            .flat_map(|s| s.products.iter().map(|p| p.id))
    }

    pub fn carries(&self, id: ProductId) -> bool {
        self.stops.iter().any(|s| s.carries(id))
    }

    /// 停靠点序号是否为 1..N 的排列
    pub fn has_contiguous_sequence(&self) -> bool {
        let mut seqs: Vec<u32> = self.stops.iter().map(|s| s.sequence).collect();
        seqs.sort_unstable();
        seqs.iter()
            .enumerate()
            .all(|(idx, seq)| *seq as usize == idx + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(id: &str, sequence: u32) -> Stop {
        Stop {
            id: id.to_string(),
            sequence,
            origin: "W1".to_string(),
            destination: "C1".to_string(),
            status: StopStatus::Pending,
            arrival_time: None,
            client_name: "Cliente".to_string(),
            products: vec![],
        }
    }

    fn dispatch(stops: Vec<Stop>) -> Dispatch {
        Dispatch {
            id: "DP001".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            operator: "EMP001".to_string(),
            vehicle: "ABC-123".to_string(),
            assistants: vec![],
            planned_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            planned_end: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            actual_start: None,
            actual_end: None,
            status: DispatchStatus::Scheduled,
            stops,
        }
    }

    #[test]
    fn test_contiguous_sequence() {
        assert!(dispatch(vec![stop("S1", 2), stop("S2", 1)]).has_contiguous_sequence());
        assert!(!dispatch(vec![stop("S1", 1), stop("S2", 3)]).has_contiguous_sequence());
        assert!(!dispatch(vec![stop("S1", 1), stop("S2", 1)]).has_contiguous_sequence());
        assert!(dispatch(vec![]).has_contiguous_sequence());
    }
}
