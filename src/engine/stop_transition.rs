// ==========================================
// 订单履约引擎 - 停靠点状态机
// ==========================================
// 状态序号: Pending(0) → Picking(1) → EnRoute/InTransit(2) → Delivered(3)
// 红线: 不得回退到低于已持久化状态的序号
// 红线: 一批编辑要么全部通过,要么全部拒绝
// ==========================================
// 输入: 已持久化的 Dispatch + 编辑草稿
// 输出: 校验结果 / 提交后的新 Dispatch
// ==========================================

use crate::config::EngineConfigReader;
use crate::domain::dispatch::Dispatch;
use crate::domain::types::{DispatchStatus, StopStatus};
use crate::engine::error::{EngineError, EngineResult};
use crate::i18n::{t, t_with_args};
use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::instrument;

// ==========================================
// StopEditDraft - 停靠点编辑草稿
// ==========================================
// 草稿与已提交数据分离,保存时才整体校验并提交
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopEditDraft {
    /// stop_id → 新状态
    pub statuses: HashMap<String, StopStatus>,
    /// stop_id → 到达时间文本 (HH:MM),空串表示清空
    pub arrival_times: HashMap<String, String>,
}

impl StopEditDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&mut self, stop_id: &str, status: StopStatus) -> &mut Self {
        self.statuses.insert(stop_id.to_string(), status);
        self
    }

    pub fn set_arrival_time(&mut self, stop_id: &str, time: &str) -> &mut Self {
        self.arrival_times.insert(stop_id.to_string(), time.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty() && self.arrival_times.is_empty()
    }
}

// ==========================================
// StopEditViolation - 单个停靠点的校验错误
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopEditViolationKind {
    UnknownStop,
    StatusRegression { from: StopStatus, to: StopStatus },
    ArrivalTimeRequired,
    InvalidArrivalTime { value: String },
    ArrivalTimeOutOfWindow { time: NaiveTime },
}

impl StopEditViolationKind {
    /// 稳定错误码（供调用方高亮对应行）
    pub fn code(&self) -> &'static str {
        match self {
            StopEditViolationKind::UnknownStop => "UNKNOWN_STOP",
            StopEditViolationKind::StatusRegression { .. } => "STATUS_REGRESSION",
            StopEditViolationKind::ArrivalTimeRequired => "ARRIVAL_TIME_REQUIRED",
            StopEditViolationKind::InvalidArrivalTime { .. } => "INVALID_ARRIVAL_TIME",
            StopEditViolationKind::ArrivalTimeOutOfWindow { .. } => "ARRIVAL_TIME_OUT_OF_WINDOW",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopEditViolation {
    pub stop_id: String,
    pub kind: StopEditViolationKind,
    pub message: String, // 本地化提示
}

// ==========================================
// StopTransitionEngine
// ==========================================
pub struct StopTransitionEngine;

impl StopTransitionEngine {
    /// 解析到达时间文本 (HH:MM 或 HH:MM:SS)
    pub fn parse_time(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }

    /// 校验整批停靠点编辑
    ///
    /// # 规则（逐个停靠点,每个停靠点最多报告一个错误）
    /// 1. 草稿引用不存在的停靠点 → UnknownStop
    /// 2. 新状态序号 < 原状态序号 → StatusRegression
    /// 3. 新状态为 Delivered 且无到达时间 → ArrivalTimeRequired
    /// 4. 到达时间无法解析 → InvalidArrivalTime
    /// 5. 到达时间不在作业窗内 → ArrivalTimeOutOfWindow
    ///
    /// # 返回
    /// - Ok(()): 全部通过
    /// - Err(EngineError::StopEditRejected): 按 stop_id 归集的错误
    #[instrument(skip(dispatch, draft, config), fields(dispatch_id = %dispatch.id))]
    pub fn validate_stop_edits(
        dispatch: &Dispatch,
        draft: &StopEditDraft,
        config: &dyn EngineConfigReader,
    ) -> EngineResult<()> {
        let (window_start, window_end) = config.get_operating_window()?;
        let window_last = window_end - Duration::minutes(1);
        let mut violations: BTreeMap<String, StopEditViolation> = BTreeMap::new();

        // === 步骤 1: 草稿中的未知停靠点 ===
        let unknown = draft
            .statuses
            .keys()
            .chain(draft.arrival_times.keys())
            .filter(|id| dispatch.stop(id).is_none());
        for stop_id in unknown {
            violations.entry(stop_id.clone()).or_insert_with(|| StopEditViolation {
                stop_id: stop_id.clone(),
                kind: StopEditViolationKind::UnknownStop,
                message: t_with_args("stop_edit.unknown_stop", &[("stop_id", stop_id.as_str())]),
            });
        }

        // === 步骤 2: 逐个停靠点校验 ===
        for stop in &dispatch.stops {
            let target = draft.statuses.get(&stop.id).copied().unwrap_or(stop.status);
            let time_text = match draft.arrival_times.get(&stop.id) {
                Some(raw) => raw.trim().to_string(),
                None => stop
                    .arrival_time
                    .map(|t| t.format("%H:%M").to_string())
                    .unwrap_or_default(),
            };

            let kind = if target.ordinal() < stop.status.ordinal() {
                Some(StopEditViolationKind::StatusRegression {
                    from: stop.status,
                    to: target,
                })
            } else if target == StopStatus::Delivered && time_text.is_empty() {
                Some(StopEditViolationKind::ArrivalTimeRequired)
            } else if !time_text.is_empty() {
                match Self::parse_time(&time_text) {
                    None => Some(StopEditViolationKind::InvalidArrivalTime {
                        value: time_text.clone(),
                    }),
                    Some(time) if time < window_start || time >= window_end => {
                        Some(StopEditViolationKind::ArrivalTimeOutOfWindow { time })
                    }
                    Some(_) => None,
                }
            } else {
                None
            };

            if let Some(kind) = kind {
                let message = match &kind {
                    StopEditViolationKind::StatusRegression { from, to } => t_with_args(
                        "stop_edit.status_regression",
                        &[("from", from.to_db_str()), ("to", to.to_db_str())],
                    ),
                    StopEditViolationKind::ArrivalTimeRequired => {
                        t("stop_edit.arrival_time_required")
                    }
                    StopEditViolationKind::InvalidArrivalTime { value } => {
                        t_with_args("stop_edit.invalid_arrival_time", &[("value", value.as_str())])
                    }
                    StopEditViolationKind::ArrivalTimeOutOfWindow { .. } => t_with_args(
                        "stop_edit.arrival_time_out_of_window",
                        &[
                            ("start", window_start.format("%H:%M").to_string().as_str()),
                            ("end", window_last.format("%H:%M").to_string().as_str()),
                        ],
                    ),
                    StopEditViolationKind::UnknownStop => String::new(),
                };
                violations.insert(
                    stop.id.clone(),
                    StopEditViolation {
                        stop_id: stop.id.clone(),
                        kind,
                        message,
                    },
                );
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            tracing::warn!(error_count = violations.len(), "停靠点编辑被拒绝");
            Err(EngineError::StopEditRejected { violations })
        }
    }

    /// 校验并提交停靠点编辑
    ///
    /// # 规则
    /// 1. 先整批校验,失败则原 dispatch 不变
    /// 2. 本批次有停靠点新进入在途(序号 2) → 仍处于 Picking 的停靠点一并改为 EnRoute
    /// 3. 到达时间仅保存在 Delivered 停靠点上
    /// 4. 重新归约配送单状态
    #[instrument(skip(dispatch, draft, config), fields(dispatch_id = %dispatch.id))]
    pub fn apply_stop_edits(
        dispatch: &Dispatch,
        draft: &StopEditDraft,
        config: &dyn EngineConfigReader,
    ) -> EngineResult<Dispatch> {
        Self::validate_stop_edits(dispatch, draft, config)?;

        let trip_starting = dispatch.stops.iter().any(|stop| {
            let target = draft.statuses.get(&stop.id).copied().unwrap_or(stop.status);
            target.is_moving() && !stop.status.is_moving()
        });

        let mut updated = dispatch.clone();
        for stop in &mut updated.stops {
            let original = stop.status;
            let mut target = draft.statuses.get(&stop.id).copied().unwrap_or(original);
            if trip_starting && original == StopStatus::Picking && target == StopStatus::Picking {
                target = StopStatus::EnRoute;
            }
            stop.status = target;

            if target == StopStatus::Delivered {
                if let Some(raw) = draft.arrival_times.get(&stop.id) {
                    stop.arrival_time = Self::parse_time(raw);
                }
            } else {
                stop.arrival_time = None;
            }
        }

        updated.status = Self::rollup_dispatch_status(&updated);
        tracing::info!(
            from = %dispatch.status,
            to = %updated.status,
            trip_starting,
            "停靠点编辑已提交"
        );
        Ok(updated)
    }

    /// 由停靠点状态归约配送单状态
    ///
    /// # 规则
    /// 1. 全部 Delivered → Completed
    /// 2. 任一停靠点序号 ≥ 2 → EnRoute
    /// 3. 全部 Picking → Picking
    /// 4. 否则 → Scheduled
    /// 无停靠点时保持原状态
    pub fn rollup_dispatch_status(dispatch: &Dispatch) -> DispatchStatus {
        let stops = &dispatch.stops;
        if stops.is_empty() {
            return dispatch.status;
        }
        if stops.iter().all(|s| s.status == StopStatus::Delivered) {
            DispatchStatus::Completed
        } else if stops.iter().any(|s| s.status.is_moving()) {
            DispatchStatus::EnRoute
        } else if stops.iter().all(|s| s.status == StopStatus::Picking) {
            DispatchStatus::Picking
        } else {
            DispatchStatus::Scheduled
        }
    }

    /// 开始拣货: Scheduled 配送单及其全部停靠点进入 Picking
    ///
    /// 其他状态原样返回
    pub fn start_picking(dispatch: &Dispatch) -> Dispatch {
        let mut updated = dispatch.clone();
        if dispatch.status != DispatchStatus::Scheduled {
            tracing::debug!(dispatch_id = %dispatch.id, status = %dispatch.status, "非排班状态,忽略开始拣货");
            return updated;
        }
        updated.status = DispatchStatus::Picking;
        for stop in &mut updated.stops {
            stop.status = StopStatus::Picking;
        }
        updated
    }

    /// 记录实际出车/收车时间
    ///
    /// 空串表示未填写;两者都填写时收车不得早于出车
    pub fn record_actual_times(dispatch: &Dispatch, start: &str, end: &str) -> EngineResult<Dispatch> {
        let parse = |field: &str, raw: &str| -> EngineResult<Option<NaiveTime>> {
            if raw.trim().is_empty() {
                return Ok(None);
            }
            Self::parse_time(raw)
                .map(Some)
                .ok_or_else(|| EngineError::InvalidTimeFormat {
                    field: field.to_string(),
                    value: raw.to_string(),
                })
        };
        let actual_start = parse("actual_start", start)?;
        let actual_end = parse("actual_end", end)?;
        if let (Some(s), Some(e)) = (actual_start, actual_end) {
            if e < s {
                return Err(EngineError::InvalidTimeRange { start: s, end: e });
            }
        }

        let mut updated = dispatch.clone();
        updated.actual_start = actual_start;
        updated.actual_end = actual_end;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::domain::dispatch::Stop;
    use chrono::NaiveDate;

    fn stop(id: &str, sequence: u32, status: StopStatus) -> Stop {
        Stop {
            id: id.to_string(),
            sequence,
            origin: "W1".to_string(),
            destination: format!("C{}", sequence),
            status,
            arrival_time: None,
            client_name: "Cliente".to_string(),
            products: vec![],
        }
    }

    fn dispatch(status: DispatchStatus, stops: Vec<Stop>) -> Dispatch {
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
            status,
            stops,
        }
    }

    fn rejected(result: EngineResult<()>) -> BTreeMap<String, StopEditViolation> {
        match result {
            Err(EngineError::StopEditRejected { violations }) => violations,
            other => panic!("Expected StopEditRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_delivered_requires_arrival_time() {
        let config = ConfigManager::new();
        let d = dispatch(DispatchStatus::EnRoute, vec![stop("S1", 1, StopStatus::InTransit)]);
        let mut draft = StopEditDraft::new();
        draft.set_status("S1", StopStatus::Delivered);

        let violations = rejected(StopTransitionEngine::validate_stop_edits(&d, &draft, &config));
        assert_eq!(violations["S1"].kind, StopEditViolationKind::ArrivalTimeRequired);

        draft.set_arrival_time("S1", "14:30");
        assert!(StopTransitionEngine::validate_stop_edits(&d, &draft, &config).is_ok());
    }

    #[test]
    fn test_window_boundaries() {
        let config = ConfigManager::new();
        let d = dispatch(DispatchStatus::EnRoute, vec![stop("S1", 1, StopStatus::InTransit)]);

        for (time, ok) in [("06:59", false), ("07:00", true), ("21:59", true), ("22:00", false)] {
            let mut draft = StopEditDraft::new();
            draft.set_status("S1", StopStatus::Delivered).set_arrival_time("S1", time);
            let result = StopTransitionEngine::validate_stop_edits(&d, &draft, &config);
            assert_eq!(result.is_ok(), ok, "time={}", time);
        }
    }

    #[test]
    fn test_regression_rejected() {
        let config = ConfigManager::new();
        let d = dispatch(DispatchStatus::Picking, vec![stop("S1", 1, StopStatus::Picking)]);
        let mut draft = StopEditDraft::new();
        draft.set_status("S1", StopStatus::Pending);

        let violations = rejected(StopTransitionEngine::validate_stop_edits(&d, &draft, &config));
        assert_eq!(violations["S1"].kind.code(), "STATUS_REGRESSION");
    }

    #[test]
    fn test_synonym_is_not_regression() {
        let config = ConfigManager::new();
        let d = dispatch(DispatchStatus::EnRoute, vec![stop("S1", 1, StopStatus::InTransit)]);
        let mut draft = StopEditDraft::new();
        draft.set_status("S1", StopStatus::EnRoute);
        assert!(StopTransitionEngine::validate_stop_edits(&d, &draft, &config).is_ok());
    }

    #[test]
    fn test_unknown_stop_and_bad_format() {
        let config = ConfigManager::new();
        let d = dispatch(DispatchStatus::EnRoute, vec![stop("S1", 1, StopStatus::InTransit)]);
        let mut draft = StopEditDraft::new();
        draft.set_status("S9", StopStatus::Delivered);
        draft.set_arrival_time("S1", "quince");

        let violations = rejected(StopTransitionEngine::validate_stop_edits(&d, &draft, &config));
        assert_eq!(violations["S9"].kind, StopEditViolationKind::UnknownStop);
        assert_eq!(violations["S1"].kind.code(), "INVALID_ARRIVAL_TIME");
    }

    #[test]
    fn test_batch_is_atomic() {
        let config = ConfigManager::new();
        let d = dispatch(
            DispatchStatus::EnRoute,
            vec![stop("S1", 1, StopStatus::InTransit), stop("S2", 2, StopStatus::InTransit)],
        );
        let mut draft = StopEditDraft::new();
        draft
            .set_status("S1", StopStatus::Delivered)
            .set_arrival_time("S1", "10:15")
            .set_status("S2", StopStatus::Delivered)
            .set_arrival_time("S2", "06:45");

        let result = StopTransitionEngine::apply_stop_edits(&d, &draft, &config);
        let violations = match result {
            Err(EngineError::StopEditRejected { violations }) => violations,
            other => panic!("Expected StopEditRejected, got {:?}", other),
        };
        assert_eq!(violations.len(), 1);
        assert!(violations.contains_key("S2"));
        // 原配送单保持不变
        assert_eq!(d.stops[0].status, StopStatus::InTransit);
    }

    #[test]
    fn test_trip_start_promotes_picking_stops() {
        let config = ConfigManager::new();
        let d = dispatch(
            DispatchStatus::Picking,
            vec![stop("S1", 1, StopStatus::Picking), stop("S2", 2, StopStatus::Picking)],
        );
        let mut draft = StopEditDraft::new();
        draft.set_status("S1", StopStatus::InTransit);

        let updated = StopTransitionEngine::apply_stop_edits(&d, &draft, &config).unwrap();
        assert_eq!(updated.stops[0].status, StopStatus::InTransit);
        assert_eq!(updated.stops[1].status, StopStatus::EnRoute);
        assert_eq!(updated.status, DispatchStatus::EnRoute);
    }

    #[test]
    fn test_all_delivered_completes_dispatch() {
        let config = ConfigManager::new();
        let d = dispatch(
            DispatchStatus::EnRoute,
            vec![stop("S1", 1, StopStatus::InTransit), stop("S2", 2, StopStatus::Delivered)],
        );
        let mut d = d;
        d.stops[1].arrival_time = NaiveTime::from_hms_opt(9, 0, 0);

        let mut draft = StopEditDraft::new();
        draft.set_status("S1", StopStatus::Delivered).set_arrival_time("S1", "11:20");

        let updated = StopTransitionEngine::apply_stop_edits(&d, &draft, &config).unwrap();
        assert_eq!(updated.status, DispatchStatus::Completed);
        assert_eq!(updated.stops[0].arrival_time, NaiveTime::from_hms_opt(11, 20, 0));
        assert_eq!(updated.stops[1].arrival_time, NaiveTime::from_hms_opt(9, 0, 0));
    }

    #[test]
    fn test_start_picking_only_from_scheduled() {
        let d = dispatch(
            DispatchStatus::Scheduled,
            vec![stop("S1", 1, StopStatus::Pending), stop("S2", 2, StopStatus::Pending)],
        );
        let picked = StopTransitionEngine::start_picking(&d);
        assert_eq!(picked.status, DispatchStatus::Picking);
        assert!(picked.stops.iter().all(|s| s.status == StopStatus::Picking));

        let en_route = dispatch(DispatchStatus::EnRoute, vec![stop("S1", 1, StopStatus::InTransit)]);
        assert_eq!(StopTransitionEngine::start_picking(&en_route), en_route);
    }

    #[test]
    fn test_record_actual_times() {
        let d = dispatch(DispatchStatus::EnRoute, vec![]);
        let updated = StopTransitionEngine::record_actual_times(&d, "08:05", "").unwrap();
        assert_eq!(updated.actual_start, NaiveTime::from_hms_opt(8, 5, 0));
        assert_eq!(updated.actual_end, None);

        assert!(matches!(
            StopTransitionEngine::record_actual_times(&d, "12:00", "09:00"),
            Err(EngineError::InvalidTimeRange { .. })
        ));
        assert!(matches!(
            StopTransitionEngine::record_actual_times(&d, "8h", ""),
            Err(EngineError::InvalidTimeFormat { .. })
        ));
    }
}
