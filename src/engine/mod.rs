// ==========================================
// 订单履约引擎 - 引擎层
// ==========================================
// 职责: 纯函数规则引擎,对调用方提供的快照计算
// 红线: 引擎无 I/O,不持有可变共享状态
// ==========================================

pub mod cancellation;
pub mod error;
pub mod resource_eligibility;
pub mod sequencing;
pub mod status_derivation;
pub mod stop_transition;

// 重导出核心引擎
pub use cancellation::{
    CancellationEngine, CancellationOutcome, CancellationSelection, RescheduleRequest,
};
pub use error::{EngineError, EngineResult};
pub use resource_eligibility::{AssistantOption, AssistantSlots, ResourceEligibilityEngine};
pub use sequencing::{DispatchDraft, SequenceViolation, SequencingEngine};
pub use status_derivation::{ProductStatusMap, StatusDerivationEngine};
pub use stop_transition::{
    StopEditDraft, StopEditViolation, StopEditViolationKind, StopTransitionEngine,
};
