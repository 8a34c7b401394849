// ==========================================
// 订单履约引擎 - 配置层
// ==========================================
// 职责: 引擎配置管理,支持默认值 + 覆写
// ==========================================

pub mod config_manager;
pub mod engine_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use engine_config_trait::{ConfigError, EngineConfigReader};
