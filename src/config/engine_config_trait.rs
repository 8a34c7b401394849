// ==========================================
// 订单履约引擎 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use chrono::NaiveTime;
use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置值非法 (key={key}, value={value}): {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    #[error("配置序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 实现者: ConfigManager
pub trait EngineConfigReader: Send + Sync {
    /// 获取作业时间窗 (起始, 截止)
    ///
    /// 到达时间 t 合法当且仅当 起始 <= t < 截止
    ///
    /// # 默认值
    /// - (07:00, 22:00)
    fn get_operating_window(&self) -> Result<(NaiveTime, NaiveTime), ConfigError>;

    /// 获取配送单号前缀
    ///
    /// # 默认值
    /// - "DP"
    fn get_dispatch_code_prefix(&self) -> Result<String, ConfigError>;

    /// 获取配送单号数字位数
    ///
    /// # 默认值
    /// - 3
    fn get_dispatch_code_width(&self) -> Result<usize, ConfigError>;

    /// 获取停靠点编号数字位数
    ///
    /// # 默认值
    /// - 2
    fn get_stop_code_width(&self) -> Result<usize, ConfigError>;

    /// 获取默认语言
    ///
    /// # 默认值
    /// - "es"
    fn get_default_locale(&self) -> Result<String, ConfigError>;
}
