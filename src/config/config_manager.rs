// ==========================================
// 订单履约引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: 内存 key-value (可从 JSON 文件加载)
// ==========================================

use crate::config::engine_config_trait::{ConfigError, EngineConfigReader};
use anyhow::Context;
use chrono::NaiveTime;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const OPERATING_WINDOW_START: &str = "operating_window_start";
    pub const OPERATING_WINDOW_END: &str = "operating_window_end";
    pub const DISPATCH_CODE_PREFIX: &str = "dispatch_code_prefix";
    pub const DISPATCH_CODE_WIDTH: &str = "dispatch_code_width";
    pub const STOP_CODE_WIDTH: &str = "stop_code_width";
    pub const DEFAULT_LOCALE: &str = "default_locale";
}

const DEFAULT_WINDOW_START: &str = "07:00";
const DEFAULT_WINDOW_END: &str = "22:00";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    values: HashMap<String, String>,
}

impl ConfigManager {
    /// 创建使用全部默认值的 ConfigManager
    pub fn new() -> Self {
        Self::default()
    }

    /// 从键值对创建
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// 从 JSON 对象文件加载
    ///
    /// # 格式
    /// `{"operating_window_start": "06:30", "dispatch_code_width": 4}`
    /// 字符串、数字、布尔值均按文本保存;null 与嵌套值被忽略
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let parsed: BTreeMap<String, JsonValue> = serde_json::from_str(&raw)
            .with_context(|| format!("配置文件不是 JSON 对象: {}", path.display()))?;

        let mut values = HashMap::new();
        for (key, value) in parsed {
            let text = match value {
                JsonValue::String(s) => s,
                JsonValue::Number(n) => n.to_string(),
                JsonValue::Bool(b) => b.to_string(),
                other => {
                    tracing::warn!(config_key = %key, raw_value = %other, "忽略非标量配置项");
                    continue;
                }
            };
            values.insert(key, text);
        }

        tracing::info!(path = %path.display(), count = values.len(), "配置文件加载完成");
        Ok(Self { values })
    }

    /// 覆写配置值
    pub fn set_config_value(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    /// 读取配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    /// 读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    /// 获取所有配置的快照（JSON格式,键有序）
    pub fn get_config_snapshot(&self) -> Result<String, ConfigError> {
        let ordered: BTreeMap<&String, &String> = self.values.iter().collect();
        Ok(serde_json::to_string(&ordered)?)
    }

    fn parse_time(&self, key: &str, default: &str) -> Result<NaiveTime, ConfigError> {
        let value = self.get_config_or_default(key, default);
        NaiveTime::parse_from_str(&value, "%H:%M").map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.clone(),
            message: e.to_string(),
        })
    }

    fn parse_width(&self, key: &str, default: usize) -> Result<usize, ConfigError> {
        let value = self.get_config_or_default(key, &default.to_string());
        match value.parse::<usize>() {
            Ok(width) if width > 0 => Ok(width),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value,
                message: "必须为正整数".to_string(),
            }),
        }
    }
}

// ==========================================
// EngineConfigReader Trait 实现
// ==========================================
impl EngineConfigReader for ConfigManager {
    fn get_operating_window(&self) -> Result<(NaiveTime, NaiveTime), ConfigError> {
        let start = self.parse_time(config_keys::OPERATING_WINDOW_START, DEFAULT_WINDOW_START)?;
        let end = self.parse_time(config_keys::OPERATING_WINDOW_END, DEFAULT_WINDOW_END)?;
        if start >= end {
            return Err(ConfigError::InvalidValue {
                key: config_keys::OPERATING_WINDOW_END.to_string(),
                value: end.format("%H:%M").to_string(),
                message: format!("截止时间必须晚于起始时间 {}", start.format("%H:%M")),
            });
        }
        Ok((start, end))
    }

    fn get_dispatch_code_prefix(&self) -> Result<String, ConfigError> {
        Ok(self.get_config_or_default(config_keys::DISPATCH_CODE_PREFIX, "DP"))
    }

    fn get_dispatch_code_width(&self) -> Result<usize, ConfigError> {
        self.parse_width(config_keys::DISPATCH_CODE_WIDTH, 3)
    }

    fn get_stop_code_width(&self) -> Result<usize, ConfigError> {
        self.parse_width(config_keys::STOP_CODE_WIDTH, 2)
    }

    fn get_default_locale(&self) -> Result<String, ConfigError> {
        Ok(self.get_config_or_default(config_keys::DEFAULT_LOCALE, "es"))
    }
}
