// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 支持环境变量配置日志级别,可选 JSON 输出
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 人类可读文本
    #[default]
    Text,
    /// 每行一个 JSON 对象（便于日志采集）
    Json,
}

/// 初始化日志系统（文本格式）
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=debug 或 RUST_LOG=dispatch_fulfillment=trace
///
/// # 示例
/// ```no_run
/// use dispatch_fulfillment::logging;
/// logging::init();
/// ```
pub fn init() {
    init_with_format(LogFormat::Text);
}

/// 按指定格式初始化日志系统
///
/// 重复初始化时保留已有的全局 subscriber
pub fn init_with_format(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format {
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .try_init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init(),
    };
    if let Err(err) = result {
        tracing::debug!(error = %err, "日志系统已初始化,跳过");
    }
}

/// 初始化测试环境的日志系统
///
/// 使用 debug 级别并输出到测试捕获器
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
