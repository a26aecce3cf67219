// ==========================================
// 石材车间加工系统 - 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// RUST_LOG 控制级别，STONE_WORKSHOP_LOG_FORMAT=json 切换为 JSON 输出
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 日志格式环境变量
pub const LOG_FORMAT_ENV: &str = "STONE_WORKSHOP_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// 按环境变量选择文本或 JSON 格式
///
/// # 示例
/// ```no_run
/// stone_workshop::logging::init_from_env();
/// ```
pub fn init_from_env() {
    match std::env::var(LOG_FORMAT_ENV) {
        Ok(format) if format.eq_ignore_ascii_case("json") => init_json(),
        _ => init(),
    }
}

/// 文本格式（带 target 与行号）
///
/// RUST_LOG 示例: `RUST_LOG=stone_workshop::engine=trace`
pub fn init() {
    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// JSON 格式，供无人值守运行时采集
pub fn init_json() {
    fmt()
        .json()
        .with_env_filter(env_filter())
        .with_current_span(false)
        .init();
}

/// 测试用：debug 级别写入测试输出，重复调用安全
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
