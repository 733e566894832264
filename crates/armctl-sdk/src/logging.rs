//! 日志初始化
//!
//! 基于 `tracing-subscriber`，过滤规则取自 `RUST_LOG`，未设置时使用默认规则。

use tracing_subscriber::EnvFilter;

/// 默认日志过滤规则
pub const DEFAULT_LOG_FILTER: &str = "info";

/// 使用 `RUST_LOG`（缺省 [`DEFAULT_LOG_FILTER`]）初始化全局日志
///
/// 重复调用是安全的：已经安装过订阅者时什么也不做。
pub fn init_logger() {
    init_logger_with_filter(DEFAULT_LOG_FILTER);
}

/// 使用指定的默认规则初始化全局日志（`RUST_LOG` 优先）
pub fn init_logger_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global logger already initialised");
    }
}
