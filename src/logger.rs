//! 日志初始化

use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// `RUST_LOG` 优先；否则 verbose 时为 debug，平时为 info。重复调用不会 panic。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("exam_attempt_client={},warn", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
