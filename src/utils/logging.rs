/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::{info, warn};

use crate::config::Config;
use crate::models::ExamResult;
use crate::workflow::{AttemptPhase, Failure};

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 考试作答模式");
    info!("🌐 考试网关: {}", config.gateway_base_url);
    info!("📄 答题卡: {}", config.answer_sheet_path);
    info!("{}", "=".repeat(60));
}

/// 打印成绩单
pub fn print_result(result: &ExamResult) {
    info!("\n{}", "=".repeat(60));
    info!("📊 作答 #{} 成绩", result.attempt_id);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("得分: {:.1} / 100", result.score);
    match (result.passed, result.pass_mark) {
        (Some(true), Some(mark)) => info!("✅ 及格（及格线 {}%）", mark),
        (Some(false), Some(mark)) => info!("❌ 不及格（及格线 {}%）", mark),
        (Some(true), None) => info!("✅ 及格"),
        (Some(false), None) => info!("❌ 不及格"),
        (None, _) => info!("及格线未知"),
    }
    info!(
        "答对 {}/{} 题，得 {} 分",
        result.correct_count(),
        result.breakdown.len(),
        result.points_earned()
    );
    for outcome in &result.breakdown {
        let mark = if outcome.is_correct { "✓" } else { "✗" };
        match &outcome.feedback {
            Some(feedback) => info!(
                "  {} 题目 {}: {} 分 - {}",
                mark,
                outcome.question_id,
                outcome.points_earned,
                truncate_text(feedback, 60)
            ),
            None => info!("  {} 题目 {}: {} 分", mark, outcome.question_id, outcome.points_earned),
        }
    }
    info!("{}", "=".repeat(60));
}

/// 打印失败提示
pub fn print_failure(failure: &Failure, recover_to: Option<AttemptPhase>) {
    warn!("\n{}", "─".repeat(60));
    warn!("⚠️ {}", failure.message);
    if let (true, Some(phase)) = (failure.is_retryable(), recover_to) {
        warn!("可以从 {} 状态重试", phase);
    }
    warn!("详情: {}", failure.detail);
    warn!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
