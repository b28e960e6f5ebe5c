use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{ExamGateway, HttpExamGateway};
use crate::config::Config;
use crate::models::{load_answer_sheet, AnswerSheet};
use crate::utils::logging::{log_startup, print_failure, print_result};
use crate::workflow::{AttemptMachine, AttemptPhase};

/// 应用主结构
pub struct App {
    config: Config,
    gateway: Arc<dyn ExamGateway>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let gateway = HttpExamGateway::new(&config).context("无法创建考试网关客户端")?;

        Ok(Self {
            config,
            gateway: Arc::new(gateway),
        })
    }

    /// 运行应用主逻辑：按答题卡完成一次作答，或查看历史成绩
    pub async fn run(&self) -> Result<()> {
        let sheet = load_answer_sheet(Path::new(&self.config.answer_sheet_path))
            .await
            .with_context(|| format!("无法加载答题卡: {}", self.config.answer_sheet_path))?;

        let mut machine = AttemptMachine::new(sheet.exam_id, self.gateway.clone());

        if machine.load_exam().await? != AttemptPhase::Ready {
            return report_failure(&machine);
        }

        if let Some(attempt_id) = sheet.review_attempt {
            info!("📖 查看历史作答 #{}", attempt_id);
            machine.view_previous_result(attempt_id).await?;
            return finish(&machine);
        }

        take_exam(&mut machine, &sheet).await?;
        finish(&machine)
    }
}

/// 开始作答、填写答题卡、提交并获取成绩
async fn take_exam(machine: &mut AttemptMachine, sheet: &AnswerSheet) -> Result<()> {
    if machine.start().await? != AttemptPhase::InProgress {
        return Ok(());
    }

    for (question_id, value) in sheet.entries() {
        if let Err(err) = machine.record_answer(question_id, value) {
            warn!(
                "⚠️ 跳过答题卡中的题目 {}: {}（{}）",
                question_id,
                err,
                err.kind().user_message()
            );
        }
    }

    if let Some(remaining) = machine.remaining_time() {
        info!("⏱️ 剩余时间: {} 秒", remaining.num_seconds());
    }

    if machine.submit().await? == AttemptPhase::Completed {
        machine.view_result().await?;
    }
    Ok(())
}

/// 输出最终状态
fn finish(machine: &AttemptMachine) -> Result<()> {
    match machine.result() {
        Some(result) => {
            print_result(&result);
            Ok(())
        }
        None => report_failure(machine),
    }
}

fn report_failure(machine: &AttemptMachine) -> Result<()> {
    let state = machine.state();
    match state.failure() {
        Some(failure) => {
            print_failure(failure, state.recover_phase());
            anyhow::bail!("{}", failure.message)
        }
        None => anyhow::bail!("作答流程停在 {} 状态", state.phase()),
    }
}
