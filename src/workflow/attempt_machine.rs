//! 作答状态机 - 流程层
//!
//! 核心职责：定义"一次作答"的完整流程
//!
//! 状态顺序：
//! 1. idle → load_exam → ready
//! 2. ready → start → in_progress
//! 3. in_progress → record_answer（只改缓冲区，不调用网关）
//! 4. in_progress → submit → submitting → completed
//! 5. completed → view_result
//!
//! 网关失败一律转为 `error` 状态，调用方观察状态而不是处理异常；
//! 只有绕过状态守卫的调用（契约错误）才会以 `Err` 返回。

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::clients::ExamGateway;
use crate::error::{AttemptError, GatewayError};
use crate::models::{AnswerValue, Attempt, AttemptId, Exam, ExamId, ExamResult, QuestionId};
use crate::services::{build_submission, validate_answer, AnswerBuffer};
use crate::workflow::attempt_ctx::AttemptCtx;
use crate::workflow::attempt_state::{AttemptPhase, AttemptState, Failure};

/// 作答状态机
///
/// - 所有操作都需要 `&mut self`，同一台状态机上不可能有两个操作同时进行
/// - 当前状态通过 watch 通道发布，界面可以在网关调用期间观察到 `submitting`
/// - 网关调用只尝试一次，不做自动重试；重试由用户从 `error` 状态重新发起
pub struct AttemptMachine {
    exam_id: ExamId,
    gateway: Arc<dyn ExamGateway>,
    state: watch::Sender<AttemptState>,
}

impl AttemptMachine {
    /// 创建新的作答状态机
    pub fn new(exam_id: ExamId, gateway: Arc<dyn ExamGateway>) -> Self {
        let (state, _) = watch::channel(AttemptState::Idle);
        Self {
            exam_id,
            gateway,
            state,
        }
    }

    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<AttemptState> {
        self.state.subscribe()
    }

    /// 当前状态快照
    pub fn state(&self) -> AttemptState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> AttemptPhase {
        self.state.borrow().phase()
    }

    pub fn exam(&self) -> Option<Arc<Exam>> {
        self.state.borrow().exam().cloned()
    }

    pub fn answers(&self) -> Option<AnswerBuffer> {
        self.state.borrow().answers().cloned()
    }

    pub fn result(&self) -> Option<ExamResult> {
        self.state.borrow().result().cloned()
    }

    pub fn failure(&self) -> Option<Failure> {
        self.state.borrow().failure().cloned()
    }

    /// 剩余作答时间（无时间限制或不在作答中时为 None）
    pub fn remaining_time(&self) -> Option<chrono::Duration> {
        match &*self.state.borrow() {
            AttemptState::InProgress { exam, attempt, .. }
            | AttemptState::Submitting { exam, attempt, .. } => {
                attempt.remaining(exam.time_limit, Utc::now())
            }
            _ => None,
        }
    }

    // ========== 操作 ==========

    /// LoadExam：加载考试信息与题目
    ///
    /// 允许在 idle 或 ready（重新加载）时调用；失败后恢复到 idle。
    pub async fn load_exam(&mut self) -> Result<AttemptPhase, AttemptError> {
        self.enter("load_exam", &[AttemptPhase::Idle, AttemptPhase::Ready])?;
        let ctx = AttemptCtx::new(self.exam_id);

        info!("{} 📥 正在加载考试...", ctx);
        match self.gateway.get_exam(self.exam_id).await {
            Ok(exam) => {
                info!(
                    "{} ✓ 考试加载完成: {}（{} 题，总分 {}，及格线 {}%，历史作答 {} 次）",
                    ctx,
                    crate::utils::logging::truncate_text(&exam.title, 40),
                    exam.question_count(),
                    exam.total_points(),
                    exam.pass_mark,
                    exam.previous_attempts.len()
                );
                Ok(self.transition(AttemptState::Ready {
                    exam: Arc::new(exam),
                }))
            }
            Err(err) => Ok(self.fail("load_exam", err, AttemptState::Idle)),
        }
    }

    /// Start：在网关开始一次新的作答
    pub async fn start(&mut self) -> Result<AttemptPhase, AttemptError> {
        let exam = match self.enter("start", &[AttemptPhase::Ready])? {
            AttemptState::Ready { exam } => exam,
            other => return Err(self.reject("start", other.phase())),
        };
        let ctx = AttemptCtx::new(exam.id);

        info!("{} ▶️ 正在开始作答...", ctx);
        match self.gateway.start_attempt(exam.id).await {
            Ok(started) => {
                let attempt = Attempt::new(
                    started.id,
                    exam.id,
                    started.started_at.unwrap_or_else(Utc::now),
                );
                info!(
                    "{} ✓ 作答已开始，时间限制: {}",
                    ctx.with_attempt(Some(attempt.id)),
                    exam.time_limit
                        .map(|m| format!("{} 分钟", m))
                        .unwrap_or_else(|| "无".to_string())
                );
                Ok(self.transition(AttemptState::InProgress {
                    exam,
                    attempt,
                    answers: AnswerBuffer::new(),
                }))
            }
            Err(err) => Ok(self.fail("start", err, AttemptState::Ready { exam })),
        }
    }

    /// RecordAnswer：写入答案缓冲区
    ///
    /// 纯本地操作：不调用网关，不改变状态。同一道题再次作答覆盖旧值。
    pub fn record_answer(
        &mut self,
        question_id: QuestionId,
        value: AnswerValue,
    ) -> Result<(), AttemptError> {
        {
            let state = self.state.borrow();
            match &*state {
                AttemptState::InProgress { exam, attempt, .. } => {
                    if let Err(err) = validate_answer(exam, question_id, &value) {
                        error!(
                            "{} ❌ 答案被拒绝: {}",
                            AttemptCtx::new(exam.id).with_attempt(Some(attempt.id)),
                            err
                        );
                        return Err(err);
                    }
                }
                other => return Err(self.reject("record_answer", other.phase())),
            }
        }

        debug!("[考试 #{}] 记录答案: 题目 {} → {:?}", self.exam_id, question_id, value);
        self.state.send_modify(|state| {
            if let AttemptState::InProgress { answers, .. } = state {
                answers.record(question_id, value);
            }
        });
        Ok(())
    }

    /// Submit：提交全部答案并结束作答
    ///
    /// 先进入 submitting，再依次调用 Submit-Answers 与 Finish-Attempt。
    /// 任何一步失败都回到 error（可恢复到 in_progress），缓冲区保持原样；
    /// Submit-Answers 失败时绝不调用 Finish-Attempt。
    pub async fn submit(&mut self) -> Result<AttemptPhase, AttemptError> {
        let (exam, attempt, answers) = match self.enter("submit", &[AttemptPhase::InProgress])? {
            AttemptState::InProgress {
                exam,
                attempt,
                answers,
            } => (exam, attempt, answers),
            other => return Err(self.reject("submit", other.phase())),
        };
        let ctx = AttemptCtx::new(exam.id).with_attempt(Some(attempt.id));

        self.transition(AttemptState::Submitting {
            exam: exam.clone(),
            attempt: attempt.clone(),
            answers: answers.clone(),
        });

        let in_progress = || AttemptState::InProgress {
            exam: exam.clone(),
            attempt: attempt.clone(),
            answers: answers.clone(),
        };

        let records = match build_submission(&exam, &answers) {
            Ok(records) => records,
            Err(err) => {
                error!("{} ❌ 无法生成提交记录: {}", ctx, err);
                self.transition(in_progress());
                return Err(err);
            }
        };

        let unanswered = records.iter().filter(|r| !r.is_answered()).count();
        info!(
            "{} 📤 正在提交 {} 条答案（未作答 {} 题）...",
            ctx,
            records.len(),
            unanswered
        );

        if let Err(err) = self.gateway.submit_answers(attempt.id, &records).await {
            return Ok(self.fail("submit_answers", err, in_progress()));
        }
        debug!("{} 答案已送达，正在结束作答", ctx);

        if let Err(err) = self.gateway.finish_attempt(attempt.id).await {
            return Ok(self.fail("finish_attempt", err, in_progress()));
        }

        info!("{} ✓ 作答已提交", ctx);
        Ok(self.transition(AttemptState::Completed {
            exam: Some(exam.clone()),
            attempt_id: attempt.id,
            result: None,
        }))
    }

    /// ViewResult：获取评分结果
    pub async fn view_result(&mut self) -> Result<AttemptPhase, AttemptError> {
        let (exam, attempt_id) = match self.enter("view_result", &[AttemptPhase::Completed])? {
            AttemptState::Completed {
                exam, attempt_id, ..
            } => (exam, attempt_id),
            other => return Err(self.reject("view_result", other.phase())),
        };
        Ok(self.fetch_result(exam, attempt_id).await)
    }

    /// 直接查看历史作答的成绩，不经过 in_progress
    ///
    /// 允许在 idle 或 ready 时调用；作答编号通常来自考试的历史作答列表。
    pub async fn view_previous_result(
        &mut self,
        attempt_id: AttemptId,
    ) -> Result<AttemptPhase, AttemptError> {
        let current = self.enter(
            "view_previous_result",
            &[AttemptPhase::Idle, AttemptPhase::Ready],
        )?;
        let exam = current.exam().cloned();

        if let Some(exam) = &exam {
            if !exam.has_previous_attempt(attempt_id) {
                warn!(
                    "{} ⚠️ 作答 #{} 不在历史作答列表中，仍尝试获取成绩",
                    AttemptCtx::new(exam.id),
                    attempt_id
                );
            }
        }

        self.transition(AttemptState::Completed {
            exam: exam.clone(),
            attempt_id,
            result: None,
        });
        Ok(self.fetch_result(exam, attempt_id).await)
    }

    /// 从 error 回到失败前的状态（例如回去修改答案）
    pub fn recover(&mut self) -> Result<AttemptPhase, AttemptError> {
        let recover_to = match self.state() {
            AttemptState::Error { recover_to, .. } => *recover_to,
            other => return Err(self.reject("recover", other.phase())),
        };
        Ok(self.transition(recover_to))
    }

    /// 放弃当前流程，回到 idle
    ///
    /// 返回被放弃的作答编号。若放弃时处于 submitting（提交调用被中途丢弃），
    /// 服务端的作答状态未知；下次加载考试时会出现在历史作答中。
    pub fn abandon(&mut self) -> Option<AttemptId> {
        let state = self.state();
        let orphaned = match &state {
            AttemptState::Completed { .. } => None,
            other => other.attempt_id(),
        };

        if state.phase() == AttemptPhase::Submitting {
            warn!(
                "{} ⚠️ 提交过程中放弃作答，服务端状态未知",
                AttemptCtx::new(self.exam_id).with_attempt(orphaned)
            );
        } else if let Some(attempt_id) = orphaned {
            warn!(
                "{} ⚠️ 放弃未完成的作答",
                AttemptCtx::new(self.exam_id).with_attempt(Some(attempt_id))
            );
        }

        self.transition(AttemptState::Idle);
        orphaned
    }

    // ========== 内部辅助 ==========

    /// 状态守卫：当前状态（或 error 的恢复目标）必须在允许列表中
    fn enter(
        &self,
        operation: &'static str,
        allowed: &[AttemptPhase],
    ) -> Result<AttemptState, AttemptError> {
        let current = self.state();
        if allowed.contains(&current.phase()) {
            return Ok(current);
        }
        match current {
            AttemptState::Error {
                failure,
                recover_to,
            } if allowed.contains(&recover_to.phase()) => {
                info!(
                    "{} 🔁 从 error 重试 {}（上次失败: {}）",
                    AttemptCtx::new(self.exam_id).with_attempt(recover_to.attempt_id()),
                    operation,
                    failure.detail
                );
                Ok(*recover_to)
            }
            other => Err(self.reject(operation, other.phase())),
        }
    }

    fn reject(&self, operation: &'static str, phase: AttemptPhase) -> AttemptError {
        error!(
            "[考试 #{}] ❌ 非法操作: 状态 {} 下调用 {}",
            self.exam_id, phase, operation
        );
        AttemptError::InvalidTransition { operation, phase }
    }

    fn transition(&self, next: AttemptState) -> AttemptPhase {
        let phase = next.phase();
        let previous = self.state.send_replace(next).phase();
        if previous != phase {
            info!("[考试 #{}] 状态变更: {} → {}", self.exam_id, previous, phase);
        }
        phase
    }

    fn fail(
        &self,
        operation: &'static str,
        err: GatewayError,
        recover_to: AttemptState,
    ) -> AttemptPhase {
        let failure = Failure::from_gateway(&err);
        warn!(
            "{} ⚠️ {} 失败 ({:?}): {}",
            AttemptCtx::new(self.exam_id).with_attempt(recover_to.attempt_id()),
            operation,
            failure.kind,
            err
        );
        self.transition(AttemptState::failed(failure, recover_to))
    }

    /// 并发获取成绩与正确答案并合并
    ///
    /// 成绩必须成功；正确答案可能被后端隐藏，失败时只记录警告。
    async fn fetch_result(&self, exam: Option<Arc<Exam>>, attempt_id: AttemptId) -> AttemptPhase {
        let ctx = AttemptCtx::new(self.exam_id).with_attempt(Some(attempt_id));
        info!("{} 📊 正在获取成绩...", ctx);

        let (fetched, disclosed) = futures::join!(
            self.gateway.get_result(attempt_id),
            self.gateway.get_result_answers(attempt_id)
        );

        let disclosures = disclosed.unwrap_or_else(|err| {
            warn!("{} ⚠️ 无法获取正确答案，仅显示成绩: {}", ctx, err);
            Vec::new()
        });

        match fetched {
            Ok(payload) => {
                let result = ExamResult::grade(
                    attempt_id,
                    payload,
                    disclosures,
                    exam.as_ref().map(|e| e.pass_mark),
                );
                info!(
                    "{} ✓ 成绩: {:.1} 分，{}",
                    ctx,
                    result.score,
                    match result.passed {
                        Some(true) => "及格",
                        Some(false) => "不及格",
                        None => "及格线未知",
                    }
                );
                self.transition(AttemptState::Completed {
                    exam,
                    attempt_id,
                    result: Some(result),
                })
            }
            Err(err) => self.fail(
                "view_result",
                err,
                AttemptState::Completed {
                    exam,
                    attempt_id,
                    result: None,
                },
            ),
        }
    }
}
