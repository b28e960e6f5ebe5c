//! 作答状态
//!
//! 用一个带数据的枚举表示整个作答过程，"加载中又已出成绩"这类非法组合无法表示。

use std::fmt;
use std::sync::Arc;

use crate::error::{ErrorKind, GatewayError};
use crate::models::{Attempt, AttemptId, Exam, ExamResult};
use crate::services::AnswerBuffer;

/// 状态标签（不带数据）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptPhase {
    Idle,
    Ready,
    InProgress,
    Submitting,
    Completed,
    Error,
}

impl fmt::Display for AttemptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttemptPhase::Idle => "idle",
            AttemptPhase::Ready => "ready",
            AttemptPhase::InProgress => "in_progress",
            AttemptPhase::Submitting => "submitting",
            AttemptPhase::Completed => "completed",
            AttemptPhase::Error => "error",
        };
        f.write_str(name)
    }
}

/// 网关失败后展示给用户的信息
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: ErrorKind,
    /// 面向用户的简短提示
    pub message: String,
    /// 原始错误（日志用）
    pub detail: String,
}

impl Failure {
    pub fn from_gateway(err: &GatewayError) -> Self {
        let kind = err.kind();
        Self {
            kind,
            message: kind.user_message().to_string(),
            detail: err.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// 作答状态
#[derive(Debug, Clone)]
pub enum AttemptState {
    /// 尚未加载考试
    Idle,
    /// 考试已加载，尚未开始作答
    Ready { exam: Arc<Exam> },
    /// 作答中，只有这个状态允许修改答案
    InProgress {
        exam: Arc<Exam>,
        attempt: Attempt,
        answers: AnswerBuffer,
    },
    /// 答案已发出，等待网关确认
    Submitting {
        exam: Arc<Exam>,
        attempt: Attempt,
        answers: AnswerBuffer,
    },
    /// 作答结束；查看历史成绩时可能没有加载考试
    Completed {
        exam: Option<Arc<Exam>>,
        attempt_id: AttemptId,
        result: Option<ExamResult>,
    },
    /// 网关调用失败，`recover_to` 是失败前所处的状态
    Error {
        failure: Failure,
        recover_to: Box<AttemptState>,
    },
}

impl AttemptState {
    /// 构建失败状态；`recover_to` 永远不会是另一个失败状态
    pub fn failed(failure: Failure, from: AttemptState) -> Self {
        let recover_to = match from {
            AttemptState::Error { recover_to, .. } => recover_to,
            other => Box::new(other),
        };
        AttemptState::Error {
            failure,
            recover_to,
        }
    }

    pub fn phase(&self) -> AttemptPhase {
        match self {
            AttemptState::Idle => AttemptPhase::Idle,
            AttemptState::Ready { .. } => AttemptPhase::Ready,
            AttemptState::InProgress { .. } => AttemptPhase::InProgress,
            AttemptState::Submitting { .. } => AttemptPhase::Submitting,
            AttemptState::Completed { .. } => AttemptPhase::Completed,
            AttemptState::Error { .. } => AttemptPhase::Error,
        }
    }

    /// 失败状态可恢复到的状态
    pub fn recover_phase(&self) -> Option<AttemptPhase> {
        match self {
            AttemptState::Error { recover_to, .. } => Some(recover_to.phase()),
            _ => None,
        }
    }

    pub fn exam(&self) -> Option<&Arc<Exam>> {
        match self {
            AttemptState::Idle => None,
            AttemptState::Ready { exam }
            | AttemptState::InProgress { exam, .. }
            | AttemptState::Submitting { exam, .. } => Some(exam),
            AttemptState::Completed { exam, .. } => exam.as_ref(),
            AttemptState::Error { recover_to, .. } => recover_to.exam(),
        }
    }

    pub fn attempt_id(&self) -> Option<AttemptId> {
        match self {
            AttemptState::InProgress { attempt, .. } | AttemptState::Submitting { attempt, .. } => {
                Some(attempt.id)
            }
            AttemptState::Completed { attempt_id, .. } => Some(*attempt_id),
            AttemptState::Error { recover_to, .. } => recover_to.attempt_id(),
            AttemptState::Idle | AttemptState::Ready { .. } => None,
        }
    }

    pub fn answers(&self) -> Option<&AnswerBuffer> {
        match self {
            AttemptState::InProgress { answers, .. } | AttemptState::Submitting { answers, .. } => {
                Some(answers)
            }
            AttemptState::Error { recover_to, .. } => recover_to.answers(),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&ExamResult> {
        match self {
            AttemptState::Completed { result, .. } => result.as_ref(),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            AttemptState::Error { failure, .. } => Some(failure),
            _ => None,
        }
    }
}
