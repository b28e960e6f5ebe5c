//! 作答上下文
//!
//! 封装"我正在作答哪场考试的哪一次作答"这一信息，只用于日志

use std::fmt::Display;

use crate::models::{AttemptId, ExamId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptCtx {
    pub exam_id: ExamId,
    pub attempt_id: Option<AttemptId>,
}

impl AttemptCtx {
    pub fn new(exam_id: ExamId) -> Self {
        Self {
            exam_id,
            attempt_id: None,
        }
    }

    pub fn with_attempt(self, attempt_id: Option<AttemptId>) -> Self {
        Self { attempt_id, ..self }
    }
}

impl Display for AttemptCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.attempt_id {
            Some(attempt_id) => write!(f, "[考试 #{} 作答 #{}]", self.exam_id, attempt_id),
            None => write!(f, "[考试 #{}]", self.exam_id),
        }
    }
}
