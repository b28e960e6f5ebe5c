//! 答题缓冲区
//!
//! 题目编号到暂存答案的有序映射，按首次作答的顺序保存。
//! 只在 `in_progress` 状态下由状态机修改，提交时整体生成提交记录。

use crate::models::{AnswerValue, QuestionId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerBuffer {
    entries: Vec<(QuestionId, AnswerValue)>,
}

impl AnswerBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入答案，同一道题再次作答会覆盖之前的值
    ///
    /// 返回被覆盖的旧答案。
    pub fn record(&mut self, question_id: QuestionId, value: AnswerValue) -> Option<AnswerValue> {
        match self.entries.iter_mut().find(|(id, _)| *id == question_id) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((question_id, value));
                None
            }
        }
    }

    pub fn get(&self, question_id: QuestionId) -> Option<&AnswerValue> {
        self.entries
            .iter()
            .find(|(id, _)| *id == question_id)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, &AnswerValue)> {
        self.entries.iter().map(|(id, value)| (*id, value))
    }
}
