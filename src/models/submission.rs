use serde::{Deserialize, Serialize};
use std::fmt;

use super::{OptionId, QuestionId};

/// 判断题的标准答案记号
///
/// 网关只认 `"true"` / `"false"`，永远不接收本地化的选项文字。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrueFalse {
    True,
    False,
}

impl TrueFalse {
    pub fn as_token(self) -> &'static str {
        match self {
            TrueFalse::True => "true",
            TrueFalse::False => "false",
        }
    }
}

impl fmt::Display for TrueFalse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// 答题缓冲区中暂存的答案
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnswerValue {
    /// 选择了某个选项（单选题、判断题）
    Selected(OptionId),
    /// 填写的文字（简答题）
    Text(String),
}

/// 提交记录中的选择答案
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectedAnswer {
    /// 单选题：选项编号
    Option(OptionId),
    /// 判断题：标准记号
    Token(TrueFalse),
}

/// 单道题的提交记录
///
/// 两个字段最多只有一个有值；未作答时两个都显式为 null，不会被省略。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRecord {
    question_id: QuestionId,
    selected_answer: Option<SelectedAnswer>,
    text_answer: Option<String>,
}

impl SubmissionRecord {
    pub fn selected(question_id: QuestionId, answer: SelectedAnswer) -> Self {
        Self {
            question_id,
            selected_answer: Some(answer),
            text_answer: None,
        }
    }

    pub fn text(question_id: QuestionId, text: impl Into<String>) -> Self {
        Self {
            question_id,
            selected_answer: None,
            text_answer: Some(text.into()),
        }
    }

    pub fn unanswered(question_id: QuestionId) -> Self {
        Self {
            question_id,
            selected_answer: None,
            text_answer: None,
        }
    }

    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    pub fn selected_answer(&self) -> Option<SelectedAnswer> {
        self.selected_answer
    }

    pub fn text_answer(&self) -> Option<&str> {
        self.text_answer.as_deref()
    }

    pub fn is_answered(&self) -> bool {
        self.selected_answer.is_some() || self.text_answer.is_some()
    }
}
