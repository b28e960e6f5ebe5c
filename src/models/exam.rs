use serde::{Deserialize, Serialize};
use std::fmt;

use super::list::deserialize_list;
use super::{first_of, AttemptSummary, ExamId, OptionId, QuestionId};

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// 单选题
    #[serde(alias = "mcq", alias = "multiple-choice", alias = "single_choice")]
    MultipleChoice,
    /// 判断题
    #[serde(alias = "tf", alias = "true-false", alias = "boolean")]
    TrueFalse,
    /// 简答题
    #[serde(alias = "short", alias = "short-answer", alias = "text")]
    ShortAnswer,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::ShortAnswer => "short_answer",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 题目选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AnswerOptionWire")]
pub struct AnswerOption {
    pub id: OptionId,
    pub text: String,
    /// 只有评分之后才有意义，提交前绝不作为判断依据
    #[serde(skip_serializing)]
    pub is_correct: Option<bool>,
}

/// 考试题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QuestionWire")]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub points: f64,
    pub options: Vec<AnswerOption>,
}

impl Question {
    /// 按编号查找选项
    pub fn option(&self, option_id: OptionId) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// 选项在题目中的位置（从 0 开始）
    pub fn option_position(&self, option_id: OptionId) -> Option<usize> {
        self.options.iter().position(|o| o.id == option_id)
    }
}

/// 考试
///
/// 加载后在整个作答过程中不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExamWire")]
pub struct Exam {
    pub id: ExamId,
    pub title: String,
    pub description: String,
    /// 时间限制（分钟）
    pub time_limit: Option<u32>,
    /// 及格线（百分比）
    pub pass_mark: f64,
    pub total_points: Option<f64>,
    pub questions: Vec<Question>,
    /// 网关返回的历史作答，用于"查看历史成绩"
    pub previous_attempts: Vec<AttemptSummary>,
}

impl Exam {
    /// 按编号查找题目
    pub fn question(&self, question_id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// 总分：网关未给出时按题目分值求和
    pub fn total_points(&self) -> f64 {
        self.total_points
            .unwrap_or_else(|| self.questions.iter().map(|q| q.points).sum())
    }

    /// 历史作答中是否存在该作答编号
    pub fn has_previous_attempt(&self, attempt_id: super::AttemptId) -> bool {
        self.previous_attempts.iter().any(|a| a.id == attempt_id)
    }
}

// ========== 网关原始形状 ==========
//
// 各后端对同一字段的命名不同，有时还会同时给出多个名字。
// 每个名字单独解码，再按优先级合并，避免重复字段导致整条响应解码失败。

#[derive(Deserialize)]
struct AnswerOptionWire {
    id: OptionId,
    text: Option<String>,
    answer_text: Option<String>,
    content: Option<String>,
    is_correct: Option<bool>,
    correct: Option<bool>,
}

impl TryFrom<AnswerOptionWire> for AnswerOption {
    type Error = String;

    fn try_from(wire: AnswerOptionWire) -> Result<Self, Self::Error> {
        let text = first_of([wire.text, wire.answer_text, wire.content])
            .ok_or_else(|| format!("选项 {} 缺少文字", wire.id))?;
        Ok(Self {
            id: wire.id,
            text,
            is_correct: first_of([wire.is_correct, wire.correct]),
        })
    }
}

#[derive(Deserialize)]
struct QuestionWire {
    id: QuestionId,
    text: Option<String>,
    question_text: Option<String>,
    prompt: Option<String>,
    #[serde(rename = "type")]
    kind: Option<QuestionType>,
    question_type: Option<QuestionType>,
    points: Option<f64>,
    marks: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_list")]
    options: Vec<AnswerOption>,
    #[serde(default, deserialize_with = "deserialize_list")]
    answers: Vec<AnswerOption>,
}

impl TryFrom<QuestionWire> for Question {
    type Error = String;

    fn try_from(wire: QuestionWire) -> Result<Self, Self::Error> {
        let text = first_of([wire.text, wire.question_text, wire.prompt])
            .ok_or_else(|| format!("题目 {} 缺少题干", wire.id))?;
        let question_type = first_of([wire.kind, wire.question_type])
            .ok_or_else(|| format!("题目 {} 缺少题型", wire.id))?;
        let options = if wire.options.is_empty() {
            wire.answers
        } else {
            wire.options
        };
        Ok(Self {
            id: wire.id,
            text,
            question_type,
            points: first_of([wire.points, wire.marks]).unwrap_or(1.0),
            options,
        })
    }
}

#[derive(Deserialize)]
struct ExamWire {
    id: ExamId,
    title: String,
    description: Option<String>,
    time_limit: Option<u32>,
    time_limit_minutes: Option<u32>,
    duration: Option<u32>,
    pass_mark: Option<f64>,
    pass_percentage: Option<f64>,
    passing_score: Option<f64>,
    total_points: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_list")]
    questions: Vec<Question>,
    #[serde(default, deserialize_with = "deserialize_list")]
    previous_attempts: Vec<AttemptSummary>,
    #[serde(default, deserialize_with = "deserialize_list")]
    attempts: Vec<AttemptSummary>,
}

impl TryFrom<ExamWire> for Exam {
    type Error = String;

    fn try_from(wire: ExamWire) -> Result<Self, Self::Error> {
        let pass_mark = first_of([wire.pass_mark, wire.pass_percentage, wire.passing_score])
            .ok_or_else(|| format!("考试 {} 缺少及格线", wire.id))?;
        let previous_attempts = if wire.previous_attempts.is_empty() {
            wire.attempts
        } else {
            wire.previous_attempts
        };
        Ok(Self {
            id: wire.id,
            title: wire.title,
            description: wire.description.unwrap_or_default(),
            time_limit: first_of([wire.time_limit, wire.time_limit_minutes, wire.duration]),
            pass_mark,
            total_points: wire.total_points,
            questions: wire.questions,
            previous_attempts,
        })
    }
}
