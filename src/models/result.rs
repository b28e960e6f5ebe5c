use serde::{Deserialize, Serialize};
use tracing::warn;

use super::list::deserialize_list;
use super::{first_of, AttemptId, OptionId, QuestionId, SelectedAnswer};

/// Get-Result 的响应
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "ResultPayloadWire")]
pub struct ResultPayload {
    /// 0-100
    pub score: f64,
    pub passed: Option<bool>,
    pub pass_mark: Option<f64>,
    pub breakdown: Vec<QuestionOutcome>,
}

/// Get-Result-Answers 中单题的正确答案公开信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AnswerDisclosureWire")]
pub struct AnswerDisclosure {
    pub question_id: QuestionId,
    pub correct_option_id: Option<OptionId>,
    pub correct_text: Option<String>,
    pub explanation: Option<String>,
}

/// 单题评分结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "QuestionOutcomeWire")]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub selected_answer: Option<SelectedAnswer>,
    pub text_answer: Option<String>,
    pub is_correct: bool,
    pub points_earned: f64,
    pub feedback: Option<String>,
    pub disclosure: Option<AnswerDisclosure>,
}

impl QuestionOutcome {
    /// 成绩明细里没有、只出现在正确答案公开信息中的题目
    fn disclosed_only(disclosure: AnswerDisclosure) -> Self {
        Self {
            question_id: disclosure.question_id,
            selected_answer: None,
            text_answer: None,
            is_correct: false,
            points_earned: 0.0,
            feedback: None,
            disclosure: Some(disclosure),
        }
    }
}

/// 评分结果（只读）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExamResult {
    pub attempt_id: AttemptId,
    /// 0-100
    pub score: f64,
    /// 无法判断及格线时为 None
    pub passed: Option<bool>,
    pub pass_mark: Option<f64>,
    pub breakdown: Vec<QuestionOutcome>,
}

impl ExamResult {
    /// 组装评分结果
    ///
    /// 及格判断优先使用已加载考试的及格线，其次是网关给出的及格线，最后才是网关的结论。
    pub fn grade(
        attempt_id: AttemptId,
        payload: ResultPayload,
        disclosures: Vec<AnswerDisclosure>,
        exam_pass_mark: Option<f64>,
    ) -> Self {
        let score = clamp_score(attempt_id, payload.score);
        let pass_mark = exam_pass_mark.or(payload.pass_mark);
        let passed = match pass_mark {
            Some(mark) => Some(score >= mark),
            None => payload.passed,
        };

        let mut breakdown = payload.breakdown;
        for disclosure in disclosures {
            match breakdown
                .iter_mut()
                .find(|o| o.question_id == disclosure.question_id)
            {
                Some(outcome) => outcome.disclosure = Some(disclosure),
                None => breakdown.push(QuestionOutcome::disclosed_only(disclosure)),
            }
        }

        Self {
            attempt_id,
            score,
            passed,
            pass_mark,
            breakdown,
        }
    }

    pub fn points_earned(&self) -> f64 {
        self.breakdown.iter().map(|o| o.points_earned).sum()
    }

    pub fn correct_count(&self) -> usize {
        self.breakdown.iter().filter(|o| o.is_correct).count()
    }
}

fn clamp_score(attempt_id: AttemptId, score: f64) -> f64 {
    if !(0.0..=100.0).contains(&score) {
        warn!(
            "[作答 #{}] ⚠️ 网关返回的分数 {} 超出 0-100，已截断",
            attempt_id, score
        );
    }
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

// ========== 网关原始形状 ==========

#[derive(Deserialize)]
struct ResultPayloadWire {
    percentage: Option<f64>,
    score: Option<f64>,
    max_score: Option<f64>,
    total_points: Option<f64>,
    passed: Option<bool>,
    is_passed: Option<bool>,
    pass_mark: Option<f64>,
    passing_score: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_list")]
    breakdown: Vec<QuestionOutcome>,
    #[serde(default, deserialize_with = "deserialize_list")]
    answers: Vec<QuestionOutcome>,
    #[serde(default, deserialize_with = "deserialize_list")]
    details: Vec<QuestionOutcome>,
}

impl TryFrom<ResultPayloadWire> for ResultPayload {
    type Error = &'static str;

    /// `percentage` 本身就是 0-100；只有原始得分时，有满分则换算，否则视为百分制
    fn try_from(wire: ResultPayloadWire) -> Result<Self, Self::Error> {
        let max_score = first_of([wire.max_score, wire.total_points]).filter(|m| *m > 0.0);
        let score = match (wire.percentage, wire.score, max_score) {
            (Some(percentage), _, _) => percentage,
            (None, Some(raw), Some(max)) => raw * 100.0 / max,
            (None, Some(raw), None) => raw,
            (None, None, _) => return Err("成绩响应缺少 score / percentage"),
        };

        let breakdown = [wire.breakdown, wire.answers, wire.details]
            .into_iter()
            .find(|list| !list.is_empty())
            .unwrap_or_default();

        Ok(Self {
            score,
            passed: first_of([wire.passed, wire.is_passed]),
            pass_mark: first_of([wire.pass_mark, wire.passing_score]),
            breakdown,
        })
    }
}

#[derive(Deserialize)]
struct AnswerDisclosureWire {
    question_id: QuestionId,
    correct_option_id: Option<OptionId>,
    correct_answer_id: Option<OptionId>,
    correct_text: Option<String>,
    correct_answer_text: Option<String>,
    explanation: Option<String>,
}

impl From<AnswerDisclosureWire> for AnswerDisclosure {
    fn from(wire: AnswerDisclosureWire) -> Self {
        Self {
            question_id: wire.question_id,
            correct_option_id: first_of([wire.correct_option_id, wire.correct_answer_id]),
            correct_text: first_of([wire.correct_text, wire.correct_answer_text]),
            explanation: wire.explanation,
        }
    }
}

#[derive(Deserialize)]
struct QuestionOutcomeWire {
    question_id: QuestionId,
    selected_answer: Option<SelectedAnswer>,
    text_answer: Option<String>,
    is_correct: Option<bool>,
    correct: Option<bool>,
    points_earned: Option<f64>,
    points: Option<f64>,
    feedback: Option<String>,
    disclosure: Option<AnswerDisclosure>,
}

impl From<QuestionOutcomeWire> for QuestionOutcome {
    fn from(wire: QuestionOutcomeWire) -> Self {
        Self {
            question_id: wire.question_id,
            selected_answer: wire.selected_answer,
            text_answer: wire.text_answer,
            is_correct: first_of([wire.is_correct, wire.correct]).unwrap_or(false),
            points_earned: first_of([wire.points_earned, wire.points]).unwrap_or(0.0),
            feedback: wire.feedback,
            disclosure: wire.disclosure,
        }
    }
}
