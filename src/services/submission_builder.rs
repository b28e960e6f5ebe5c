//! 提交记录构建
//!
//! 按考试题目顺序，每道题恰好生成一条提交记录；未作答的题目两个字段都为 null。

use crate::error::AttemptError;
use crate::models::{
    AnswerValue, Exam, Question, QuestionId, QuestionType, SelectedAnswer, SubmissionRecord,
};
use crate::services::answer_buffer::AnswerBuffer;
use crate::services::true_false::canonical_token;

/// 校验答案是否能写入该考试的缓冲区
pub fn validate_answer(
    exam: &Exam,
    question_id: QuestionId,
    value: &AnswerValue,
) -> Result<(), AttemptError> {
    let question = exam
        .question(question_id)
        .ok_or(AttemptError::UnknownQuestion { question_id })?;
    to_record(question, value).map(|_| ())
}

/// 单道题的答案转换为提交记录
fn to_record(question: &Question, value: &AnswerValue) -> Result<SubmissionRecord, AttemptError> {
    let mismatch = || AttemptError::AnswerTypeMismatch {
        question_id: question.id,
        expected: question.question_type,
    };

    match (question.question_type, value) {
        (QuestionType::MultipleChoice, AnswerValue::Selected(option_id)) => {
            if question.option(*option_id).is_none() {
                return Err(AttemptError::UnknownOption {
                    question_id: question.id,
                    option_id: *option_id,
                });
            }
            Ok(SubmissionRecord::selected(
                question.id,
                SelectedAnswer::Option(*option_id),
            ))
        }
        (QuestionType::TrueFalse, AnswerValue::Selected(option_id)) => {
            if question.option(*option_id).is_none() {
                return Err(AttemptError::UnknownOption {
                    question_id: question.id,
                    option_id: *option_id,
                });
            }
            let token = canonical_token(question, *option_id).ok_or_else(mismatch)?;
            Ok(SubmissionRecord::selected(
                question.id,
                SelectedAnswer::Token(token),
            ))
        }
        (QuestionType::ShortAnswer, AnswerValue::Text(text)) => {
            if text.trim().is_empty() {
                Ok(SubmissionRecord::unanswered(question.id))
            } else {
                Ok(SubmissionRecord::text(question.id, text.clone()))
            }
        }
        _ => Err(mismatch()),
    }
}

/// 根据缓冲区生成完整的提交记录序列
///
/// 返回的序列长度恒等于考试题目数。
pub fn build_submission(
    exam: &Exam,
    buffer: &AnswerBuffer,
) -> Result<Vec<SubmissionRecord>, AttemptError> {
    for (question_id, _) in buffer.iter() {
        if exam.question(question_id).is_none() {
            return Err(AttemptError::UnknownQuestion { question_id });
        }
    }

    exam.questions
        .iter()
        .map(|question| match buffer.get(question.id) {
            Some(value) => to_record(question, value),
            None => Ok(SubmissionRecord::unanswered(question.id)),
        })
        .collect()
}
