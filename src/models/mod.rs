pub mod attempt;
pub mod exam;
pub mod list;
pub mod loaders;
pub mod result;
pub mod submission;

pub use attempt::{Attempt, AttemptSummary, StartedAttempt};
pub use exam::{AnswerOption, Exam, Question, QuestionType};
pub use loaders::{load_answer_sheet, AnswerSheet, SheetAnswer};
pub use result::{AnswerDisclosure, ExamResult, QuestionOutcome, ResultPayload};
pub use submission::{AnswerValue, SelectedAnswer, SubmissionRecord, TrueFalse};

/// 考试编号
pub type ExamId = i64;
/// 题目编号
pub type QuestionId = i64;
/// 选项编号
pub type OptionId = i64;
/// 作答编号（由网关在开始作答时分配）
pub type AttemptId = i64;

/// 同一字段在不同后端里可能用不同的键名，也可能同时出现；按优先级取第一个有值的
pub(crate) fn first_of<T, const N: usize>(candidates: [Option<T>; N]) -> Option<T> {
    candidates.into_iter().flatten().next()
}
