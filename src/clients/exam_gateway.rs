//! 考试网关接口
//!
//! 状态机只通过这个 trait 访问后端；生产环境使用 `HttpExamGateway`，测试中换成内存实现。

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::models::{
    AnswerDisclosure, AttemptId, Exam, ExamId, ResultPayload, StartedAttempt, SubmissionRecord,
};

#[async_trait]
pub trait ExamGateway: Send + Sync {
    /// Get-Exam：考试信息与题目（不含正确答案）
    async fn get_exam(&self, exam_id: ExamId) -> GatewayResult<Exam>;

    /// Start-Attempt：可能失败为 `AttemptsExhausted` / `AlreadySubmitted`
    async fn start_attempt(&self, exam_id: ExamId) -> GatewayResult<StartedAttempt>;

    /// Submit-Answers：必须先于 Finish-Attempt
    async fn submit_answers(
        &self,
        attempt_id: AttemptId,
        records: &[SubmissionRecord],
    ) -> GatewayResult<()>;

    /// Finish-Attempt
    async fn finish_attempt(&self, attempt_id: AttemptId) -> GatewayResult<()>;

    /// Get-Result：分数与逐题评分
    async fn get_result(&self, attempt_id: AttemptId) -> GatewayResult<ResultPayload>;

    /// Get-Result-Answers：逐题正确答案公开
    async fn get_result_answers(&self, attempt_id: AttemptId)
        -> GatewayResult<Vec<AnswerDisclosure>>;
}
