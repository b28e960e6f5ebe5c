use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};

use exam_attempt_client::error::{AttemptError, ErrorKind, GatewayError, GatewayResult};
use exam_attempt_client::models::{
    AnswerDisclosure, AnswerOption, AnswerValue, AttemptId, AttemptSummary, Exam, ExamId,
    Question, QuestionType, ResultPayload, SelectedAnswer, StartedAttempt, SubmissionRecord,
    TrueFalse,
};
use exam_attempt_client::{AttemptMachine, AttemptPhase, ExamGateway};

const ATTEMPT_ID: AttemptId = 501;

#[derive(Debug, Clone, Copy)]
enum StartFailure {
    Exhausted,
    AlreadySubmitted,
}

#[derive(Debug, Default, Clone)]
struct Calls {
    get_exam: usize,
    start: usize,
    submit: usize,
    finish: usize,
    result: usize,
    result_answers: usize,
}

impl Calls {
    fn total(&self) -> usize {
        self.get_exam + self.start + self.submit + self.finish + self.result + self.result_answers
    }
}

#[derive(Default)]
struct Script {
    fail_get_exam: bool,
    fail_start: Option<StartFailure>,
    fail_submit: bool,
    fail_finish: bool,
    fail_result: bool,
    hide_result_answers: bool,
}

/// 内存中的考试网关：记录调用次数，按脚本注入失败
struct FakeGateway {
    exam: Exam,
    calls: Mutex<Calls>,
    script: Mutex<Script>,
    submitted: Mutex<Vec<Vec<SubmissionRecord>>>,
    submit_gate: Option<Arc<Notify>>,
}

impl FakeGateway {
    fn new(exam: Exam) -> Self {
        Self {
            exam,
            calls: Mutex::new(Calls::default()),
            script: Mutex::new(Script::default()),
            submitted: Mutex::new(Vec::new()),
            submit_gate: None,
        }
    }

    fn with_submit_gate(mut self, gate: Arc<Notify>) -> Self {
        self.submit_gate = Some(gate);
        self
    }

    fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    fn submitted(&self) -> Vec<Vec<SubmissionRecord>> {
        self.submitted.lock().unwrap().clone()
    }

    fn network_error(endpoint: &str) -> GatewayError {
        GatewayError::transport(
            endpoint,
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
        )
    }
}

#[async_trait]
impl ExamGateway for FakeGateway {
    async fn get_exam(&self, exam_id: ExamId) -> GatewayResult<Exam> {
        self.calls.lock().unwrap().get_exam += 1;
        if self.script().fail_get_exam {
            return Err(Self::network_error("exams/"));
        }
        assert_eq!(exam_id, self.exam.id);
        Ok(self.exam.clone())
    }

    async fn start_attempt(&self, _exam_id: ExamId) -> GatewayResult<StartedAttempt> {
        self.calls.lock().unwrap().start += 1;
        match self.script().fail_start {
            Some(StartFailure::Exhausted) => Err(GatewayError::AttemptsExhausted {
                message: "You have reached the maximum number of attempts".into(),
            }),
            Some(StartFailure::AlreadySubmitted) => Err(GatewayError::AlreadySubmitted {
                message: "already submitted".into(),
            }),
            None => Ok(serde_json::from_value(json!({ "attempt_id": ATTEMPT_ID })).unwrap()),
        }
    }

    async fn submit_answers(
        &self,
        attempt_id: AttemptId,
        records: &[SubmissionRecord],
    ) -> GatewayResult<()> {
        self.calls.lock().unwrap().submit += 1;
        assert_eq!(attempt_id, ATTEMPT_ID);
        if let Some(gate) = &self.submit_gate {
            gate.notified().await;
        }
        if self.script().fail_submit {
            return Err(Self::network_error("attempts/answers/"));
        }
        self.submitted.lock().unwrap().push(records.to_vec());
        Ok(())
    }

    async fn finish_attempt(&self, _attempt_id: AttemptId) -> GatewayResult<()> {
        self.calls.lock().unwrap().finish += 1;
        if self.script().fail_finish {
            return Err(Self::network_error("attempts/finish/"));
        }
        Ok(())
    }

    async fn get_result(&self, _attempt_id: AttemptId) -> GatewayResult<ResultPayload> {
        self.calls.lock().unwrap().result += 1;
        if self.script().fail_result {
            return Err(Self::network_error("attempts/result/"));
        }
        let records = self.submitted.lock().unwrap().last().cloned().unwrap_or_default();
        let answered = records.iter().filter(|r| r.is_answered()).count();
        let total = self.exam.question_count().max(1);
        let breakdown: Vec<_> = records
            .iter()
            .map(|r| {
                json!({
                    "question_id": r.question_id(),
                    "is_correct": r.is_answered(),
                    "points_earned": if r.is_answered() { 1.0 } else { 0.0 },
                })
            })
            .collect();
        Ok(serde_json::from_value(json!({
            "score": answered as f64 * 100.0 / total as f64,
            "pass_mark": 50,
            "passed": answered * 2 >= total,
            "breakdown": { "count": breakdown.len(), "results": breakdown },
        }))
        .unwrap())
    }

    async fn get_result_answers(
        &self,
        _attempt_id: AttemptId,
    ) -> GatewayResult<Vec<AnswerDisclosure>> {
        self.calls.lock().unwrap().result_answers += 1;
        if self.script().hide_result_answers {
            return Err(GatewayError::Status {
                endpoint: "attempts/result/answers/".into(),
                status: 403,
                message: Some("answers are hidden".into()),
            });
        }
        Ok(vec![AnswerDisclosure {
            question_id: 1,
            correct_option_id: Some(12),
            correct_text: None,
            explanation: None,
        }])
    }
}

// ========== 测试数据 ==========

fn option(id: i64, text: &str) -> AnswerOption {
    AnswerOption {
        id,
        text: text.to_string(),
        is_correct: None,
    }
}

/// 2 道单选 + 1 道简答
fn three_question_exam() -> Exam {
    Exam {
        id: 7,
        title: "Rust 基础".into(),
        description: String::new(),
        time_limit: Some(30),
        pass_mark: 60.0,
        total_points: None,
        questions: vec![
            Question {
                id: 1,
                text: "2 + 2 = ?".into(),
                question_type: QuestionType::MultipleChoice,
                points: 1.0,
                options: vec![option(11, "3"), option(12, "4")],
            },
            Question {
                id: 2,
                text: "哪个关键字声明可变绑定？".into(),
                question_type: QuestionType::MultipleChoice,
                points: 1.0,
                options: vec![option(21, "mut"), option(22, "var")],
            },
            Question {
                id: 3,
                text: "解释所有权".into(),
                question_type: QuestionType::ShortAnswer,
                points: 1.0,
                options: Vec::new(),
            },
        ],
        previous_attempts: vec![AttemptSummary {
            id: 40,
            score: Some(33.3),
            completed: true,
            submitted_at: None,
        }],
    }
}

fn true_false_exam() -> Exam {
    Exam {
        id: 8,
        title: "اختبار".into(),
        description: String::new(),
        time_limit: None,
        pass_mark: 50.0,
        total_points: None,
        questions: vec![Question {
            id: 1,
            text: "الأرض كروية".into(),
            question_type: QuestionType::TrueFalse,
            points: 1.0,
            options: vec![option(1, "صح"), option(2, "خطأ")],
        }],
        previous_attempts: Vec::new(),
    }
}

fn machine_for(gateway: &Arc<FakeGateway>) -> AttemptMachine {
    AttemptMachine::new(gateway.exam.id, gateway.clone())
}

async fn started_machine(gateway: &Arc<FakeGateway>) -> AttemptMachine {
    let mut machine = machine_for(gateway);
    assert_eq!(machine.load_exam().await, Ok(AttemptPhase::Ready));
    assert_eq!(machine.start().await, Ok(AttemptPhase::InProgress));
    machine
}

// ========== 场景 ==========

#[tokio::test]
async fn test_full_attempt_completes_with_consistent_verdict() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    let mut machine = started_machine(&gateway).await;

    machine.record_answer(1, AnswerValue::Selected(12)).unwrap();
    machine.record_answer(2, AnswerValue::Selected(21)).unwrap();
    machine
        .record_answer(3, AnswerValue::Text("每个值只有一个所有者".into()))
        .unwrap();

    assert_eq!(machine.submit().await, Ok(AttemptPhase::Completed));
    assert_eq!(machine.view_result().await, Ok(AttemptPhase::Completed));

    let result = machine.result().expect("成绩应已获取");
    assert!((0.0..=100.0).contains(&result.score));
    assert_eq!(result.passed, Some(result.score >= 60.0));
    assert_eq!(result.attempt_id, ATTEMPT_ID);
    assert_eq!(
        result.breakdown[0]
            .disclosure
            .as_ref()
            .and_then(|d| d.correct_option_id),
        Some(12)
    );

    let calls = gateway.calls();
    assert_eq!((calls.submit, calls.finish), (1, 1));
    assert_eq!((calls.result, calls.result_answers), (1, 1));
}

#[tokio::test]
async fn test_unanswered_questions_are_submitted_as_nulls() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    let mut machine = started_machine(&gateway).await;

    machine.record_answer(1, AnswerValue::Selected(11)).unwrap();
    assert_eq!(machine.submit().await, Ok(AttemptPhase::Completed));

    let submitted = gateway.submitted();
    assert_eq!(submitted.len(), 1);
    let records = &submitted[0];
    assert_eq!(records.len(), 3);
    assert_eq!(records.iter().filter(|r| !r.is_answered()).count(), 2);
    assert_eq!(
        serde_json::to_value(records).unwrap(),
        json!([
            { "question_id": 1, "selected_answer": 11, "text_answer": null },
            { "question_id": 2, "selected_answer": null, "text_answer": null },
            { "question_id": 3, "selected_answer": null, "text_answer": null }
        ])
    );
}

#[tokio::test]
async fn test_attempts_exhausted_is_distinct_and_repeatable() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    gateway.script().fail_start = Some(StartFailure::Exhausted);
    let mut machine = machine_for(&gateway);
    machine.load_exam().await.unwrap();

    assert_eq!(machine.start().await, Ok(AttemptPhase::Error));
    let state = machine.state();
    let failure = state.failure().expect("应处于失败状态");
    assert_eq!(failure.kind, ErrorKind::AttemptsExhausted);
    assert_eq!(failure.message, ErrorKind::AttemptsExhausted.user_message());
    assert_ne!(failure.message, ErrorKind::Transport.user_message());
    assert_eq!(state.recover_phase(), Some(AttemptPhase::Ready));

    // 可以再次调用，但在规则改变前必然再次失败
    assert_eq!(machine.start().await, Ok(AttemptPhase::Error));
    assert_eq!(gateway.calls().start, 2);
    assert_eq!(machine.state().recover_phase(), Some(AttemptPhase::Ready));
}

#[tokio::test]
async fn test_already_submitted_is_distinct() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    gateway.script().fail_start = Some(StartFailure::AlreadySubmitted);
    let mut machine = machine_for(&gateway);
    machine.load_exam().await.unwrap();

    assert_eq!(machine.start().await, Ok(AttemptPhase::Error));
    let failure = machine.failure().unwrap();
    assert_eq!(failure.kind, ErrorKind::AlreadySubmitted);
    assert!(!failure.is_retryable());

    // 引导用户查看已有成绩
    assert_eq!(
        machine.view_previous_result(40).await,
        Ok(AttemptPhase::Completed)
    );
    assert!(machine.result().is_some());
}

#[tokio::test]
async fn test_finish_failure_preserves_buffer_and_resubmits() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    gateway.script().fail_finish = true;
    let mut machine = started_machine(&gateway).await;

    machine.record_answer(1, AnswerValue::Selected(12)).unwrap();
    machine.record_answer(3, AnswerValue::Text("借用".into())).unwrap();
    let before = machine.answers().unwrap();

    assert_eq!(machine.submit().await, Ok(AttemptPhase::Error));
    assert_eq!(machine.state().recover_phase(), Some(AttemptPhase::InProgress));
    assert_eq!(machine.failure().unwrap().kind, ErrorKind::Transport);
    assert_eq!(machine.answers().unwrap(), before);

    gateway.script().fail_finish = false;
    assert_eq!(machine.submit().await, Ok(AttemptPhase::Completed));

    let submitted = gateway.submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0], submitted[1]);
    assert_eq!(gateway.calls().finish, 2);
}

#[tokio::test]
async fn test_true_false_submits_canonical_token() {
    let gateway = Arc::new(FakeGateway::new(true_false_exam()));
    let mut machine = started_machine(&gateway).await;

    machine.record_answer(1, AnswerValue::Selected(1)).unwrap();
    assert_eq!(machine.submit().await, Ok(AttemptPhase::Completed));

    let record = &gateway.submitted()[0][0];
    assert_eq!(
        record.selected_answer(),
        Some(SelectedAnswer::Token(TrueFalse::True))
    );
    assert_eq!(
        serde_json::to_value(record).unwrap()["selected_answer"],
        json!("true")
    );
}

// ========== 性质 ==========

#[tokio::test]
async fn test_record_answer_never_calls_gateway() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    let mut machine = started_machine(&gateway).await;
    let before = gateway.calls().total();

    for i in 0..50 {
        let option = if i % 2 == 0 { 11 } else { 12 };
        assert_ok!(machine.record_answer(1, AnswerValue::Selected(option)));
        assert_ok!(machine.record_answer(3, AnswerValue::Text(format!("草稿 {}", i))));
    }

    assert_eq!(gateway.calls().total(), before);
    assert_eq!(machine.phase(), AttemptPhase::InProgress);
    assert_eq!(machine.answers().unwrap().len(), 2);
}

#[tokio::test]
async fn test_submit_rejected_outside_in_progress() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    let mut machine = machine_for(&gateway);

    assert_eq!(
        machine.submit().await,
        Err(AttemptError::InvalidTransition {
            operation: "submit",
            phase: AttemptPhase::Idle
        })
    );

    machine.load_exam().await.unwrap();
    assert_eq!(
        machine.submit().await,
        Err(AttemptError::InvalidTransition {
            operation: "submit",
            phase: AttemptPhase::Ready
        })
    );

    machine.start().await.unwrap();
    machine.submit().await.unwrap();
    assert_eq!(
        machine.submit().await,
        Err(AttemptError::InvalidTransition {
            operation: "submit",
            phase: AttemptPhase::Completed
        })
    );

    let calls = gateway.calls();
    assert_eq!((calls.submit, calls.finish), (1, 1));
}

#[tokio::test]
async fn test_submit_answers_failure_never_finishes() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    gateway.script().fail_submit = true;
    let mut machine = started_machine(&gateway).await;
    machine.record_answer(2, AnswerValue::Selected(22)).unwrap();
    let before = machine.answers().unwrap();

    assert_eq!(machine.submit().await, Ok(AttemptPhase::Error));
    assert_eq!(gateway.calls().submit, 1);
    assert_eq!(gateway.calls().finish, 0);
    assert_eq!(machine.answers().unwrap(), before);
}

#[tokio::test]
async fn test_submitting_is_observable_and_guarded() {
    let gate = Arc::new(Notify::new());
    let gateway = Arc::new(FakeGateway::new(three_question_exam()).with_submit_gate(gate.clone()));
    let mut machine = started_machine(&gateway).await;
    let mut rx = machine.subscribe();

    let observer = async {
        rx.wait_for(|s| s.phase() == AttemptPhase::Submitting)
            .await
            .unwrap();
        gate.notify_one();
    };

    let (outcome, _) = tokio::join!(machine.submit(), observer);
    assert_eq!(outcome, Ok(AttemptPhase::Completed));
}

#[tokio::test]
async fn test_dropped_submit_stays_submitting_until_abandoned() {
    let gate = Arc::new(Notify::new());
    let gateway = Arc::new(FakeGateway::new(three_question_exam()).with_submit_gate(gate));
    let mut machine = started_machine(&gateway).await;

    let dropped = tokio::time::timeout(Duration::from_millis(20), machine.submit()).await;
    assert!(dropped.is_err());
    assert_eq!(machine.phase(), AttemptPhase::Submitting);

    assert_eq!(
        machine.submit().await,
        Err(AttemptError::InvalidTransition {
            operation: "submit",
            phase: AttemptPhase::Submitting
        })
    );
    assert_eq!(gateway.calls().submit, 1);
    assert_eq!(gateway.calls().finish, 0);

    assert_eq!(machine.abandon(), Some(ATTEMPT_ID));
    assert_eq!(machine.phase(), AttemptPhase::Idle);
}

#[tokio::test]
async fn test_buffer_only_mutable_in_progress() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    gateway.script().fail_submit = true;
    let mut machine = machine_for(&gateway);

    let rejected = assert_err!(machine.record_answer(1, AnswerValue::Selected(11)));
    assert!(matches!(
        rejected,
        AttemptError::InvalidTransition {
            phase: AttemptPhase::Idle,
            ..
        }
    ));

    machine.load_exam().await.unwrap();
    machine.start().await.unwrap();
    machine.record_answer(1, AnswerValue::Selected(11)).unwrap();
    machine.submit().await.unwrap();
    assert_eq!(machine.phase(), AttemptPhase::Error);

    // error 状态下必须先恢复才能修改答案
    assert!(matches!(
        machine.record_answer(1, AnswerValue::Selected(12)),
        Err(AttemptError::InvalidTransition {
            phase: AttemptPhase::Error,
            ..
        })
    ));
    assert_eq!(machine.recover(), Ok(AttemptPhase::InProgress));
    machine.record_answer(1, AnswerValue::Selected(12)).unwrap();
    assert_eq!(
        machine.answers().unwrap().get(1),
        Some(&AnswerValue::Selected(12))
    );
}

#[tokio::test]
async fn test_record_answer_rejects_foreign_data() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    let mut machine = started_machine(&gateway).await;

    assert_eq!(
        machine.record_answer(99, AnswerValue::Selected(11)),
        Err(AttemptError::UnknownQuestion { question_id: 99 })
    );
    assert_eq!(
        machine.record_answer(1, AnswerValue::Selected(21)),
        Err(AttemptError::UnknownOption {
            question_id: 1,
            option_id: 21
        })
    );
    assert!(machine.answers().unwrap().is_empty());
}

#[tokio::test]
async fn test_load_failure_recovers_to_idle() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    gateway.script().fail_get_exam = true;
    let mut machine = machine_for(&gateway);

    assert_eq!(machine.load_exam().await, Ok(AttemptPhase::Error));
    assert_eq!(machine.state().recover_phase(), Some(AttemptPhase::Idle));
    assert!(machine.failure().unwrap().is_retryable());

    gateway.script().fail_get_exam = false;
    assert_eq!(machine.load_exam().await, Ok(AttemptPhase::Ready));
    assert_eq!(machine.exam().unwrap().question_count(), 3);
}

#[tokio::test]
async fn test_view_previous_result_skips_in_progress() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    let mut machine = machine_for(&gateway);
    machine.load_exam().await.unwrap();

    let mut rx = machine.subscribe();
    assert_eq!(
        machine.view_previous_result(40).await,
        Ok(AttemptPhase::Completed)
    );
    assert_eq!(gateway.calls().start, 0);
    assert_eq!(rx.borrow_and_update().phase(), AttemptPhase::Completed);

    let result = machine.result().unwrap();
    assert_eq!(result.attempt_id, 40);
    // 考试已加载：按考试及格线判断
    assert_eq!(result.pass_mark, Some(60.0));
}

#[tokio::test]
async fn test_view_previous_result_from_idle_uses_gateway_pass_mark() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    let mut machine = machine_for(&gateway);

    assert_eq!(
        machine.view_previous_result(40).await,
        Ok(AttemptPhase::Completed)
    );
    assert_eq!(gateway.calls().get_exam, 0);
    assert_eq!(machine.result().unwrap().pass_mark, Some(50.0));
}

#[tokio::test]
async fn test_view_result_requires_completed() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    let mut machine = started_machine(&gateway).await;

    assert_eq!(
        machine.view_result().await,
        Err(AttemptError::InvalidTransition {
            operation: "view_result",
            phase: AttemptPhase::InProgress
        })
    );
    assert_eq!(gateway.calls().result, 0);
}

#[tokio::test]
async fn test_view_result_failure_recovers_to_completed() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    let mut machine = started_machine(&gateway).await;
    machine.record_answer(1, AnswerValue::Selected(12)).unwrap();
    assert_eq!(machine.submit().await, Ok(AttemptPhase::Completed));

    gateway.script().fail_result = true;
    assert_eq!(machine.view_result().await, Ok(AttemptPhase::Error));
    let state = machine.state();
    assert_eq!(state.recover_phase(), Some(AttemptPhase::Completed));
    assert_eq!(state.attempt_id(), Some(ATTEMPT_ID));
    assert_eq!(machine.failure().unwrap().kind, ErrorKind::Transport);
    assert!(machine.result().is_none());

    // 从 error 直接重试，不需要再次提交
    gateway.script().fail_result = false;
    assert_eq!(machine.view_result().await, Ok(AttemptPhase::Completed));
    assert_eq!(machine.result().unwrap().attempt_id, ATTEMPT_ID);

    let calls = gateway.calls();
    assert_eq!((calls.submit, calls.finish), (1, 1));
    assert_eq!(calls.result, 2);
}

#[tokio::test]
async fn test_hidden_answers_still_show_score() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    gateway.script().hide_result_answers = true;
    let mut machine = started_machine(&gateway).await;
    machine.record_answer(1, AnswerValue::Selected(12)).unwrap();
    machine.record_answer(2, AnswerValue::Selected(21)).unwrap();
    machine.submit().await.unwrap();

    assert_eq!(machine.view_result().await, Ok(AttemptPhase::Completed));
    let result = machine.result().expect("成绩应已获取");
    assert!((result.score - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(result.passed, Some(true));
    assert!(result.breakdown.iter().all(|o| o.disclosure.is_none()));
    assert_eq!(gateway.calls().result_answers, 1);
}

#[tokio::test]
async fn test_hidden_answers_on_previous_result() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    gateway.script().hide_result_answers = true;
    let mut machine = machine_for(&gateway);
    machine.load_exam().await.unwrap();

    assert_eq!(
        machine.view_previous_result(40).await,
        Ok(AttemptPhase::Completed)
    );
    assert!(machine.failure().is_none());
    assert_eq!(machine.result().unwrap().attempt_id, 40);
}

#[tokio::test]
async fn test_remaining_time_tracks_time_limit() {
    let gateway = Arc::new(FakeGateway::new(three_question_exam()));
    let mut machine = machine_for(&gateway);
    assert!(machine.remaining_time().is_none());

    machine.load_exam().await.unwrap();
    machine.start().await.unwrap();
    let remaining = machine.remaining_time().unwrap();
    assert!(remaining <= chrono::Duration::minutes(30));
    assert!(remaining > chrono::Duration::minutes(29));
}
