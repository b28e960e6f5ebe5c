use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{first_of, AttemptId, ExamId};

/// 一次作答
///
/// 只存在于内存中，页面刷新即丢失。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    pub id: AttemptId,
    pub exam_id: ExamId,
    pub started_at: DateTime<Utc>,
}

impl Attempt {
    pub fn new(id: AttemptId, exam_id: ExamId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            exam_id,
            started_at,
        }
    }

    /// 截止时间（考试无时间限制时为 None）
    pub fn deadline(&self, time_limit_minutes: Option<u32>) -> Option<DateTime<Utc>> {
        time_limit_minutes.map(|m| self.started_at + Duration::minutes(i64::from(m)))
    }

    /// 剩余时间，已超时返回零
    pub fn remaining(
        &self,
        time_limit_minutes: Option<u32>,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        self.deadline(time_limit_minutes)
            .map(|deadline| (deadline - now).max(Duration::zero()))
    }
}

/// Start-Attempt 的响应
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "StartedAttemptWire")]
pub struct StartedAttempt {
    pub id: AttemptId,
    pub started_at: Option<DateTime<Utc>>,
}

/// 历史作答摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AttemptSummaryWire")]
pub struct AttemptSummary {
    pub id: AttemptId,
    pub score: Option<f64>,
    pub completed: bool,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct StartedAttemptWire {
    attempt_id: Option<AttemptId>,
    id: Option<AttemptId>,
    started_at: Option<DateTime<Utc>>,
    start_time: Option<DateTime<Utc>>,
}

impl TryFrom<StartedAttemptWire> for StartedAttempt {
    type Error = &'static str;

    fn try_from(wire: StartedAttemptWire) -> Result<Self, Self::Error> {
        Ok(Self {
            id: first_of([wire.attempt_id, wire.id]).ok_or("开始作答的响应缺少作答编号")?,
            started_at: first_of([wire.started_at, wire.start_time]),
        })
    }
}

#[derive(Deserialize)]
struct AttemptSummaryWire {
    id: Option<AttemptId>,
    attempt_id: Option<AttemptId>,
    score: Option<f64>,
    completed: Option<bool>,
    is_completed: Option<bool>,
    finished: Option<bool>,
    submitted_at: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl TryFrom<AttemptSummaryWire> for AttemptSummary {
    type Error = &'static str;

    fn try_from(wire: AttemptSummaryWire) -> Result<Self, Self::Error> {
        Ok(Self {
            id: first_of([wire.id, wire.attempt_id]).ok_or("历史作答缺少作答编号")?,
            score: wire.score,
            completed: first_of([wire.completed, wire.is_completed, wire.finished])
                .unwrap_or(false),
            submitted_at: first_of([wire.submitted_at, wire.end_time]),
        })
    }
}
