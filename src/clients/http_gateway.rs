//! 考试网关 HTTP 客户端
//!
//! 所有与后端的 JSON 交互都在这里完成：信封拆解、列表归一化、失败归类。
//! 状态机拿到的永远是强类型结果，不需要判断响应形状。

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::clients::ExamGateway;
use crate::config::Config;
use crate::error::{ConfigError, GatewayError, GatewayResult};
use crate::models::list::NormalizedList;
use crate::models::{
    AnswerDisclosure, AttemptId, Exam, ExamId, ResultPayload, StartedAttempt, SubmissionRecord,
};

/// 信封中允许出现的字段，出现其它字段说明 `data` 属于业务数据本身
const ENVELOPE_KEYS: &[&str] = &["data", "code", "message", "msg", "success", "status"];

const EXHAUSTED_CODES: &[&str] = &["attempts_exhausted", "max_attempts_reached", "no_attempts_left"];
const ALREADY_SUBMITTED_CODES: &[&str] =
    &["already_submitted", "exam_already_submitted", "already_completed"];

static EXHAUSTED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(attempts?[\s_-]*(exhausted|limit)|max(imum)?[\s_-]*(number\s+of\s+)?attempts|no\s+(more\s+)?attempts?\s+(left|remaining)|استنفد\S*\s+(جميع\s+)?(ال)?محاولات|الحد\s+الأقصى\s+(من|لعدد)\s+(ال)?محاولات|(作答|考试|答题)次数已用完|超过(了)?(最大)?(作答|考试|答题)次数)",
    )
    .expect("作答次数正则不合法")
});

static ALREADY_SUBMITTED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(already[\s_-]*(been\s+)?(submitted|completed|taken|finished)|تم\s+تقديم\s+(هذا\s+)?(ال)?(امتحان|اختبار)|سبق\s+(لك\s+|أن\s+)?(تقديم|قدمت)|(考试|试卷|作答)(已|已经)(提交|完成)|(已|已经)提交过(该|此|本)?(考试|试卷))",
    )
    .expect("已提交正则不合法")
});

/// 网关端点
mod endpoints {
    use crate::models::{AttemptId, ExamId};

    pub fn exam(exam_id: ExamId) -> String {
        format!("exams/{}/", exam_id)
    }

    pub fn start(exam_id: ExamId) -> String {
        format!("exams/{}/start/", exam_id)
    }

    pub fn answers(attempt_id: AttemptId) -> String {
        format!("attempts/{}/answers/", attempt_id)
    }

    pub fn finish(attempt_id: AttemptId) -> String {
        format!("attempts/{}/finish/", attempt_id)
    }

    pub fn result(attempt_id: AttemptId) -> String {
        format!("attempts/{}/result/", attempt_id)
    }

    pub fn result_answers(attempt_id: AttemptId) -> String {
        format!("attempts/{}/result/answers/", attempt_id)
    }
}

/// 考试网关 HTTP 客户端
pub struct HttpExamGateway {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpExamGateway {
    /// 创建新的网关客户端
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::ClientBuildFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.gateway_base_url.trim_end_matches('/').to_string(),
            token: config.gateway_token.clone(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(endpoint))
            .header(ACCEPT, "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// 发送请求并返回拆掉信封后的 JSON
    async fn send(&self, builder: RequestBuilder, endpoint: &str) -> GatewayResult<Value> {
        debug!("调用网关: {}", endpoint);

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::transport(endpoint, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::transport(endpoint, e))?;

        debug!("网关响应 ({}): status={}, {} 字节", endpoint, status, body.len());

        interpret(endpoint, status, &body).map_err(|err| {
            warn!("⚠️ 网关调用失败: {}", err);
            err
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
    ) -> GatewayResult<T> {
        let value = self.send(builder, endpoint).await?;
        serde_json::from_value(value).map_err(|e| GatewayError::Decode {
            endpoint: endpoint.to_string(),
            source: e,
        })
    }
}

#[async_trait]
impl ExamGateway for HttpExamGateway {
    async fn get_exam(&self, exam_id: ExamId) -> GatewayResult<Exam> {
        let endpoint = endpoints::exam(exam_id);
        self.fetch(self.request(Method::GET, &endpoint), &endpoint)
            .await
    }

    async fn start_attempt(&self, exam_id: ExamId) -> GatewayResult<StartedAttempt> {
        let endpoint = endpoints::start(exam_id);
        self.fetch(self.request(Method::POST, &endpoint), &endpoint)
            .await
    }

    async fn submit_answers(
        &self,
        attempt_id: AttemptId,
        records: &[SubmissionRecord],
    ) -> GatewayResult<()> {
        let endpoint = endpoints::answers(attempt_id);
        let builder = self
            .request(Method::POST, &endpoint)
            .json(&json!({ "answers": records }));
        self.send(builder, &endpoint).await.map(|_| ())
    }

    async fn finish_attempt(&self, attempt_id: AttemptId) -> GatewayResult<()> {
        let endpoint = endpoints::finish(attempt_id);
        self.send(self.request(Method::POST, &endpoint), &endpoint)
            .await
            .map(|_| ())
    }

    async fn get_result(&self, attempt_id: AttemptId) -> GatewayResult<ResultPayload> {
        let endpoint = endpoints::result(attempt_id);
        self.fetch(self.request(Method::GET, &endpoint), &endpoint)
            .await
    }

    async fn get_result_answers(
        &self,
        attempt_id: AttemptId,
    ) -> GatewayResult<Vec<AnswerDisclosure>> {
        let endpoint = endpoints::result_answers(attempt_id);
        let list: NormalizedList<AnswerDisclosure> = self
            .fetch(self.request(Method::GET, &endpoint), &endpoint)
            .await?;
        Ok(list.into_vec())
    }
}

// ========== 辅助函数 ==========

/// 解释一次网关响应：失败状态码、`success: false`、空响应体与信封都在这里处理
fn interpret(endpoint: &str, status: u16, body: &str) -> GatewayResult<Value> {
    if !(200..300).contains(&status) {
        return Err(classify_failure(endpoint, status, body));
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    let value: Value = serde_json::from_str(body).map_err(|e| GatewayError::Decode {
        endpoint: endpoint.to_string(),
        source: e,
    })?;

    if value.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(classify_failure(endpoint, status, body));
    }

    Ok(unwrap_envelope(value))
}

/// 拆掉 `{code, message, data}` 信封
fn unwrap_envelope(value: Value) -> Value {
    let is_envelope = value.as_object().is_some_and(|obj| {
        obj.contains_key("data") && obj.keys().all(|k| ENVELOPE_KEYS.contains(&k.as_str()))
    });
    match value {
        Value::Object(mut obj) if is_envelope => obj.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

/// 提取失败响应中的业务码和提示信息
fn extract_code_and_message(body: &Value) -> (Option<String>, Option<String>) {
    let code = ["code", "error_code"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .map(|c| c.to_lowercase());

    let message = ["detail", "message", "msg", "error"].iter().find_map(|k| {
        match body.get(*k) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(inner)) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            Some(Value::Array(items)) => items.first().and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    });

    (code, message)
}

/// 把失败响应归类为网关错误
///
/// 作答次数用完、已提交两种情况必须区分出来，其余一律视为普通失败。
fn classify_failure(endpoint: &str, status: u16, body: &str) -> GatewayError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let (code, message) = extract_code_and_message(&parsed);
    let text = message
        .clone()
        .unwrap_or_else(|| body.trim().chars().take(200).collect());

    if let Some(code) = code.as_deref() {
        if EXHAUSTED_CODES.contains(&code) {
            return GatewayError::AttemptsExhausted { message: text };
        }
        if ALREADY_SUBMITTED_CODES.contains(&code) {
            return GatewayError::AlreadySubmitted { message: text };
        }
    }

    if EXHAUSTED_PATTERN.is_match(&text) {
        return GatewayError::AttemptsExhausted { message: text };
    }
    if ALREADY_SUBMITTED_PATTERN.is_match(&text) {
        return GatewayError::AlreadySubmitted { message: text };
    }

    GatewayError::Status {
        endpoint: endpoint.to_string(),
        status,
        message,
    }
}
