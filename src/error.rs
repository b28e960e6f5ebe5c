use thiserror::Error;

use crate::models::{OptionId, QuestionId, QuestionType};
use crate::workflow::AttemptPhase;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 考试网关调用错误
    #[error("网关错误: {0}")]
    Gateway(#[from] GatewayError),
    /// 作答流程的契约错误
    #[error("作答错误: {0}")]
    Attempt(#[from] AttemptError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 错误类别
///
/// 决定用户看到哪一类提示：可以重试，还是不能再参加本次考试。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 网络失败、超时、无法解析的响应
    Transport,
    /// 作答次数已用完
    AttemptsExhausted,
    /// 考试已经提交过
    AlreadySubmitted,
    /// 调用方绕过了状态守卫
    Validation,
}

impl ErrorKind {
    /// 是否值得提示用户重试
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transport)
    }

    /// 面向用户的简短提示
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::Transport => "网络异常，请稍后重试",
            ErrorKind::AttemptsExhausted => "你的作答次数已用完，无法再次参加本考试",
            ErrorKind::AlreadySubmitted => "你已经提交过本考试，请直接查看成绩",
            ErrorKind::Validation => "操作不允许",
        }
    }
}

/// 网关调用错误
#[derive(Debug, Error)]
pub enum GatewayError {
    /// 网络请求失败（连接、超时）
    #[error("网关请求失败 ({endpoint}): {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 网关返回了非成功状态码
    #[error("网关返回错误响应 ({endpoint}): status={status}, message={message:?}")]
    Status {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },
    /// 网关拒绝开始：作答次数已用完
    #[error("作答次数已用完: {message}")]
    AttemptsExhausted { message: String },
    /// 网关拒绝开始：考试已提交
    #[error("考试已提交: {message}")]
    AlreadySubmitted { message: String },
    /// 响应体无法解码
    #[error("响应解析失败 ({endpoint}): {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl GatewayError {
    /// 归类到用户可见的错误类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::AttemptsExhausted { .. } => ErrorKind::AttemptsExhausted,
            GatewayError::AlreadySubmitted { .. } => ErrorKind::AlreadySubmitted,
            GatewayError::Transport { .. }
            | GatewayError::Status { .. }
            | GatewayError::Decode { .. } => ErrorKind::Transport,
        }
    }

    /// 创建网络请求失败错误
    pub fn transport(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        GatewayError::Transport {
            endpoint: endpoint.into(),
            source: Box::new(source),
        }
    }
}

/// 作答流程的契约错误
///
/// 出现即说明调用方绕过了状态守卫，或者传入了不属于本考试的数据。
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AttemptError {
    /// 当前状态不允许该操作
    #[error("当前状态 {phase} 下不允许执行 {operation}")]
    InvalidTransition {
        operation: &'static str,
        phase: AttemptPhase,
    },
    /// 题目不属于本考试
    #[error("题目 {question_id} 不属于本考试")]
    UnknownQuestion { question_id: QuestionId },
    /// 选项不属于该题目
    #[error("选项 {option_id} 不属于题目 {question_id}")]
    UnknownOption {
        question_id: QuestionId,
        option_id: OptionId,
    },
    /// 答案形式与题型不符
    #[error("题目 {question_id} 的题型为 {expected}，答案形式不匹配")]
    AnswerTypeMismatch {
        question_id: QuestionId,
        expected: QuestionType,
    },
}

impl AttemptError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 答题卡内容不合法
    #[error("答题卡不合法 ({path}): {reason}")]
    InvalidAnswerSheet { path: String, reason: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 网关地址不合法
    #[error("网关地址不合法: {url}")]
    InvalidGatewayUrl { url: String },
    /// 超时时间为零
    #[error("请求超时时间必须大于 0")]
    ZeroTimeout,
    /// HTTP 客户端构建失败
    #[error("HTTP 客户端构建失败: {0}")]
    ClientBuildFailed(String),
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 网关调用结果类型
pub type GatewayResult<T> = Result<T, GatewayError>;
