use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 考试网关地址
    pub gateway_base_url: String,
    /// 网关访问令牌（Bearer）
    pub gateway_token: Option<String>,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 答题卡路径
    pub answer_sheet_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway_base_url: "http://localhost:8000/api".to_string(),
            gateway_token: None,
            request_timeout_secs: 30,
            verbose_logging: false,
            answer_sheet_path: "answer_sheet.toml".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            gateway_base_url: std::env::var("EXAM_GATEWAY_URL").unwrap_or(default.gateway_base_url),
            gateway_token: std::env::var("EXAM_GATEWAY_TOKEN").ok().filter(|t| !t.is_empty()).or(default.gateway_token),
            request_timeout_secs: std::env::var("EXAM_REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            answer_sheet_path: std::env::var("ANSWER_SHEET").unwrap_or(default.answer_sheet_path),
        }
    }

    /// 校验配置是否可用
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.gateway_base_url).map_err(|_| {
            ConfigError::InvalidGatewayUrl {
                url: self.gateway_base_url.clone(),
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidGatewayUrl {
                url: self.gateway_base_url.clone(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
