use serde::Deserialize;
use std::path::Path;
use tokio::fs;

use crate::error::{AppResult, FileError};
use crate::models::{AnswerValue, AttemptId, ExamId, OptionId, QuestionId};

/// 答题卡
///
/// ```toml
/// exam_id = 12
/// # review_attempt = 40   # 只查看历史成绩，不重新作答
///
/// [[answers]]
/// question_id = 1
/// option_id = 3
///
/// [[answers]]
/// question_id = 2
/// text = "借用检查器在编译期保证引用有效"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerSheet {
    pub exam_id: ExamId,
    #[serde(default)]
    pub review_attempt: Option<AttemptId>,
    #[serde(default)]
    pub answers: Vec<SheetAnswer>,
}

/// 答题卡中的一行
#[derive(Debug, Clone, Deserialize)]
pub struct SheetAnswer {
    pub question_id: QuestionId,
    #[serde(default)]
    pub option_id: Option<OptionId>,
    #[serde(default)]
    pub text: Option<String>,
}

impl SheetAnswer {
    /// 转换为缓冲区答案：选项与文字必须二选一
    pub fn to_value(&self) -> Result<AnswerValue, String> {
        match (&self.option_id, &self.text) {
            (Some(option_id), None) => Ok(AnswerValue::Selected(*option_id)),
            (None, Some(text)) => Ok(AnswerValue::Text(text.clone())),
            (Some(_), Some(_)) => Err(format!(
                "题目 {} 同时填写了 option_id 和 text",
                self.question_id
            )),
            (None, None) => Err(format!(
                "题目 {} 既没有 option_id 也没有 text",
                self.question_id
            )),
        }
    }
}

impl AnswerSheet {
    /// 解析 TOML 文本并校验每一行
    pub fn parse(content: &str, path: &str) -> AppResult<Self> {
        let sheet: AnswerSheet = toml::from_str(content).map_err(|e| FileError::TomlParseFailed {
            path: path.to_string(),
            source: e,
        })?;

        for answer in &sheet.answers {
            answer.to_value().map_err(|reason| FileError::InvalidAnswerSheet {
                path: path.to_string(),
                reason,
            })?;
        }

        Ok(sheet)
    }

    /// 按答题卡顺序给出 (题目, 答案)
    pub fn entries(&self) -> Vec<(QuestionId, AnswerValue)> {
        self.answers
            .iter()
            .filter_map(|a| a.to_value().ok().map(|v| (a.question_id, v)))
            .collect()
    }
}

/// 从 TOML 文件加载答题卡
pub async fn load_answer_sheet(path: &Path) -> AppResult<AnswerSheet> {
    let display = path.display().to_string();

    if !path.exists() {
        return Err(FileError::NotFound { path: display }.into());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| FileError::ReadFailed {
            path: display.clone(),
            source: e,
        })?;

    let sheet = AnswerSheet::parse(&content, &display)?;
    tracing::info!(
        "成功加载答题卡: 考试 #{}，共 {} 个答案",
        sheet.exam_id,
        sheet.answers.len()
    );

    Ok(sheet)
}
