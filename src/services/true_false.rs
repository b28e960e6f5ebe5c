//! 判断题答案标准化
//!
//! 判断题的选项文字是本地化的（"صح" / "خطأ"、"对" / "错"、"True" / "False"……），
//! 提交给网关前必须换成标准记号 `"true"` / `"false"`。

use once_cell::sync::Lazy;
use phf::phf_map;
use regex::Regex;
use tracing::warn;

use crate::models::{OptionId, Question, TrueFalse};

/// 归一化后的选项文字 → 标准记号
static TRUE_FALSE_WORDS: phf::Map<&'static str, TrueFalse> = phf_map! {
    // English
    "true" => TrueFalse::True,
    "t" => TrueFalse::True,
    "yes" => TrueFalse::True,
    "correct" => TrueFalse::True,
    "right" => TrueFalse::True,
    "false" => TrueFalse::False,
    "f" => TrueFalse::False,
    "no" => TrueFalse::False,
    "incorrect" => TrueFalse::False,
    "wrong" => TrueFalse::False,
    // العربية
    "صح" => TrueFalse::True,
    "صحيح" => TrueFalse::True,
    "نعم" => TrueFalse::True,
    "خطا" => TrueFalse::False,
    "خاطئ" => TrueFalse::False,
    "غلط" => TrueFalse::False,
    "لا" => TrueFalse::False,
    // 中文
    "对" => TrueFalse::True,
    "正确" => TrueFalse::True,
    "是" => TrueFalse::True,
    "错" => TrueFalse::False,
    "错误" => TrueFalse::False,
    "否" => TrueFalse::False,
    // Français / Deutsch / Español
    "vrai" => TrueFalse::True,
    "faux" => TrueFalse::False,
    "wahr" => TrueFalse::True,
    "richtig" => TrueFalse::True,
    "falsch" => TrueFalse::False,
    "verdadero" => TrueFalse::True,
    "falso" => TrueFalse::False,
    // 符号
    "✓" => TrueFalse::True,
    "✔" => TrueFalse::True,
    "✗" => TrueFalse::False,
    "✘" => TrueFalse::False,
    "×" => TrueFalse::False,
};

/// 标点、空白、阿拉伯语变音符与延长符
static NOISE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{P}\s\u{064B}-\u{0652}\u{0640}]+").expect("标准化正则不合法")
});

/// 归一化选项文字：去噪、小写、统一阿拉伯语 alef 写法
fn normalize(text: &str) -> String {
    NOISE_PATTERN
        .replace_all(text, "")
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'أ' | 'إ' | 'آ' => 'ا',
            other => other,
        })
        .collect()
}

/// 按文字识别标准记号
pub fn token_from_text(text: &str) -> Option<TrueFalse> {
    TRUE_FALSE_WORDS.get(normalize(text).as_str()).copied()
}

/// 把判断题的选中选项换成标准记号
///
/// 文字无法识别时按选项位置兜底：第一个为 true，第二个为 false。
/// 选项不属于该题，或位置也无法判断时返回 None。
pub fn canonical_token(question: &Question, option_id: OptionId) -> Option<TrueFalse> {
    let option = question.option(option_id)?;
    if let Some(token) = token_from_text(&option.text) {
        return Some(token);
    }

    let fallback = match question.option_position(option_id)? {
        0 => TrueFalse::True,
        1 => TrueFalse::False,
        _ => return None,
    };
    warn!(
        "⚠️ 题目 {} 的判断题选项 \"{}\" 无法识别，按位置视为 {}",
        question.id, option.text, fallback
    );
    Some(fallback)
}
