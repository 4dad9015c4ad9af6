//! 题目与答案的数据模型
//!
//! `Question` 由抓取器在每次抓取时创建，创建后不可变；
//! `AnswerResult` 由 LLM 响应解析产生，被应用器消费一次。

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// 题目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// 单选题
    Radio,
    /// 多选题
    Checkbox,
    /// 填空题
    Text,
    /// 未识别的类型
    Unknown,
}

impl QuestionType {
    /// 线格式里的小写标签
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Radio => "radio",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Text => "text",
            QuestionType::Unknown => "unknown",
        }
    }
}

/// 一道题目
///
/// `id` 在单次抓取内按出现顺序分配且唯一，间接标识 DOM 位置；
/// 题干文本由抓取器清理（去除必答星号与多余空白）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    #[serde(rename = "type")]
    pub qtype: QuestionType,
    #[serde(rename = "question")]
    pub text: String,
    /// 选项文本（填空题为空）
    #[serde(default)]
    pub options: Vec<String>,
}

/// LLM 对单道题目的作答结果
///
/// 关联方式二选一：`id` 直接对应 `Question::id`；
/// 当响应中没有 id 时，退化为 `question_snippet` 模糊关联。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerResult {
    pub id: Option<u32>,
    pub question_snippet: Option<String>,
    pub answers: Vec<String>,
}

/// 响应中 answer 字段既可能是单个字符串也可能是数组
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnswerField {
    One(String),
    Many(Vec<String>),
}

impl AnswerField {
    fn into_vec(self) -> Vec<String> {
        match self {
            AnswerField::One(s) => vec![s],
            AnswerField::Many(v) => v,
        }
    }
}

/// 响应数组元素的原始形状
///
/// 兼容两种格式：`{id, answer}` 与 `{question, answers}`
#[derive(Debug, Deserialize)]
struct RawAnswer {
    id: Option<u32>,
    question: Option<String>,
    answer: Option<AnswerField>,
    answers: Option<AnswerField>,
}

impl From<RawAnswer> for AnswerResult {
    fn from(raw: RawAnswer) -> Self {
        let answers = raw
            .answer
            .or(raw.answers)
            .map(AnswerField::into_vec)
            .unwrap_or_default();
        Self {
            id: raw.id,
            question_snippet: raw.question,
            answers,
        }
    }
}

impl AnswerResult {
    /// 解析 LLM 返回的文本负载为答案列表
    ///
    /// 负载要求是一个 JSON 数组；部分模型会把数组包在 markdown
    /// 代码块里，这里先用正则提取最外层的数组再解析。
    pub fn parse_payload(model: &str, payload: &str) -> Result<Vec<AnswerResult>> {
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            return Err(AppError::Llm(crate::error::LlmError::EmptyContent {
                model: model.to_string(),
            }));
        }

        let json_text = extract_json_array(trimmed).unwrap_or_else(|| trimmed.to_string());

        let raw: Vec<RawAnswer> = serde_json::from_str(&json_text)
            .map_err(|_| AppError::malformed_response(model, truncate_snippet(trimmed)))?;

        Ok(raw.into_iter().map(AnswerResult::from).collect())
    }
}

/// 从文本中提取最外层的 JSON 数组
fn extract_json_array(text: &str) -> Option<String> {
    let re = regex::Regex::new(r"(?s)\[.*\]").ok()?;
    re.find(text).map(|m| m.as_str().to_string())
}

/// 截断负载用于错误信息展示
fn truncate_snippet(text: &str) -> String {
    const MAX_LEN: usize = 120;
    if text.chars().count() > MAX_LEN {
        text.chars().take(MAX_LEN).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
