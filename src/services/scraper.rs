//! 抓取器契约 - 业务能力层
//!
//! 具体的 DOM 选择器逻辑由宿主实现（本 crate 不关心表单
//! 渲染库的细节），这里只定义抓取结果的形状。

use crate::models::Question;

/// 一次抓取的产出
///
/// 结构化题目列表用于整体提交模式和答案应用；
/// 当页面无法结构化抓取时，`page_text` 携带原始页面文本，
/// 编排器转入分块模式，答案靠题干片段模糊关联回题目。
#[derive(Debug, Clone, Default)]
pub struct ScrapeOutcome {
    pub questions: Vec<Question>,
    pub page_text: Option<String>,
}

impl ScrapeOutcome {
    /// 抓取结果是否完全不可用
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
            && self
                .page_text
                .as_deref()
                .map(|t| t.trim().is_empty())
                .unwrap_or(true)
    }
}

/// 表单抓取器
pub trait FormScraper: Send + Sync {
    /// 抓取当前页面的题目结构
    ///
    /// 抓取产物在页面变化后即失效，每次作答都应重新抓取。
    fn scrape(&self) -> anyhow::Result<ScrapeOutcome>;
}

/// API 密钥来源
///
/// 对应宿主的键值存储；核心每次操作只读取一次，从不修改。
pub trait CredentialStore: Send + Sync {
    fn api_key(&self) -> Option<String>;
}

/// 从环境变量读取密钥
pub struct EnvCredentialStore {
    var_name: String,
}

impl EnvCredentialStore {
    pub fn new(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
        }
    }
}

impl Default for EnvCredentialStore {
    fn default() -> Self {
        Self::new("GEMINI_API_KEY")
    }
}

impl CredentialStore for EnvCredentialStore {
    fn api_key(&self) -> Option<String> {
        std::env::var(&self.var_name)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}
