//! 作答流程 - 流程层
//!
//! 定义一次 ANSWER_FORM 的完整流程：
//! 抓取 → 编排 LLM 请求 → 把答案应用回表单。
//!
//! 编排器与应用器之间是显式的函数调用契约，
//! 不存在运行时才检查的全局回调。

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::clients::GenerateTransport;
use crate::config::Config;
use crate::error::{AppError, BusinessError, Result};
use crate::models::Question;
use crate::orchestrator::{AnswerOrchestrator, CancelToken};
use crate::services::{FormApplicator, FormScraper, FormSurface, StatusSink};
use crate::utils::logging::truncate_text;

/// 作答流程
///
/// 不持有任何页面资源，只依赖注入的抓取器与表单抽象。
pub struct AnswerFlow {
    orchestrator: AnswerOrchestrator,
    applicator: FormApplicator,
    verbose_logging: bool,
}

impl AnswerFlow {
    pub fn new(config: &Config, transport: Arc<dyn GenerateTransport>) -> Self {
        Self {
            orchestrator: AnswerOrchestrator::new(config, transport),
            applicator: FormApplicator::new(config),
            verbose_logging: config.verbose_logging,
        }
    }

    /// 执行一次完整的作答
    ///
    /// 返回本次新应用的答案数量。
    pub async fn run(
        &self,
        scraper: &dyn FormScraper,
        surface: &mut dyn FormSurface,
        status: &dyn StatusSink,
        cancel: &CancelToken,
    ) -> Result<usize> {
        status.update("🔍 正在抓取表单...");
        let outcome = scraper.scrape().map_err(AppError::from)?;

        if outcome.is_empty() {
            return Err(AppError::Business(BusinessError::NoQuestionsFound));
        }

        if self.verbose_logging {
            for question in &outcome.questions {
                info!(
                    "[题目 {}] ({}) {}",
                    question.id,
                    question.qtype.as_str(),
                    truncate_text(&question.text, 80)
                );
            }
        }

        let question_map: BTreeMap<u32, Question> = outcome
            .questions
            .iter()
            .cloned()
            .map(|q| (q.id, q))
            .collect();

        // 结构化题目走整体模式；只有原始文本时走分块模式
        let results = match outcome.page_text.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(page_text) => {
                status.update("📄 页面未能结构化抓取, 按文本分块处理...");
                self.orchestrator
                    .answer_page_text(page_text, status, cancel)
                    .await?
            }
            None => {
                status.update(&format!(
                    "正在为 {} 道题获取答案...",
                    outcome.questions.len()
                ));
                self.orchestrator
                    .answer_questions(&outcome.questions, status, cancel)
                    .await?
            }
        };

        status.update("正在将答案应用到表单...");
        let applied = self.applicator.apply(&question_map, &results, surface);

        info!("✓ 本次应用了 {} 个答案", applied);
        Ok(applied)
    }
}
