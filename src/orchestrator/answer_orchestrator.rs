//! 请求编排器 - 编排层
//!
//! 把一次抓取产出的题目集合变成一条或多条 LLM 请求，
//! 管理模型回退与退避，并把各请求的结果重新拼装成答案集合。
//!
//! 两种输入形状：
//! - **整体模式**：题目已结构化且规模不大，全部题目放进一条提示词；
//! - **分块模式**：输入是大段未结构化的页面文本，按固定行数切块，
//!   每块独立发送，块间等待固定间隔以尊重速率限制，
//!   各块解析出的 JSON 数组按块序拼接。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::clients::GenerateTransport;
use crate::config::Config;
use crate::error::Result;
use crate::models::{AnswerResult, Question};
use crate::orchestrator::cancel::CancelToken;
use crate::orchestrator::retry::{call_with_fallback, RetryPolicy};
use crate::services::StatusSink;

/// 请求编排器
pub struct AnswerOrchestrator {
    transport: Arc<dyn GenerateTransport>,
    policy: RetryPolicy,
    chunk_size_lines: usize,
    min_chunk_chars: usize,
    chunk_delay: Duration,
}

impl AnswerOrchestrator {
    pub fn new(config: &Config, transport: Arc<dyn GenerateTransport>) -> Self {
        Self {
            transport,
            policy: RetryPolicy::from_config(config),
            chunk_size_lines: config.chunk_size_lines,
            min_chunk_chars: config.min_chunk_chars,
            chunk_delay: Duration::from_millis(config.chunk_delay_ms),
        }
    }

    /// 整体模式：所有题目放进一条提示词
    pub async fn answer_questions(
        &self,
        questions: &[Question],
        status: &dyn StatusSink,
        cancel: &CancelToken,
    ) -> Result<Vec<AnswerResult>> {
        info!("📝 整体模式, 共 {} 道题", questions.len());

        let prompt = build_question_prompt(questions);
        call_with_fallback(
            self.transport.as_ref(),
            &self.policy,
            &prompt,
            status,
            cancel,
        )
        .await
    }

    /// 分块模式：把页面文本切成行块，逐块请求后拼接结果
    pub async fn answer_page_text(
        &self,
        page_text: &str,
        status: &dyn StatusSink,
        cancel: &CancelToken,
    ) -> Result<Vec<AnswerResult>> {
        let chunks = self.split_into_chunks(page_text);
        let total = chunks.len();
        info!("📄 分块模式, 共 {} 块 (每块 {} 行)", total, self.chunk_size_lines);

        let mut all_results = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            status.update(&format!("📦 正在处理第 {}/{} 块...", index + 1, total));

            let prompt = build_text_prompt(chunk);
            let results = call_with_fallback(
                self.transport.as_ref(),
                &self.policy,
                &prompt,
                status,
                cancel,
            )
            .await?;

            debug!("第 {}/{} 块解析出 {} 条答案", index + 1, total, results.len());
            all_results.extend(results);

            // 块间等待，尊重速率限制
            if index + 1 < total {
                cancel.wait(self.chunk_delay).await?;
            }
        }

        Ok(all_results)
    }

    /// 按固定行数切块，跳过有效内容过短的块
    pub(crate) fn split_into_chunks(&self, text: &str) -> Vec<String> {
        let lines: Vec<&str> = text.lines().collect();
        lines
            .chunks(self.chunk_size_lines)
            .map(|chunk| chunk.join("\n"))
            .filter(|chunk| chunk.trim().chars().count() >= self.min_chunk_chars)
            .collect()
    }
}

/// 整体模式提示词：逐题列出 ID/类型/题干/选项，要求按 id 关联作答
fn build_question_prompt(questions: &[Question]) -> String {
    let mut prompt = String::from(
        "You are an automated assistant designed to answer multiple choice questions \
         from a test or survey. I will provide a list of questions along with their \
         unique IDs and possible options.\n\n\
         Task: For each question, determine the correct answer(s) and return a JSON \
         array of objects. Each object MUST contain:\n\
         - \"id\": the exact integer ID provided for the question.\n\
         - \"answer\": an array of strings containing the exact text of the correct option(s).\n\n\
         Important: Your entire response must be ONLY a valid JSON array and nothing else. \
         Ensure the answer text matches the provided options exactly or as closely as possible.\n\n\
         Questions:\n",
    );

    for question in questions {
        prompt.push_str(&format!("ID: {}\n", question.id));
        prompt.push_str(&format!("Type: {}\n", question.qtype.as_str()));
        prompt.push_str(&format!("Question: {}\n", question.text));
        prompt.push_str(&format!(
            "Options: {}\n\n",
            serde_json::to_string(&question.options).unwrap_or_else(|_| "[]".to_string())
        ));
    }

    prompt
}

/// 分块模式提示词：原始文本里没有题目 ID，
/// 要求模型回传题干片段用于模糊关联
fn build_text_prompt(chunk: &str) -> String {
    format!(
        "You are an automated assistant that answers questions found in raw page text \
         extracted from an online form.\n\n\
         Task: Identify every question in the text below, determine the correct answer(s), \
         and return a JSON array of objects. Each object MUST contain:\n\
         - \"question\": the question text exactly as it appears (or its distinctive beginning).\n\
         - \"answers\": an array of strings with the exact text of the correct answer option(s).\n\n\
         Important: Your entire response must be ONLY a valid JSON array and nothing else. \
         Skip anything that is not a question.\n\n\
         Page text:\n{}",
        chunk
    )
}
