//! # Gemini Form Helper
//!
//! 自动作答在线表单的核心逻辑：抓取题目结构 → 请求 Gemini API
//! → 把答案匹配回可点击的选项元素。
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - Question / AnswerResult 等不可变数据模型
//! - 兼容两种 LLM 响应形状（按 id 或按题干片段关联）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单道题目
//! - `AnswerMatcher` - 答案文本到选项的分层匹配能力
//! - `FormApplicator` - 单选/多选/填空的应用策略
//! - `StatusChannel` - 只写的进度通知能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义一次作答的完整流程
//! - `AnswerFlow` - 流程编排（抓取 → LLM → 应用）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/answer_orchestrator` - 整体/分块两种请求模式
//! - `orchestrator/retry` - 模型回退与退避状态机
//! - `orchestrator/app` - 控制命令入口，管理并发防护与取消
//!
//! DOM 抓取、选项点击、密钥存储均通过 trait 注入，
//! 核心不依赖任何具体的表单渲染库。

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{GeminiClient, GenerateTransport};
pub use config::Config;
pub use error::{AppError, Result};
pub use models::{AnswerResult, Question, QuestionType};
pub use orchestrator::{App, CancelHandle, CancelToken, ControlCommand};
pub use services::{
    AnswerMatcher, CredentialStore, EnvCredentialStore, FormApplicator, FormScraper, FormSurface,
    OptionCandidate, ScrapeOutcome, StatusChannel, StatusSink,
};
pub use workflow::AnswerFlow;
