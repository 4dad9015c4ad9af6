//! 应用入口 - 编排层
//!
//! 接收宿主的控制命令，管理一次作答操作的生命周期：
//! 密钥读取、并发防护、取消信号、终态状态上报。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::clients::{GeminiClient, GenerateTransport};
use crate::config::Config;
use crate::error::{AppError, BusinessError, Result};
use crate::models::Question;
use crate::orchestrator::cancel::CancelHandle;
use crate::services::{
    CredentialStore, FormApplicator, FormScraper, FormSurface, StatusChannel, StatusSink,
};
use crate::utils::logging::log_run_summary;
use crate::workflow::AnswerFlow;

/// 宿主可下发的控制命令，均为幂等操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// 抓取 + 请求 LLM + 应用答案
    AnswerForm,
    /// 清除所有选择与高亮
    ClearSelections,
}

/// 应用主结构
///
/// 持有所有注入的外部协作者；核心逻辑不直接接触
/// 浏览器存储或 DOM。
pub struct App {
    config: Config,
    scraper: Box<dyn FormScraper>,
    surface: Mutex<Box<dyn FormSurface + Send>>,
    credentials: Box<dyn CredentialStore>,
    status: Arc<StatusChannel>,
    cancel: CancelHandle,
    in_flight: AtomicBool,
    transport_override: Option<Arc<dyn GenerateTransport>>,
}

impl App {
    pub fn new(
        config: Config,
        scraper: Box<dyn FormScraper>,
        surface: Box<dyn FormSurface + Send>,
        credentials: Box<dyn CredentialStore>,
    ) -> Self {
        Self {
            config,
            scraper,
            surface: Mutex::new(surface),
            credentials,
            status: Arc::new(StatusChannel::new()),
            cancel: CancelHandle::new(),
            in_flight: AtomicBool::new(false),
            transport_override: None,
        }
    }

    /// 注入自定义传输（代理、模拟实现等），替代内置的 Gemini 客户端
    pub fn with_transport(mut self, transport: Arc<dyn GenerateTransport>) -> Self {
        self.transport_override = Some(transport);
        self
    }

    /// 状态通道，UI 可订阅或轮询
    pub fn status(&self) -> Arc<StatusChannel> {
        self.status.clone()
    }

    /// 请求取消当前操作
    ///
    /// 信号在下一个网络调用或定时等待前生效；
    /// 已落到页面上的部分答案保持原样（重新应用是幂等的）。
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    /// 处理一条控制命令
    pub async fn handle(&self, command: ControlCommand) -> Result<usize> {
        match command {
            ControlCommand::AnswerForm => self.answer_form().await,
            ControlCommand::ClearSelections => self.clear_selections().await,
        }
    }

    async fn answer_form(&self) -> Result<usize> {
        // 防止两次作答并行造成重复的 DOM 变更
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            let err = AppError::Business(BusinessError::OperationInFlight);
            self.status.update(&err.user_message());
            return Err(err);
        }

        self.cancel.reset();
        let result = self.run_answer_flow().await;
        self.in_flight.store(false, Ordering::SeqCst);

        match &result {
            Ok(applied) => {
                self.status
                    .update(&format!("完成 ✅ 已应用 {} 个答案!", applied));
                log_run_summary(*applied);
            }
            Err(e) => {
                warn!("作答失败: {}", e);
                self.status.update(&format!("错误: {}", e.user_message()));
            }
        }

        result
    }

    async fn run_answer_flow(&self) -> Result<usize> {
        // 密钥每次操作读取一次，缺失则在任何网络调用前终止
        let api_key = self
            .credentials
            .api_key()
            .ok_or(AppError::Business(BusinessError::MissingCredential))?;

        let transport: Arc<dyn GenerateTransport> = match &self.transport_override {
            Some(t) => t.clone(),
            None => Arc::new(GeminiClient::new(&self.config, api_key)?),
        };

        let flow = AnswerFlow::new(&self.config, transport);
        let token = self.cancel.token();

        let mut surface = self.surface.lock().await;
        flow.run(
            self.scraper.as_ref(),
            surface.as_mut(),
            self.status.as_ref(),
            &token,
        )
        .await
    }

    async fn clear_selections(&self) -> Result<usize> {
        info!("🧹 清除所有选择...");

        // 重新抓取以拿到当前的题目结构；抓取失败时仍然清空页面状态
        let questions: std::collections::BTreeMap<u32, Question> = match self.scraper.scrape() {
            Ok(outcome) => outcome.questions.into_iter().map(|q| (q.id, q)).collect(),
            Err(e) => {
                warn!("清除前抓取失败: {}", e);
                Default::default()
            }
        };

        let applicator = FormApplicator::new(&self.config);
        let mut surface = self.surface.lock().await;
        applicator.clear_all(&questions, surface.as_mut());

        self.status.update("就绪");
        Ok(0)
    }
}
