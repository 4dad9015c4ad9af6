//! 模型回退与退避的重试状态机
//!
//! 把历史版本里多处重复的回退循环统一为单个状态机：
//! 模型池和退避参数都来自配置，而不是硬编码分支。
//!
//! 单次调用的状态流转：
//! `Trying(model, attempt)` → 成功 | 限流(退避后重试/换模型)
//! | 模型不可用(立即换模型) | 认证失败(立即终止)
//! | 硬失败(换模型, 无下一个模型时传播)
//! 整池耗尽后按轮数递增冷却再扫一轮，轮数有上限。

use std::time::Duration;

use tracing::{debug, warn};

use crate::clients::GenerateTransport;
use crate::config::Config;
use crate::error::{ApiError, AppError, LlmError, Result};
use crate::models::AnswerResult;
use crate::orchestrator::cancel::CancelToken;
use crate::services::StatusSink;

/// 重试策略（全部可调）
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 模型池，优先级从高到低
    pub model_pool: Vec<String>,
    /// 单个模型的限流重试预算
    pub retries_per_model: u32,
    /// 指数退避基数（秒）
    pub backoff_base_secs: u64,
    /// 整池冷却基数（秒），乘以轮数递增
    pub cooldown_base_secs: u64,
    /// 整池扫描轮数上限
    pub max_pool_rounds: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model_pool: config.model_pool.clone(),
            retries_per_model: config.retries_per_model,
            backoff_base_secs: config.backoff_base_secs,
            cooldown_base_secs: config.cooldown_base_secs,
            max_pool_rounds: config.max_pool_rounds,
        }
    }

    /// 第 attempt 次失败后的退避时长: base * 2^(attempt-1)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.backoff_base_secs * 2u64.pow(attempt.saturating_sub(1)))
    }

    /// 第 round 轮整池失败后的冷却时长，随轮数递增
    pub fn cooldown_delay(&self, round: u32) -> Duration {
        Duration::from_secs(self.cooldown_base_secs * round as u64)
    }

    /// 全部耗尽后给用户的建议等待时长（分钟）
    pub fn exhausted_wait_hint_minutes(&self) -> u64 {
        (self.cooldown_delay(self.max_pool_rounds).as_secs() / 60).max(1)
    }
}

/// 上一次失败的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimited,
    NotFound,
    Hard,
}

/// 单个模型调用期间的瞬态状态，调用结束即丢弃
#[derive(Debug, Clone)]
pub struct RetryState {
    pub model_index: usize,
    pub attempt: u32,
    pub last_error: Option<ErrorKind>,
}

impl RetryState {
    fn new(model_index: usize) -> Self {
        Self {
            model_index,
            attempt: 0,
            last_error: None,
        }
    }
}

/// 带模型回退的单次提示词调用
///
/// 成功时返回解析好的答案列表；认证失败与取消会立即终止，
/// 其余失败按状态机推进，最终耗尽则返回 `ExhaustedRetries`。
pub async fn call_with_fallback(
    transport: &dyn GenerateTransport,
    policy: &RetryPolicy,
    prompt: &str,
    status: &dyn StatusSink,
    cancel: &CancelToken,
) -> Result<Vec<AnswerResult>> {
    for round in 1..=policy.max_pool_rounds {
        let pool_len = policy.model_pool.len();

        for (model_index, model) in policy.model_pool.iter().enumerate() {
            let is_last_model = model_index + 1 == pool_len;
            let mut state = RetryState::new(model_index);

            loop {
                state.attempt += 1;
                cancel.ensure_active()?;

                debug!(
                    "调用模型 {} (第 {} 次尝试, 第 {} 轮)",
                    model, state.attempt, round
                );

                let outcome = transport
                    .generate(model, prompt)
                    .await
                    .and_then(|payload| AnswerResult::parse_payload(model, &payload));

                match outcome {
                    Ok(results) => return Ok(results),
                    Err(e) if e.is_terminal() => return Err(e),
                    Err(AppError::Api(ApiError::RateLimited { .. })) => {
                        state.last_error = Some(ErrorKind::RateLimited);
                        if state.attempt < policy.retries_per_model {
                            let delay = policy.backoff_delay(state.attempt);
                            let remaining = policy.retries_per_model - state.attempt;
                            status.update(&format!(
                                "⏳ 限流 (模型: {}), {} 秒后重试 (剩余 {} 次)...",
                                model,
                                delay.as_secs(),
                                remaining
                            ));
                            cancel.wait(delay).await?;
                        } else {
                            warn!("模型 {} 限流重试预算耗尽", model);
                            break;
                        }
                    }
                    Err(AppError::Api(ApiError::ModelUnavailable { .. })) => {
                        // 模型不可用不是过载，重试无意义
                        state.last_error = Some(ErrorKind::NotFound);
                        warn!("模型 {} 不可用 (404)", model);
                        break;
                    }
                    Err(e) => {
                        state.last_error = Some(ErrorKind::Hard);
                        warn!("模型 {} 调用硬失败: {}", model, e);
                        // 还有后续模型就换下一个试，否则直接传播
                        if is_last_model {
                            return Err(e);
                        }
                        break;
                    }
                }
            }

            debug!(
                "模型 {} (池内第 {} 个) 放弃 (尝试 {} 次, 最后错误: {:?})",
                model,
                state.model_index + 1,
                state.attempt,
                state.last_error
            );

            if !is_last_model {
                status.update(&format!(
                    "🔁 切换模型: {} → {}",
                    model,
                    policy.model_pool[model_index + 1]
                ));
            }
        }

        if round < policy.max_pool_rounds {
            let delay = policy.cooldown_delay(round);
            status.update(&format!(
                "❄️ 本轮模型池均失败, 冷却 {} 秒后进行第 {}/{} 轮...",
                delay.as_secs(),
                round + 1,
                policy.max_pool_rounds
            ));
            cancel.wait(delay).await?;
        }
    }

    Err(AppError::Llm(LlmError::ExhaustedRetries {
        rounds: policy.max_pool_rounds,
        wait_hint_minutes: policy.exhausted_wait_hint_minutes(),
    }))
}
