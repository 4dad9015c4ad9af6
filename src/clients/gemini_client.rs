//! Gemini API 客户端
//!
//! 封装对 generateContent 端点的单次调用，把 HTTP 状态码
//! 翻译为重试状态机可识别的错误分类。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, LlmError, Result};

/// LLM 生成调用的传输抽象
///
/// 编排器只依赖这个接口，测试时注入模拟实现。
#[async_trait]
pub trait GenerateTransport: Send + Sync {
    /// 向指定模型发送一条提示词，返回响应的文本负载
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;
}

// ========== 请求/响应的线格式 ==========

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

// ========== 客户端 ==========

/// Gemini 客户端
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(config: &Config, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::request_failed(config.api_base_url.clone(), e))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: config.api_base_url.clone(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        )
    }
}

/// 判断错误响应体是否是认证类错误
///
/// 部分认证问题会以 HTTP 400 携带错误说明返回，
/// 这类错误换模型或退避都无法恢复。
fn is_auth_flavored(body: &str) -> bool {
    body.contains("API key not valid")
        || body.contains("API_KEY_INVALID")
        || body.contains("PERMISSION_DENIED")
        || body.contains("UNAUTHENTICATED")
}

#[async_trait]
impl GenerateTransport for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json".to_string(),
            },
        };

        debug!("调用 Gemini API，模型: {}", model);

        let response = self
            .http
            .post(self.endpoint(model))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Gemini API 请求失败 (模型: {}): {}", model, e);
                AppError::request_failed(format!("{}/{}", self.base_url, model), e)
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                429 => AppError::rate_limited(model),
                404 => AppError::model_unavailable(model),
                401 | 403 => AppError::authentication_failed(status.as_u16()),
                code if is_auth_flavored(&body) => AppError::authentication_failed(code),
                code => AppError::Api(crate::error::ApiError::BadResponse {
                    model: model.to_string(),
                    status: code,
                    message: body.chars().take(200).collect(),
                }),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed_response(model, e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.trim().is_empty());

        match text {
            Some(text) => {
                debug!("Gemini API 调用成功，负载 {} 字符", text.len());
                Ok(text)
            }
            None => Err(AppError::Llm(LlmError::EmptyContent {
                model: model.to_string(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_format() {
        let config = Config::default();
        let client = GeminiClient::new(&config, "test-key").unwrap();

        assert_eq!(
            client.endpoint("gemini-2.0-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key=test-key"
        );
    }

    #[test]
    fn test_auth_flavored_body_detection() {
        assert!(is_auth_flavored(
            r#"{"error": {"message": "API key not valid. Please pass a valid API key."}}"#
        ));
        assert!(is_auth_flavored(r#"{"error": {"status": "PERMISSION_DENIED"}}"#));
        assert!(!is_auth_flavored(r#"{"error": {"status": "RESOURCE_EXHAUSTED"}}"#));
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "hello".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                response_mime_type: "application/json".to_string(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }
}
