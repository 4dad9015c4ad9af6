use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// API 调用错误
    Api(ApiError),
    /// LLM 响应错误
    Llm(LlmError),
    /// 业务逻辑错误
    Business(BusinessError),
    /// 其他错误（用于包装宿主环境的错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Api(e) => write!(f, "API错误: {}", e),
            AppError::Llm(e) => write!(f, "LLM错误: {}", e),
            AppError::Business(e) => write!(f, "业务错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Api(e) => Some(e),
            AppError::Llm(e) => Some(e),
            AppError::Business(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// API 调用错误
#[derive(Debug)]
pub enum ApiError {
    /// 请求频率限制（HTTP 429）
    RateLimited {
        model: String,
    },
    /// 模型不可用（HTTP 404）
    ModelUnavailable {
        model: String,
    },
    /// 认证失败（HTTP 401/403 或认证类错误响应体）
    AuthenticationFailed {
        status: u16,
    },
    /// API 返回其他错误响应
    BadResponse {
        model: String,
        status: u16,
        message: String,
    },
    /// 网络请求失败
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::RateLimited { model } => {
                write!(f, "API请求频率限制 (模型: {})", model)
            }
            ApiError::ModelUnavailable { model } => {
                write!(f, "模型不可用 (模型: {})", model)
            }
            ApiError::AuthenticationFailed { status } => {
                write!(f, "API认证失败 (HTTP {}), 请检查API密钥", status)
            }
            ApiError::BadResponse {
                model,
                status,
                message,
            } => {
                write!(
                    f,
                    "API返回错误响应 (模型: {}): HTTP {}, {}",
                    model, status, message
                )
            }
            ApiError::RequestFailed { endpoint, source } => {
                write!(f, "API请求失败 ({}): {}", endpoint, source)
            }
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::RequestFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// LLM 响应错误
#[derive(Debug)]
pub enum LlmError {
    /// 响应体不是预期形状的 JSON 数组
    MalformedResponse {
        model: String,
        snippet: String,
    },
    /// 响应中没有文本内容
    EmptyContent {
        model: String,
    },
    /// 模型池全部耗尽
    ExhaustedRetries {
        rounds: u32,
        wait_hint_minutes: u64,
    },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::MalformedResponse { model, snippet } => {
                write!(f, "无法解析LLM响应 (模型: {}): {}", model, snippet)
            }
            LlmError::EmptyContent { model } => {
                write!(f, "LLM返回内容为空 (模型: {})", model)
            }
            LlmError::ExhaustedRetries {
                rounds,
                wait_hint_minutes,
            } => {
                write!(
                    f,
                    "所有模型均已耗尽 (共扫描 {} 轮), 请等待约 {} 分钟后重试",
                    rounds, wait_hint_minutes
                )
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// 业务逻辑错误
#[derive(Debug)]
pub enum BusinessError {
    /// 未配置 API 密钥
    MissingCredential,
    /// 页面中没有可用的题目
    NoQuestionsFound,
    /// 已有一次作答操作在进行中
    OperationInFlight,
    /// 操作被取消
    Cancelled,
}

impl fmt::Display for BusinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusinessError::MissingCredential => {
                write!(f, "未找到API密钥, 请先在设置中配置")
            }
            BusinessError::NoQuestionsFound => {
                write!(f, "未找到可作答的题目, 请刷新页面后重试")
            }
            BusinessError::OperationInFlight => {
                write!(f, "已有一次作答操作在进行中, 请等待其完成")
            }
            BusinessError::Cancelled => write!(f, "操作已取消"),
        }
    }
}

impl std::error::Error for BusinessError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Other(err.to_string())
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建限流错误
    pub fn rate_limited(model: impl Into<String>) -> Self {
        AppError::Api(ApiError::RateLimited {
            model: model.into(),
        })
    }

    /// 创建模型不可用错误
    pub fn model_unavailable(model: impl Into<String>) -> Self {
        AppError::Api(ApiError::ModelUnavailable {
            model: model.into(),
        })
    }

    /// 创建认证失败错误
    pub fn authentication_failed(status: u16) -> Self {
        AppError::Api(ApiError::AuthenticationFailed { status })
    }

    /// 创建网络请求失败错误
    pub fn request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建响应解析失败错误
    pub fn malformed_response(model: impl Into<String>, snippet: impl Into<String>) -> Self {
        AppError::Llm(LlmError::MalformedResponse {
            model: model.into(),
            snippet: snippet.into(),
        })
    }

    /// 判断错误是否应立即终止整个操作（不可通过换模型或退避恢复）
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppError::Api(ApiError::AuthenticationFailed { .. })
                | AppError::Business(BusinessError::Cancelled)
        )
    }

    /// 生成带操作提示的用户可见消息
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(ApiError::AuthenticationFailed { .. }) => {
                format!("{} (提示: 检查密钥是否正确)", self)
            }
            AppError::Llm(LlmError::ExhaustedRetries { .. }) => self.to_string(),
            AppError::Business(BusinessError::NoQuestionsFound) => self.to_string(),
            _ => format!("{} (提示: 可稍后重试或刷新页面)", self),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type Result<T> = std::result::Result<T, AppError>;
