/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 模型池（按优先级排序，失败时依次切换）
    pub model_pool: Vec<String>,
    /// Gemini API 基础URL
    pub api_base_url: String,
    /// 生成温度
    pub temperature: f32,
    /// 单次网络请求超时（秒）
    pub request_timeout_secs: u64,
    /// 选项匹配的最小子串长度（短于此长度的包含关系不算匹配）
    pub min_match_len: usize,
    /// 分块模式下每块的行数
    pub chunk_size_lines: usize,
    /// 分块模式下单块的最小有效字符数（低于则跳过该块）
    pub min_chunk_chars: usize,
    /// 块与块之间的等待时间（毫秒）
    pub chunk_delay_ms: u64,
    /// 限流退避的基础等待时间（秒）
    pub backoff_base_secs: u64,
    /// 单个模型的最大重试次数
    pub retries_per_model: u32,
    /// 整个模型池的最大扫描轮数
    pub max_pool_rounds: u32,
    /// 整池失败后的冷却基础时间（秒），随轮数递增
    pub cooldown_base_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_pool: vec![
                "gemini-2.0-flash".to_string(),
                "gemini-1.5-flash".to_string(),
                "gemini-1.5-flash-8b".to_string(),
            ],
            api_base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            temperature: 0.1,
            request_timeout_secs: 30,
            min_match_len: 2,
            chunk_size_lines: 150,
            min_chunk_chars: 30,
            chunk_delay_ms: 2500,
            backoff_base_secs: 10,
            retries_per_model: 3,
            max_pool_rounds: 4,
            cooldown_base_secs: 30,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            model_pool: std::env::var("GEMINI_MODEL_POOL")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<String>>()
                })
                .filter(|v| !v.is_empty())
                .unwrap_or(default.model_pool),
            api_base_url: std::env::var("GEMINI_API_BASE_URL").unwrap_or(default.api_base_url),
            temperature: std::env::var("GEMINI_TEMPERATURE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.temperature),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            min_match_len: std::env::var("MIN_MATCH_LEN").ok().and_then(|v| v.parse().ok()).unwrap_or(default.min_match_len),
            chunk_size_lines: std::env::var("CHUNK_SIZE_LINES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.chunk_size_lines),
            min_chunk_chars: std::env::var("MIN_CHUNK_CHARS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.min_chunk_chars),
            chunk_delay_ms: std::env::var("CHUNK_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.chunk_delay_ms),
            backoff_base_secs: std::env::var("BACKOFF_BASE_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.backoff_base_secs),
            retries_per_model: std::env::var("RETRIES_PER_MODEL").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retries_per_model),
            max_pool_rounds: std::env::var("MAX_POOL_ROUNDS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_pool_rounds),
            cooldown_base_secs: std::env::var("COOLDOWN_BASE_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.cooldown_base_secs),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }
}
