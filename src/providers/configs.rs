pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub api_key: String,
    /// Base URL of an OpenAI-compatible API, `/chat/completions` is appended.
    pub host: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
    pub timeout_secs: u64,
    /// Extra attempts for retryable failures; zero means fail on the first error.
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl OpenAiProviderConfig {
    pub fn new(api_key: String, host: String, model: String) -> Self {
        Self {
            api_key,
            host,
            model,
            temperature: None,
            max_tokens: None,
            timeout_secs: 600,
            retries: 0,
            retry_delay_ms: 500,
        }
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.host.trim_end_matches('/'))
    }
}
