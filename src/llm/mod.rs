//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use mock::MockChatClient;
pub use openai::OpenAiClient;
pub use traits::{is_quota_exhausted_message, ChatClient, LlmError, Message, Role};

/// DeepSeek 提供与 OpenAI 完全兼容的 API 接口
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 根据配置与环境变量选择聊天后端（DeepSeek / OpenAI 兼容 / Mock）
///
/// - 有 DEEPSEEK_API_KEY，或配置为 deepseek 且有 OPENAI_API_KEY：走 DeepSeek 兼容端点
/// - 有 OPENAI_API_KEY 且 provider 不是 deepseek：走 OpenAI（可配置 base_url）
/// - 都没有：回退 Mock（演示脚本），并打 warn
pub fn create_chat_client(cfg: &AppConfig) -> Arc<dyn ChatClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let deepseek_key = std::env::var("DEEPSEEK_API_KEY").ok();
    let openai_key = std::env::var("OPENAI_API_KEY").ok();

    let use_deepseek = deepseek_key.is_some() || (provider == "deepseek" && openai_key.is_some());
    let use_openai = openai_key.is_some() && provider != "deepseek";

    if use_deepseek {
        let base = cfg.llm.base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL);
        let key = deepseek_key.or(openai_key);
        tracing::info!(base_url = %base, "Using DeepSeek-compatible chat backend");
        Arc::new(OpenAiClient::new(Some(base), key.as_deref()))
    } else if use_openai {
        tracing::info!("Using OpenAI chat backend");
        Arc::new(OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            openai_key.as_deref(),
        ))
    } else {
        tracing::warn!("No API key set, falling back to mock chat backend");
        Arc::new(MockChatClient::demo())
    }
}
