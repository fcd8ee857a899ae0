//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 ChatClient：chat（非流式，模型名逐次传入）。
//! 错误分为两类：QuotaExhausted（余额/配额耗尽，触发任务暂停）与 Api（其他一切，按可恢复错误处理）。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// 配额耗尽的识别词表：余额 / 配额 / 账单词汇，以及 HTTP 402/429 状态码字样
const QUOTA_MARKERS: [&str; 6] = [
    "balance",
    "quota",
    "billing",
    "payment required",
    "402",
    "429",
];

/// 判断一条供应商错误消息是否意味着配额耗尽（大小写不敏感的包含匹配）
pub fn is_quota_exhausted_message(message: &str) -> bool {
    let m = message.to_lowercase();
    QUOTA_MARKERS.iter().any(|marker| m.contains(marker))
}

/// LLM 调用错误：QuotaExhausted 触发暂停，Api 走可恢复错误路径
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("LLM error: {0}")]
    Api(String),
}

impl LlmError {
    /// 从供应商原始错误消息分类（词表命中则视为配额耗尽）
    pub fn from_provider(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_quota_exhausted_message(&message) {
            Self::QuotaExhausted(message)
        } else {
            Self::Api(message)
        }
    }

    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, Self::QuotaExhausted(_))
    }
}

/// LLM 客户端 trait：一次非流式 chat 调用，模型名由调用方（Context.model_name）决定
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, messages: &[Message], model: &str) -> Result<String, LlmError>;
}
