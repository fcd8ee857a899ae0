//! Mock LLM 客户端（用于测试与无 Key 演示）
//!
//! 按脚本顺序弹出预置响应（文本或错误）；脚本耗尽后回复终止动作 complete，保证循环可收敛。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::llm::{ChatClient, LlmError, Message};

/// 脚本耗尽后的兜底回复：让循环正常终止而不是空转到步数上限
const EXHAUSTED_REPLY: &str = "ACTION: complete\nTARGET: none\nREASONING: Mock script exhausted";

/// Mock 客户端：预置响应队列，线程安全，可在 Arc 包装后继续入队
pub struct MockChatClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: AtomicUsize,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// 入队一条成功响应
    pub async fn push_response(&self, text: impl Into<String>) {
        self.script.lock().await.push_back(Ok(text.into()));
    }

    /// 入队一条错误响应
    pub async fn push_error(&self, err: LlmError) {
        self.script.lock().await.push_back(Err(err));
    }

    /// 已接收的 chat 调用次数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// 无 Key 演示脚本：写一个 hello.txt 然后 complete
    pub fn demo() -> Self {
        let mut script = VecDeque::new();
        script.push_back(Ok(
            "ACTION: create_file\nTARGET: hello.txt\nREASONING: Start with a greeting file\n---\nHello from mason!"
                .to_string(),
        ));
        script.push_back(Ok(
            "ACTION: complete\nTARGET: none\nREASONING: Demo task finished".to_string(),
        ));
        Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn chat(&self, _messages: &[Message], _model: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match self.script.lock().await.pop_front() {
            Some(result) => result,
            None => Ok(EXHAUSTED_REPLY.to_string()),
        }
    }
}
