//! Mason - 自主多步代码生成引擎
//!
//! 反复向语言模型要「下一个动作」，对工程文件集执行该动作，并决定继续、暂停或停止。
//! 核心是有界迭代状态机：配额耗尽时暂停并可从同一步恢复，协作式取消，
//! 对不可靠模型输出的容错解析。
//!
//! 模块划分：
//! - **engine**: 动作集合、响应解析、任务上下文、事件流、动作执行、冷却调度与构建主循环
//! - **llm**: AI 对话协作方（OpenAI 兼容 / DeepSeek / Mock）
//! - **project**: 文件变更协作方（沙箱目录 / 内存）
//! - **prompt**: 提示词构造协作方与默认模板实现
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **supervisor**: 取消令牌生命周期
//! - **observability**: 结构化日志初始化

pub mod config;
pub mod engine;
pub mod llm;
pub mod observability;
pub mod project;
pub mod prompt;
pub mod supervisor;

pub use engine::{
    event_channel, Action, BuildLoop, LoopOptions, PauseReason, RunOutcome, RunSession, Step,
    TaskContext, TaskEvent, TaskEvents,
};
pub use llm::{ChatClient, LlmError, Message, Role};
pub use project::{ProjectStore, StoreError};
