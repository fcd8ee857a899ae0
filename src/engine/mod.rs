//! 引擎层：动作集合、响应解析、任务上下文、事件流、动作执行、冷却调度与构建主循环

pub mod action;
pub mod context;
pub mod cooldown;
pub mod events;
pub mod executor;
pub mod loop_;
pub mod parser;

pub use action::Action;
pub use context::{PauseReason, Step, TaskContext};
pub use cooldown::{countdown, jitter_ms};
pub use events::{event_channel, EventSink, TaskEvent, TaskEvents};
pub use executor::ActionExecutor;
pub use loop_::{BuildLoop, LoopOptions, RunOutcome, RunSession};
pub use parser::{parse_response, ParsedAction};
