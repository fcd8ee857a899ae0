//! 构建主循环
//!
//! 提示词 -> AI 对话 -> 解析动作 -> 执行文件变更 -> 记录步骤 -> 冷却 -> 下一步；
//! 配额耗尽时暂停并交出上下文，稍后可从同一步恢复；支持协作式取消与最大步数预算。
//! 所有失败都在循环内转成事件，run 只以 RunOutcome 收尾，不向调用方抛错。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::engine::cooldown::{countdown, jitter_ms};
use crate::engine::parser::parse_response;
use crate::engine::{
    Action, ActionExecutor, EventSink, PauseReason, Step, TaskContext, TaskEvent,
};
use crate::llm::ChatClient;
use crate::prompt::PromptBuilder;

/// 默认最大步数预算
pub const DEFAULT_MAX_STEPS: u32 = 10;
/// 默认冷却下限（毫秒）
pub const DEFAULT_MIN_COOLDOWN_MS: u64 = 5_000;
/// 默认冷却上限（毫秒）
pub const DEFAULT_MAX_COOLDOWN_MS: u64 = 10_000;

/// 循环参数：步数预算与冷却区间
#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub max_steps: u32,
    pub min_cooldown_ms: u64,
    pub max_cooldown_ms: u64,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            min_cooldown_ms: DEFAULT_MIN_COOLDOWN_MS,
            max_cooldown_ms: DEFAULT_MAX_COOLDOWN_MS,
        }
    }
}

/// 一次 run 的终态，取消也是一种终态而不是错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// 模型发出 complete 动作
    Completed,
    /// 步数预算耗尽（确定性终态，非错误）
    BudgetExhausted,
    /// 配额耗尽已暂停，上下文交由调用方持久化
    Paused,
    /// 取消信号在轮询点被观察到
    Cancelled,
}

/// 一次 run 的会话配置：取消令牌必需，事件通道 / 事件回调 / 暂停回调可选
pub struct RunSession<'a> {
    /// 取消令牌（必需）
    pub cancel_token: CancellationToken,
    /// 可选：事件推送通道
    pub event_tx: Option<&'a tokio::sync::mpsc::UnboundedSender<TaskEvent>>,
    /// 可选：同步事件回调，与通道推送同序
    pub on_event: Option<&'a (dyn Fn(&TaskEvent) + Send + Sync)>,
    /// 可选：暂停回调，每次暂停恰好调用一次，入参为完整上下文
    pub on_pause: Option<&'a (dyn Fn(&TaskContext) + Send + Sync)>,
}

impl<'a> RunSession<'a> {
    /// 创建最小配置的 RunSession
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self {
            cancel_token,
            event_tx: None,
            on_event: None,
            on_pause: None,
        }
    }

    /// 设置事件推送通道
    pub fn with_event_tx(mut self, tx: &'a tokio::sync::mpsc::UnboundedSender<TaskEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 设置同步事件回调
    pub fn with_event_callback(mut self, cb: &'a (dyn Fn(&TaskEvent) + Send + Sync)) -> Self {
        self.on_event = Some(cb);
        self
    }

    /// 设置暂停回调
    pub fn with_pause_callback(mut self, cb: &'a (dyn Fn(&TaskContext) + Send + Sync)) -> Self {
        self.on_pause = Some(cb);
        self
    }
}

/// 构建循环：注入 AI 客户端、动作执行器与提示词构造器
pub struct BuildLoop {
    chat: Arc<dyn ChatClient>,
    executor: ActionExecutor,
    prompts: Arc<dyn PromptBuilder>,
    options: LoopOptions,
}

impl BuildLoop {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        executor: ActionExecutor,
        prompts: Arc<dyn PromptBuilder>,
        options: LoopOptions,
    ) -> Self {
        Self {
            chat,
            executor,
            prompts,
            options,
        }
    }

    /// 执行构建循环，直到完成、预算耗尽、暂停或取消
    ///
    /// 每一步：取消检查 -> 组装消息 -> AI 对话 -> 解析 -> 记录步骤 -> 执行动作 ->
    /// step_complete -> 冷却。配额耗尽走暂停路径且不记录该步；其他错误发
    /// 可恢复 error 事件后消耗步号继续。恢复调用会清除暂停标记并重试同一步号。
    pub async fn run(&self, session: &RunSession<'_>, ctx: &mut TaskContext) -> RunOutcome {
        if ctx.is_complete {
            tracing::debug!(session_id = %ctx.session_id, "task already complete, nothing to run");
            return RunOutcome::Completed;
        }

        let events = EventSink::new(session.event_tx, session.on_event);
        ctx.cap_history();
        let start_step = ctx.take_start_step();
        tracing::info!(
            session_id = %ctx.session_id,
            start_step,
            max_steps = self.options.max_steps,
            "build loop started"
        );
        events.emit(TaskEvent::Thinking);

        for step_number in start_step..=self.options.max_steps {
            if session.cancel_token.is_cancelled() {
                tracing::info!(session_id = %ctx.session_id, step_number, "cancelled by user");
                events.emit(TaskEvent::Error {
                    message: "Cancelled by user".to_string(),
                    recoverable: false,
                });
                return RunOutcome::Cancelled;
            }

            let system = self.prompts.build(
                &ctx.session_id,
                &ctx.mode,
                step_number,
                &ctx.files_created,
                &ctx.files_updated,
            );
            let messages = ctx.prompt_messages(&system);

            let reply = match self.chat.chat(&messages, &ctx.model_name).await {
                Ok(reply) => reply,
                Err(e) if e.is_quota_exhausted() => {
                    tracing::warn!(
                        session_id = %ctx.session_id,
                        step_number,
                        error = %e,
                        "quota exhausted, pausing task"
                    );
                    ctx.pause(PauseReason::LowBalance, step_number);
                    events.emit(TaskEvent::AuthRequired);
                    events.emit(TaskEvent::Paused {
                        step: step_number,
                        reason: PauseReason::LowBalance,
                    });
                    if let Some(cb) = session.on_pause {
                        cb(ctx);
                    }
                    return RunOutcome::Paused;
                }
                Err(e) => {
                    // 错误消耗步号，不重试当前步
                    tracing::warn!(
                        session_id = %ctx.session_id,
                        step_number,
                        error = %e,
                        "chat call failed, skipping step"
                    );
                    events.emit(TaskEvent::Error {
                        message: e.to_string(),
                        recoverable: true,
                    });
                    continue;
                }
            };

            let parsed = parse_response(&reply);
            tracing::debug!(
                session_id = %ctx.session_id,
                step_number,
                action = %parsed.action,
                target = parsed.target.as_deref().unwrap_or("none"),
                "step parsed"
            );
            ctx.record_step(Step::new(
                step_number,
                parsed.action,
                parsed.target.clone(),
                parsed.reasoning.clone(),
                parsed.content.clone(),
            ));

            if let Err(e) = self.executor.apply(&parsed, ctx, &events).await {
                tracing::warn!(
                    session_id = %ctx.session_id,
                    step_number,
                    error = %e,
                    "action failed, skipping step"
                );
                events.emit(TaskEvent::Error {
                    message: e.to_string(),
                    recoverable: true,
                });
                continue;
            }

            match parsed.action {
                Action::Plan => events.emit(TaskEvent::Planning {
                    reasoning: parsed.reasoning.clone(),
                }),
                Action::Analyze => events.emit(TaskEvent::Thinking),
                Action::Complete => {
                    tracing::info!(
                        session_id = %ctx.session_id,
                        steps = ctx.steps.len(),
                        "task completed"
                    );
                    events.emit(TaskEvent::Complete {
                        summary: parsed.reasoning.clone(),
                        files_created: ctx.files_created.clone(),
                        files_updated: ctx.files_updated.clone(),
                        files_deleted: ctx.files_deleted.clone(),
                    });
                    return RunOutcome::Completed;
                }
                _ => {}
            }

            events.emit(TaskEvent::StepComplete {
                step: step_number,
                action: parsed.action,
            });

            if step_number < self.options.max_steps {
                let wait_ms = jitter_ms(self.options.min_cooldown_ms, self.options.max_cooldown_ms);
                tracing::debug!(session_id = %ctx.session_id, wait_ms, "cooldown before next step");
                let finished = countdown(wait_ms, &session.cancel_token, |remaining| {
                    events.emit(TaskEvent::Cooldown { remaining });
                })
                .await;
                if !finished {
                    tracing::info!(session_id = %ctx.session_id, "cancelled during cooldown");
                    events.emit(TaskEvent::Error {
                        message: "Cancelled by user".to_string(),
                        recoverable: false,
                    });
                    return RunOutcome::Cancelled;
                }
            }
        }

        // 预算耗尽：确定性终态，带上已累计的文件清单
        tracing::info!(
            session_id = %ctx.session_id,
            max_steps = self.options.max_steps,
            "step budget exhausted"
        );
        events.emit(TaskEvent::Complete {
            summary: format!(
                "Reached the maximum of {} steps before the task finished",
                self.options.max_steps
            ),
            files_created: ctx.files_created.clone(),
            files_updated: ctx.files_updated.clone(),
            files_deleted: ctx.files_deleted.clone(),
        });
        RunOutcome::BudgetExhausted
    }
}
