//! 执行上下文：单个任务的可恢复状态
//!
//! 记录已执行步骤、触碰过的文件清单与暂停状态；整体可 serde 序列化，
//! 暂停快照经 JSON 往返后可交回循环继续执行。

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::engine::Action;
use crate::llm::Message;

/// 载入时保留的对话历史上限
pub const HISTORY_LOAD_CAP: usize = 20;
/// 单次提示词拼装时取的历史条数
pub const PROMPT_HISTORY_MESSAGES: usize = 10;
/// 折叠进提示词的最近步骤数（渲染为 assistant 消息）
pub const PROMPT_STEP_FOLD: usize = 5;

/// 暂停原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    LowBalance,
    UserCancelled,
    #[default]
    None,
}

/// 一条已记录的步骤（记录后不可变）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub step_number: u32,
    pub action: Action,
    pub target: Option<String>,
    pub reasoning: String,
    pub content: Option<String>,
    /// Unix 毫秒
    pub timestamp: i64,
}

impl Step {
    pub fn new(
        step_number: u32,
        action: Action,
        target: Option<String>,
        reasoning: String,
        content: Option<String>,
    ) -> Self {
        Self {
            step_number,
            action,
            target,
            reasoning,
            content,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// 渲染为合成的 assistant 历史行（content 省略以控制 token）
    pub fn as_history_line(&self) -> String {
        format!(
            "ACTION: {}\nTARGET: {}\nREASONING: {}",
            self.action,
            self.target.as_deref().unwrap_or("none"),
            self.reasoning
        )
    }
}

/// 任务上下文：会话、任务文本、步骤、文件清单与暂停状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskContext {
    pub session_id: String,
    pub task: String,
    pub mode: String,
    pub model_name: String,
    pub steps: Vec<Step>,
    pub files_created: Vec<String>,
    pub files_updated: Vec<String>,
    pub files_deleted: Vec<String>,
    pub is_complete: bool,
    pub is_paused: bool,
    pub pause_reason: PauseReason,
    pub paused_at_step: Option<u32>,
    pub previous_messages: Vec<Message>,
}

impl TaskContext {
    /// 新建任务上下文，自动生成会话 id
    pub fn new(
        task: impl Into<String>,
        mode: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            session_id: format!("task_{}", uuid::Uuid::new_v4()),
            task: task.into(),
            mode: mode.into(),
            model_name: model_name.into(),
            steps: Vec::new(),
            files_created: Vec::new(),
            files_updated: Vec::new(),
            files_deleted: Vec::new(),
            is_complete: false,
            is_paused: false,
            pause_reason: PauseReason::None,
            paused_at_step: None,
            previous_messages: Vec::new(),
        }
    }

    /// 指定外部会话 id（会话管理在引擎之外）
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// 附加既有对话历史，超出上限时保留最近部分
    pub fn with_history(mut self, messages: Vec<Message>) -> Self {
        self.previous_messages = messages;
        self.cap_history();
        self
    }

    /// 载入归一化：历史裁到最近 HISTORY_LOAD_CAP 条（新建与快照恢复皆适用）
    pub fn cap_history(&mut self) {
        if self.previous_messages.len() > HISTORY_LOAD_CAP {
            let excess = self.previous_messages.len() - HISTORY_LOAD_CAP;
            self.previous_messages.drain(..excess);
        }
    }

    pub fn record_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn mark_complete(&mut self) {
        self.is_complete = true;
    }

    /// 进入暂停态；完成的任务不可暂停
    pub fn pause(&mut self, reason: PauseReason, step_number: u32) {
        debug_assert!(!self.is_complete);
        debug_assert!(reason != PauseReason::None);
        self.is_paused = true;
        self.pause_reason = reason;
        self.paused_at_step = Some(step_number);
    }

    /// 清除暂停态并给出本次运行的起始步号（暂停过则重试同一步，否则从 1 开始）
    pub fn take_start_step(&mut self) -> u32 {
        if self.is_paused {
            let start = self.paused_at_step.unwrap_or(1);
            self.is_paused = false;
            self.pause_reason = PauseReason::None;
            self.paused_at_step = None;
            start
        } else {
            1
        }
    }

    /// 拼装一次提示词的消息序列：
    /// system + 最近 PROMPT_HISTORY_MESSAGES 条历史 + 最近 PROMPT_STEP_FOLD 步（assistant）+ 任务原文（user）
    pub fn prompt_messages(&self, system: &str) -> Vec<Message> {
        let mut messages = Vec::new();
        messages.push(Message::system(system));

        let skip = self
            .previous_messages
            .len()
            .saturating_sub(PROMPT_HISTORY_MESSAGES);
        messages.extend(self.previous_messages[skip..].iter().cloned());

        let skip = self.steps.len().saturating_sub(PROMPT_STEP_FOLD);
        for step in &self.steps[skip..] {
            messages.push(Message::assistant(step.as_history_line()));
        }

        messages.push(Message::user(self.task.clone()));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    fn step(n: u32) -> Step {
        Step::new(n, Action::Plan, None, format!("step {}", n), None)
    }

    #[test]
    fn test_new_context_generates_session_id() {
        let ctx = TaskContext::new("build a plugin", "project", "deepseek-chat");
        assert!(ctx.session_id.starts_with("task_"));
        assert!(!ctx.is_complete);
        assert!(!ctx.is_paused);
        assert_eq!(ctx.pause_reason, PauseReason::None);
    }

    #[test]
    fn test_history_capped_at_load() {
        let history: Vec<Message> = (0..30).map(|i| Message::user(format!("m{}", i))).collect();
        let ctx = TaskContext::new("t", "project", "m").with_history(history);
        assert_eq!(ctx.previous_messages.len(), HISTORY_LOAD_CAP);
        // 保留最近的，最旧的被裁掉
        assert_eq!(ctx.previous_messages[0].content, "m10");
        assert_eq!(ctx.previous_messages.last().unwrap().content, "m29");
    }

    #[test]
    fn test_pause_and_resume_round_trip() {
        let mut ctx = TaskContext::new("t", "project", "m");
        ctx.pause(PauseReason::LowBalance, 4);
        assert!(ctx.is_paused);
        assert_eq!(ctx.paused_at_step, Some(4));
        assert!(!(ctx.is_complete && ctx.is_paused));

        let start = ctx.take_start_step();
        assert_eq!(start, 4);
        assert!(!ctx.is_paused);
        assert_eq!(ctx.pause_reason, PauseReason::None);
        assert_eq!(ctx.paused_at_step, None);
    }

    #[test]
    fn test_fresh_context_starts_at_one() {
        let mut ctx = TaskContext::new("t", "project", "m");
        assert_eq!(ctx.take_start_step(), 1);
    }

    #[test]
    fn test_user_cancelled_pause_is_resumable() {
        let mut ctx = TaskContext::new("t", "project", "m");
        ctx.pause(PauseReason::UserCancelled, 7);
        assert_eq!(ctx.pause_reason, PauseReason::UserCancelled);
        assert_eq!(ctx.take_start_step(), 7);
    }

    #[test]
    fn test_prompt_messages_composition() {
        let history: Vec<Message> = (0..15).map(|i| Message::user(format!("h{}", i))).collect();
        let mut ctx = TaskContext::new("build it", "project", "m").with_history(history);
        for n in 1..=8 {
            ctx.record_step(step(n));
        }

        let messages = ctx.prompt_messages("SYSTEM PROMPT");
        // 1 system + 10 历史 + 5 步骤 + 1 user
        assert_eq!(messages.len(), 17);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "SYSTEM PROMPT");
        // 历史取最近 10 条：h5..h14
        assert_eq!(messages[1].content, "h5");
        assert_eq!(messages[10].content, "h14");
        // 步骤折叠最近 5 步：4..8
        assert_eq!(messages[11].role, Role::Assistant);
        assert!(messages[11].content.contains("step 4"));
        assert!(messages[15].content.contains("step 8"));
        // 任务原文收尾
        let last = messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, "build it");
    }

    #[test]
    fn test_prompt_messages_small_context() {
        let ctx = TaskContext::new("tiny", "project", "m");
        let messages = ctx.prompt_messages("S");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "tiny");
    }

    #[test]
    fn test_step_history_line_format() {
        let s = Step::new(3, Action::CreateFile, Some("pom.xml".into()), "Build file".into(), Some("<xml/>".into()));
        let line = s.as_history_line();
        assert_eq!(line, "ACTION: create_file\nTARGET: pom.xml\nREASONING: Build file");

        let s = Step::new(4, Action::Plan, None, "Think".into(), None);
        assert!(s.as_history_line().contains("TARGET: none"));
    }

    #[test]
    fn test_snapshot_serde_round_trip() {
        let mut ctx = TaskContext::new("t", "project", "m").with_history(vec![Message::user("hi")]);
        ctx.record_step(step(1));
        ctx.files_created.push("pom.xml".to_string());
        ctx.pause(PauseReason::LowBalance, 2);

        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"low_balance\""));

        let back: TaskContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back.session_id, ctx.session_id);
        assert_eq!(back.paused_at_step, Some(2));
        assert_eq!(back.steps.len(), 1);
        assert_eq!(back.files_created, vec!["pom.xml"]);
        assert_eq!(back.previous_messages.len(), 1);
    }
}
