//! 任务过程事件：构建循环对外的唯一进度边界
//!
//! 封闭和类型（序列化为 {"type": ..., ...}），统一经 EventSink 发出：
//! 同步回调与拉取流看到相同顺序的相同事件。

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::engine::{Action, PauseReason};

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// 模型开始工作（运行启动时，以及 analyze 动作）
    Thinking,
    /// plan 动作：本步的规划理由
    Planning { reasoning: String },
    /// 文件写入前后
    FileCreating { path: String },
    FileCreated { path: String },
    FileUpdating { path: String },
    FileUpdated { path: String },
    /// 文件删除前后
    FileDeleting { path: String },
    FileDeleted { path: String },
    /// 一步收尾
    StepComplete { step: u32, action: Action },
    /// 冷却倒计时（剩余整秒数，严格递减到 1）
    Cooldown { remaining: u64 },
    /// 配额耗尽，需要调用方补充凭据
    AuthRequired,
    /// 任务已暂停（可恢复）
    Paused { step: u32, reason: PauseReason },
    /// 错误；recoverable=false 表示终止
    Error { message: String, recoverable: bool },
    /// 终止：任务完成或步数预算耗尽
    Complete {
        summary: String,
        files_created: Vec<String>,
        files_updated: Vec<String>,
        files_deleted: Vec<String>,
    },
}

/// 事件出口：单一发出点，先喂回调再入通道，保证双视图顺序一致
pub struct EventSink<'a> {
    tx: Option<&'a mpsc::UnboundedSender<TaskEvent>>,
    callback: Option<&'a (dyn Fn(&TaskEvent) + Send + Sync)>,
}

impl<'a> EventSink<'a> {
    pub fn new(
        tx: Option<&'a mpsc::UnboundedSender<TaskEvent>>,
        callback: Option<&'a (dyn Fn(&TaskEvent) + Send + Sync)>,
    ) -> Self {
        Self { tx, callback }
    }

    pub fn emit(&self, event: TaskEvent) {
        if let Some(cb) = self.callback {
            cb(&event);
        }
        if let Some(tx) = self.tx {
            let _ = tx.send(event);
        }
    }
}

/// 事件拉取视图：包装通道接收端，实现 Stream 供 next().await 消费
pub struct TaskEvents {
    rx: mpsc::UnboundedReceiver<TaskEvent>,
}

impl TaskEvents {
    pub async fn recv(&mut self) -> Option<TaskEvent> {
        self.rx.recv().await
    }

    /// 非阻塞取一条（循环返回后排空队列用）
    pub fn try_recv(&mut self) -> Option<TaskEvent> {
        self.rx.try_recv().ok()
    }

    /// 排空当前已缓冲的全部事件
    pub fn drain(&mut self) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        while let Some(ev) = self.try_recv() {
            events.push(ev);
        }
        events
    }
}

impl Stream for TaskEvents {
    type Item = TaskEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<TaskEvent>> {
        self.rx.poll_recv(cx)
    }
}

/// 建立事件通道：发送端交给 RunSession，接收端留给消费者
pub fn event_channel() -> (mpsc::UnboundedSender<TaskEvent>, TaskEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, TaskEvents { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_string(&TaskEvent::FileCreating {
            path: "pom.xml".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"file_creating","path":"pom.xml"}"#);

        let json = serde_json::to_string(&TaskEvent::StepComplete {
            step: 2,
            action: Action::CreateFile,
        })
        .unwrap();
        assert!(json.contains(r#""type":"step_complete""#));
        assert!(json.contains(r#""action":"create_file""#));
    }

    #[test]
    fn test_paused_event_snake_case_reason() {
        let json = serde_json::to_string(&TaskEvent::Paused {
            step: 2,
            reason: PauseReason::LowBalance,
        })
        .unwrap();
        assert!(json.contains(r#""reason":"low_balance""#));
    }

    #[test]
    fn test_sink_feeds_both_views_in_order() {
        let (tx, mut events) = event_channel();
        let seen: Mutex<Vec<String>> = Mutex::new(Vec::new());
        let callback = |ev: &TaskEvent| {
            if let TaskEvent::Cooldown { remaining } = ev {
                seen.lock().unwrap().push(format!("cb:{}", remaining));
            }
        };

        let sink = EventSink::new(Some(&tx), Some(&callback));
        sink.emit(TaskEvent::Cooldown { remaining: 2 });
        sink.emit(TaskEvent::Cooldown { remaining: 1 });

        let pulled: Vec<u64> = events
            .drain()
            .into_iter()
            .map(|ev| match ev {
                TaskEvent::Cooldown { remaining } => remaining,
                other => panic!("unexpected event: {:?}", other),
            })
            .collect();
        assert_eq!(pulled, vec![2, 1]);
        assert_eq!(*seen.lock().unwrap(), vec!["cb:2", "cb:1"]);
    }

    #[test]
    fn test_sink_without_consumers_is_noop() {
        let sink = EventSink::new(None, None);
        sink.emit(TaskEvent::Thinking);
    }
}
