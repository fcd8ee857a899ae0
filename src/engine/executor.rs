//! 动作执行器
//!
//! 把一条已解析动作变成对文件存储协作方的调用，并维护上下文中的文件清单；
//! 变更前后发出 *ing / *ed 事件对，每次变更输出结构化审计日志（JSON）。
//!
//! delete_file 先 list 往返把路径解析为 id 再按 id 删除，两步之间没有并发防护：
//! 中途发生改名会让这次删除静默落空（既有行为，保持不变）。

use std::sync::Arc;
use std::time::Instant;

use crate::engine::{Action, EventSink, ParsedAction, TaskContext, TaskEvent};
use crate::project::{ProjectStore, StoreError};

/// 取路径的文件名部分（'/' 与 '\\' 皆作分隔符）
pub(crate) fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// 动作执行器：持有文件存储协作方
pub struct ActionExecutor {
    store: Arc<dyn ProjectStore>,
}

impl ActionExecutor {
    pub fn new(store: Arc<dyn ProjectStore>) -> Self {
        Self { store }
    }

    /// 应用一条动作。create/update 缺少 target 或 content、delete 找不到路径时静默跳过。
    pub async fn apply(
        &self,
        parsed: &ParsedAction,
        ctx: &mut TaskContext,
        events: &EventSink<'_>,
    ) -> Result<(), StoreError> {
        match parsed.action {
            Action::CreateFile => self.write_file(parsed, ctx, events, true).await,
            Action::UpdateFile => self.write_file(parsed, ctx, events, false).await,
            Action::DeleteFile => self.delete_file(parsed, ctx, events).await,
            Action::Plan | Action::Analyze => Ok(()),
            Action::Complete => {
                ctx.mark_complete();
                Ok(())
            }
        }
    }

    async fn write_file(
        &self,
        parsed: &ParsedAction,
        ctx: &mut TaskContext,
        events: &EventSink<'_>,
        creating: bool,
    ) -> Result<(), StoreError> {
        let (Some(target), Some(content)) = (&parsed.target, &parsed.content) else {
            tracing::debug!(
                action = %parsed.action,
                "missing target or content, action skipped"
            );
            return Ok(());
        };

        events.emit(if creating {
            TaskEvent::FileCreating {
                path: target.clone(),
            }
        } else {
            TaskEvent::FileUpdating {
                path: target.clone(),
            }
        });

        let start = Instant::now();
        let result = self.store.upsert(target, content).await;
        self.audit(parsed.action, target, result.is_ok(), start);
        result?;

        let name = base_name(target).to_string();
        if creating {
            ctx.files_created.push(name);
            events.emit(TaskEvent::FileCreated {
                path: target.clone(),
            });
        } else {
            ctx.files_updated.push(name);
            events.emit(TaskEvent::FileUpdated {
                path: target.clone(),
            });
        }
        Ok(())
    }

    async fn delete_file(
        &self,
        parsed: &ParsedAction,
        ctx: &mut TaskContext,
        events: &EventSink<'_>,
    ) -> Result<(), StoreError> {
        let Some(target) = &parsed.target else {
            tracing::debug!("delete_file without target, action skipped");
            return Ok(());
        };

        // 路径 -> id 解析往返
        let files = self.store.list().await?;
        let Some(found) = files.into_iter().find(|f| f.path == *target) else {
            tracing::debug!(path = %target, "delete target not found, action skipped");
            return Ok(());
        };

        events.emit(TaskEvent::FileDeleting {
            path: target.clone(),
        });

        let start = Instant::now();
        let result = self.store.delete(&found.id).await;
        self.audit(parsed.action, target, result.is_ok(), start);
        result?;

        ctx.files_deleted.push(base_name(target).to_string());
        events.emit(TaskEvent::FileDeleted {
            path: target.clone(),
        });
        Ok(())
    }

    fn audit(&self, action: Action, target: &str, ok: bool, start: Instant) {
        let audit = serde_json::json!({
            "event": "action_audit",
            "action": action.as_str(),
            "target": target,
            "ok": ok,
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        tracing::info!(audit = %audit.to_string(), "action");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::event_channel;
    use crate::project::MemoryStore;

    fn parsed(action: Action, target: Option<&str>, content: Option<&str>) -> ParsedAction {
        ParsedAction {
            action,
            target: target.map(String::from),
            reasoning: "test".to_string(),
            content: content.map(String::from),
        }
    }

    fn context() -> TaskContext {
        TaskContext::new("task", "project", "model")
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("pom.xml"), "pom.xml");
        assert_eq!(base_name("src/main/App.java"), "App.java");
        assert_eq!(base_name("src\\win\\App.java"), "App.java");
    }

    #[tokio::test]
    async fn test_create_writes_and_tracks_base_name() {
        let store = Arc::new(MemoryStore::new());
        let executor = ActionExecutor::new(store.clone());
        let mut ctx = context();
        let (tx, mut events) = event_channel();
        let sink = EventSink::new(Some(&tx), None);

        executor
            .apply(
                &parsed(Action::CreateFile, Some("src/Main.java"), Some("class Main {}")),
                &mut ctx,
                &sink,
            )
            .await
            .unwrap();

        assert_eq!(ctx.files_created, vec!["Main.java"]);
        assert_eq!(
            store.content_of("src/Main.java").await,
            Some("class Main {}".to_string())
        );

        let emitted = events.drain();
        assert!(matches!(&emitted[0], TaskEvent::FileCreating { path } if path == "src/Main.java"));
        assert!(matches!(&emitted[1], TaskEvent::FileCreated { path } if path == "src/Main.java"));
    }

    #[tokio::test]
    async fn test_create_without_content_is_silent_noop() {
        let store = Arc::new(MemoryStore::new());
        let executor = ActionExecutor::new(store.clone());
        let mut ctx = context();
        let (tx, mut events) = event_channel();
        let sink = EventSink::new(Some(&tx), None);

        executor
            .apply(&parsed(Action::CreateFile, Some("a.txt"), None), &mut ctx, &sink)
            .await
            .unwrap();
        executor
            .apply(&parsed(Action::UpdateFile, None, Some("body")), &mut ctx, &sink)
            .await
            .unwrap();

        assert!(ctx.files_created.is_empty());
        assert!(ctx.files_updated.is_empty());
        assert!(store.is_empty().await);
        assert!(events.drain().is_empty());
    }

    #[tokio::test]
    async fn test_update_tracks_separately() {
        let store = Arc::new(MemoryStore::new());
        let executor = ActionExecutor::new(store.clone());
        let mut ctx = context();
        let sink = EventSink::new(None, None);

        executor
            .apply(
                &parsed(Action::CreateFile, Some("app.js"), Some("v1")),
                &mut ctx,
                &sink,
            )
            .await
            .unwrap();
        executor
            .apply(
                &parsed(Action::UpdateFile, Some("app.js"), Some("v2")),
                &mut ctx,
                &sink,
            )
            .await
            .unwrap();

        assert_eq!(ctx.files_created, vec!["app.js"]);
        assert_eq!(ctx.files_updated, vec!["app.js"]);
        assert_eq!(store.content_of("app.js").await, Some("v2".to_string()));
    }

    #[tokio::test]
    async fn test_delete_resolves_path_to_id() {
        let store = Arc::new(MemoryStore::new());
        store.upsert("src/old.js", "x").await.unwrap();
        let executor = ActionExecutor::new(store.clone());
        let mut ctx = context();
        let (tx, mut events) = event_channel();
        let sink = EventSink::new(Some(&tx), None);

        executor
            .apply(&parsed(Action::DeleteFile, Some("src/old.js"), None), &mut ctx, &sink)
            .await
            .unwrap();

        assert!(store.is_empty().await);
        assert_eq!(ctx.files_deleted, vec!["old.js"]);
        let emitted = events.drain();
        assert!(matches!(&emitted[0], TaskEvent::FileDeleting { .. }));
        assert!(matches!(&emitted[1], TaskEvent::FileDeleted { .. }));
    }

    #[tokio::test]
    async fn test_delete_unknown_path_is_silent_noop() {
        let store = Arc::new(MemoryStore::new());
        store.upsert("keep.txt", "x").await.unwrap();
        let executor = ActionExecutor::new(store.clone());
        let mut ctx = context();
        let (tx, mut events) = event_channel();
        let sink = EventSink::new(Some(&tx), None);

        executor
            .apply(&parsed(Action::DeleteFile, Some("missing.txt"), None), &mut ctx, &sink)
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        assert!(ctx.files_deleted.is_empty());
        assert!(events.drain().is_empty());
    }

    #[tokio::test]
    async fn test_complete_marks_context() {
        let executor = ActionExecutor::new(Arc::new(MemoryStore::new()));
        let mut ctx = context();
        let sink = EventSink::new(None, None);

        executor
            .apply(&parsed(Action::Complete, None, None), &mut ctx, &sink)
            .await
            .unwrap();
        assert!(ctx.is_complete);
    }

    #[tokio::test]
    async fn test_plan_and_analyze_have_no_side_effects() {
        let store = Arc::new(MemoryStore::new());
        let executor = ActionExecutor::new(store.clone());
        let mut ctx = context();
        let sink = EventSink::new(None, None);

        executor
            .apply(&parsed(Action::Plan, Some("x.txt"), Some("ignored")), &mut ctx, &sink)
            .await
            .unwrap();
        executor
            .apply(&parsed(Action::Analyze, None, None), &mut ctx, &sink)
            .await
            .unwrap();

        assert!(store.is_empty().await);
        assert!(!ctx.is_complete);
        assert!(ctx.files_created.is_empty());
    }
}
