//! Mason - 无头构建器入口
//!
//! `mason <任务文本>` 启动新任务；`mason --resume <snapshot.json>` 从暂停快照继续。
//! 事件以 JSON 行打印到 stdout；暂停时把上下文写到 `<sessionId>.paused.json`。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use futures_util::StreamExt;

use mason::config::{load_config, AppConfig};
use mason::engine::{event_channel, ActionExecutor, BuildLoop, RunOutcome, RunSession, TaskContext};
use mason::llm::create_chat_client;
use mason::project::{LocalStore, MemoryStore, ProjectStore};
use mason::prompt::TemplatePromptBuilder;
use mason::supervisor::TaskSupervisor;
use mason::observability;

enum Invocation {
    NewTask(String),
    Resume(PathBuf),
}

fn parse_args() -> anyhow::Result<Invocation> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("--resume") => {
            let path = args
                .get(1)
                .context("--resume requires a snapshot path, e.g. mason --resume task_x.paused.json")?;
            Ok(Invocation::Resume(PathBuf::from(path)))
        }
        Some(_) => Ok(Invocation::NewTask(args.join(" "))),
        None => anyhow::bail!("usage: mason <task text> | mason --resume <snapshot.json>"),
    }
}

/// 工程文件存储：配置了沙箱目录或有 API Key 时落盘，否则纯内存演示
fn create_store(cfg: &AppConfig) -> Arc<dyn ProjectStore> {
    let has_key =
        std::env::var("DEEPSEEK_API_KEY").is_ok() || std::env::var("OPENAI_API_KEY").is_ok();
    match (&cfg.app.workspace_root, has_key) {
        (Some(root), _) => {
            let _ = std::fs::create_dir_all(root);
            tracing::info!(root = %root.display(), "using local project store");
            Arc::new(LocalStore::new(root))
        }
        (None, true) => {
            let _ = std::fs::create_dir_all("workspace");
            tracing::info!("using local project store at ./workspace");
            Arc::new(LocalStore::new("workspace"))
        }
        (None, false) => {
            tracing::info!("no workspace configured and no API key, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let invocation = parse_args()?;
    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config load failed, using defaults");
        AppConfig::default()
    });

    let chat = create_chat_client(&cfg);
    let store = create_store(&cfg);
    let prompts = Arc::new(TemplatePromptBuilder::from_file_or_builtin());
    let engine = BuildLoop::new(
        chat,
        ActionExecutor::new(store),
        prompts,
        cfg.builder.loop_options(),
    );

    let mut ctx = match invocation {
        Invocation::NewTask(task) => {
            TaskContext::new(task, cfg.builder.mode.clone(), cfg.llm.model.clone())
        }
        Invocation::Resume(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
            let ctx: TaskContext = serde_json::from_str(&json)
                .with_context(|| format!("Malformed snapshot {}", path.display()))?;
            tracing::info!(
                session_id = %ctx.session_id,
                paused_at_step = ?ctx.paused_at_step,
                "resuming from snapshot"
            );
            ctx
        }
    };

    // Ctrl+C -> 根令牌取消，循环在下一个轮询点退出
    let supervisor = Arc::new(TaskSupervisor::new());
    {
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl+C received, cancelling");
                supervisor.cancel();
            }
        });
    }

    // 拉取流消费端：每个事件一行 JSON
    let (tx, mut events) = event_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::error!(error = %e, "failed to serialize event"),
            }
        }
    });

    let on_pause = |snapshot: &TaskContext| {
        let path = format!("{}.paused.json", snapshot.session_id);
        match serde_json::to_string_pretty(snapshot) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    tracing::error!(path = %path, error = %e, "failed to write pause snapshot");
                } else {
                    tracing::info!(path = %path, "pause snapshot written, resume with --resume");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize pause snapshot"),
        }
    };

    let outcome = {
        let session = RunSession::new(supervisor.child_token())
            .with_event_tx(&tx)
            .with_pause_callback(&on_pause);
        engine.run(&session, &mut ctx).await
    };
    drop(tx);
    printer.await.ok();

    match outcome {
        RunOutcome::Completed => tracing::info!(
            steps = ctx.steps.len(),
            created = ?ctx.files_created,
            updated = ?ctx.files_updated,
            deleted = ?ctx.files_deleted,
            "task completed"
        ),
        RunOutcome::BudgetExhausted => tracing::info!(
            steps = ctx.steps.len(),
            created = ?ctx.files_created,
            "step budget exhausted"
        ),
        RunOutcome::Paused => tracing::info!(
            session_id = %ctx.session_id,
            paused_at_step = ?ctx.paused_at_step,
            "task paused"
        ),
        RunOutcome::Cancelled => tracing::info!("task cancelled"),
    }

    Ok(())
}
