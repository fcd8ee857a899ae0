//! 提示词构造
//!
//! PromptBuilder 是循环眼中的黑盒协作方：给定会话、模式、步号与已触碰文件清单，
//! 产出这一步的 system 提示词。默认实现 TemplatePromptBuilder 用占位符模板，
//! 模板优先从 config/prompts/builder.txt 读取，缺失时回退内置文本。

/// 提示词构造协作方：引擎不解释产出内容
pub trait PromptBuilder: Send + Sync {
    fn build(
        &self,
        session_id: &str,
        mode: &str,
        step_number: u32,
        files_created: &[String],
        files_updated: &[String],
    ) -> String;
}

/// 内置模板：教模型用 ACTION / TARGET / REASONING / `---` 的回复格式
const BUILTIN_TEMPLATE: &str = "\
You are an autonomous code builder working on session {session_id} in {mode} mode.
This is step {step} of the build.
Files created so far: {files_created}
Files updated so far: {files_updated}

Reply with exactly one action per step, in this format:
ACTION: one of plan, create_file, update_file, delete_file, analyze, complete
TARGET: the file path, or none
REASONING: one short sentence explaining the step
---
(the full file content, only for create_file and update_file)

When the task is finished, reply with ACTION: complete and summarize the work in REASONING.";

/// 模板实现：{session_id} {mode} {step} {files_created} {files_updated} 占位符替换
pub struct TemplatePromptBuilder {
    template: String,
}

impl TemplatePromptBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// 从 config/prompts/builder.txt 加载模板，缺失时用内置文本
    pub fn from_file_or_builtin() -> Self {
        let template = [
            "config/prompts/builder.txt",
            "../config/prompts/builder.txt",
        ]
        .into_iter()
        .find_map(|p| std::fs::read_to_string(p).ok())
        .unwrap_or_else(|| BUILTIN_TEMPLATE.to_string());
        Self { template }
    }
}

impl Default for TemplatePromptBuilder {
    fn default() -> Self {
        Self::new(BUILTIN_TEMPLATE)
    }
}

fn join_names(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

impl PromptBuilder for TemplatePromptBuilder {
    fn build(
        &self,
        session_id: &str,
        mode: &str,
        step_number: u32,
        files_created: &[String],
        files_updated: &[String],
    ) -> String {
        self.template
            .replace("{session_id}", session_id)
            .replace("{mode}", mode)
            .replace("{step}", &step_number.to_string())
            .replace("{files_created}", &join_names(files_created))
            .replace("{files_updated}", &join_names(files_updated))
    }
}
