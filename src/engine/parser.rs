//! 响应解析器
//!
//! 纯函数：模型自由文本 -> 结构化动作。逐行匹配 ACTION: / TARGET: / REASONING:（重复时最后一次生效），
//! `---` 独立行之后为文件内容；结构化解析仍是 plan 时尝试遗留标记块回退（create -> update -> delete）。
//! 永不报错：任何畸形输入都退化为安全的 plan。

use std::sync::OnceLock;

use regex::Regex;

use crate::engine::Action;

/// 解析结果：动作 + 可选目标路径 + 理由 + 可选文件内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAction {
    pub action: Action,
    pub target: Option<String>,
    pub reasoning: String,
    pub content: Option<String>,
}

fn create_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<<<CREATE_FILE:\s*([^>\r\n]+?)\s*>>>(.*?)<<<END_FILE>>>").unwrap()
    })
}

fn update_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<<<UPDATE_FILE:\s*([^>\r\n]+?)\s*>>>(.*?)<<<END_FILE>>>").unwrap()
    })
}

fn delete_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<<<DELETE_FILE:\s*([^>\r\n]+?)\s*>>>").unwrap())
}

/// 遗留标记块的提取结果
struct LegacyBlock {
    action: Action,
    target: String,
    content: Option<String>,
    start: usize,
}

fn find_legacy_block(text: &str) -> Option<LegacyBlock> {
    // 按 create -> update -> delete 的类型顺序尝试，命中即止
    if let Some(caps) = create_block_re().captures(text) {
        let whole = caps.get(0)?;
        return Some(LegacyBlock {
            action: Action::CreateFile,
            target: caps.get(1)?.as_str().trim().to_string(),
            content: Some(caps.get(2)?.as_str().trim().to_string()),
            start: whole.start(),
        });
    }
    if let Some(caps) = update_block_re().captures(text) {
        let whole = caps.get(0)?;
        return Some(LegacyBlock {
            action: Action::UpdateFile,
            target: caps.get(1)?.as_str().trim().to_string(),
            content: Some(caps.get(2)?.as_str().trim().to_string()),
            start: whole.start(),
        });
    }
    if let Some(caps) = delete_marker_re().captures(text) {
        let whole = caps.get(0)?;
        return Some(LegacyBlock {
            action: Action::DeleteFile,
            target: caps.get(1)?.as_str().trim().to_string(),
            content: None,
            start: whole.start(),
        });
    }
    None
}

/// `---` 独立行之后的全部文本（去首尾空白）；无分隔行或剩余为空则无内容
fn content_after_separator(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let idx = lines.iter().position(|l| l.trim() == "---")?;
    let content = lines[idx + 1..].join("\n");
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// 解析一条模型完成文本。总是返回一个值，畸形输入退化为 plan。
pub fn parse_response(text: &str) -> ParsedAction {
    let mut action_raw: Option<&str> = None;
    let mut target_raw: Option<&str> = None;
    let mut reasoning_raw: Option<&str> = None;

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("ACTION:") {
            action_raw = Some(rest.trim());
        } else if let Some(rest) = line.strip_prefix("TARGET:") {
            target_raw = Some(rest.trim());
        } else if let Some(rest) = line.strip_prefix("REASONING:") {
            reasoning_raw = Some(rest.trim());
        }
    }

    let action = action_raw
        .map(str::to_lowercase)
        .and_then(|v| Action::parse(&v))
        .unwrap_or(Action::Plan);

    let target = target_raw
        .filter(|v| !v.is_empty() && *v != "none")
        .map(String::from);

    let reasoning = reasoning_raw.unwrap_or("").to_string();
    let content = content_after_separator(text);

    // 回退：结构化动作仍是 plan 时，尝试遗留标记块并整体覆盖
    if action == Action::Plan {
        if let Some(block) = find_legacy_block(text) {
            let preceding = text[..block.start].trim();
            let reasoning = if preceding.is_empty() {
                reasoning
            } else {
                preceding.to_string()
            };
            return ParsedAction {
                action: block.action,
                target: Some(block.target),
                reasoning,
                content: block.content,
            };
        }
    }

    ParsedAction {
        action,
        target,
        reasoning,
        content,
    }
}
