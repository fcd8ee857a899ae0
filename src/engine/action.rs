//! 动作集合
//!
//! 模型每步只能请求封闭集合中的一个动作；无法识别的取值由调用方归一为 plan。

use serde::{Deserialize, Serialize};

/// 每步动作（封闭集合，序列化为 snake_case）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Plan,
    CreateFile,
    UpdateFile,
    DeleteFile,
    Analyze,
    Complete,
}

impl Action {
    /// 解析动作词（已小写）；未知词返回 None，由调用方回退 plan
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "plan" => Some(Self::Plan),
            "create_file" => Some(Self::CreateFile),
            "update_file" => Some(Self::UpdateFile),
            "delete_file" => Some(Self::DeleteFile),
            "analyze" => Some(Self::Analyze),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::CreateFile => "create_file",
            Self::UpdateFile => "update_file",
            Self::DeleteFile => "delete_file",
            Self::Analyze => "analyze",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
