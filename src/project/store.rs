//! 工程文件存储抽象
//!
//! 循环通过 upsert / list / delete 三个调用改动工程文件集；删除按 id 进行，
//! id 由 list 往返解析得到（见 ActionExecutor）。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 存储中的一个文件条目：稳定 id + 工程内相对路径
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub id: String,
    pub path: String,
}

/// 存储错误（IO、路径逃逸、后端自身）
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Path escape attempt: {0}")]
    PathEscape(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// 文件变更协作方：创建/覆盖、列举、按 id 删除
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// 写入文件内容，路径不存在则创建（含父目录）
    async fn upsert(&self, path: &str, content: &str) -> Result<(), StoreError>;

    /// 列出全部文件（有序）
    async fn list(&self) -> Result<Vec<ProjectFile>, StoreError>;

    /// 按 id 删除
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
