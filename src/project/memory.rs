//! 内存存储
//!
//! 按插入顺序保存文件，id 为合成的 file_N；供测试与无工作目录的演示运行使用。

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::project::{ProjectFile, ProjectStore, StoreError};

#[derive(Debug, Clone)]
struct StoredFile {
    id: String,
    path: String,
    content: String,
}

/// 内存实现：Vec 保序，路径重复时原地覆盖内容（id 不变）
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<Vec<StoredFile>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取某路径的当前内容（测试断言用）
    pub async fn content_of(&self, path: &str) -> Option<String> {
        self.entries
            .read()
            .await
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.content.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn upsert(&self, path: &str, content: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.iter_mut().find(|f| f.path == path) {
            existing.content = content.to_string();
            return Ok(());
        }
        let id = format!("file_{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        entries.push(StoredFile {
            id,
            path: path.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ProjectFile>, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .map(|f| ProjectFile {
                id: f.id.clone(),
                path: f.path.clone(),
            })
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.entries.write().await.retain(|f| f.id != id);
        Ok(())
    }
}
