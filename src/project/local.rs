//! 沙箱目录存储
//!
//! LocalStore 绑定 root_dir，所有路径必须是根下的相对路径（禁止绝对路径与 ../ 逃逸）；
//! list 递归列举（跳过隐藏项），id 即相对路径（'/' 分隔）。

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use crate::project::{ProjectFile, ProjectStore, StoreError};

/// 目录存储：绑定根目录，写入前校验路径在根下，防止路径逃逸
#[derive(Debug, Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        let root = root_dir.as_ref().to_path_buf();
        let root_dir = root.canonicalize().unwrap_or(root);
        Self { root_dir }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// 校验相对路径并拼到根下：拒绝绝对路径、盘符与任何 .. 组件
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let path = path.trim().trim_start_matches("./");
        if path.is_empty() {
            return Err(StoreError::Backend("empty path".to_string()));
        }
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                // 如 ../../etc/passwd 或 /etc/passwd
                _ => return Err(StoreError::PathEscape(path.to_string())),
            }
        }
        Ok(self.root_dir.join(relative))
    }
}

#[async_trait]
impl ProjectStore for LocalStore {
    async fn upsert(&self, path: &str, content: &str) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        std::fs::write(&full, content).map_err(|e| StoreError::Io(e.to_string()))?;
        tracing::debug!(path = %path, bytes = content.len(), "local store upsert");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ProjectFile>, StoreError> {
        let mut files = Vec::new();
        // filter_entry 在目录层剪枝：隐藏目录连同其内容一并跳过
        let walker = WalkDir::new(&self.root_dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'));
        for entry in walker {
            let entry = entry.map_err(|e| StoreError::Io(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root_dir)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            let path = relative.to_string_lossy().replace('\\', "/");
            files.push(ProjectFile {
                id: path.clone(),
                path,
            });
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let full = self.resolve(id)?;
        std::fs::remove_file(&full).map_err(|e| StoreError::Io(e.to_string()))?;
        tracing::debug!(id = %id, "local store delete");
        Ok(())
    }
}
