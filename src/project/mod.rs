//! 工程文件层：文件变更协作方抽象与实现（沙箱目录 / 内存）

pub mod local;
pub mod memory;
pub mod store;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use store::{ProjectFile, ProjectStore, StoreError};
