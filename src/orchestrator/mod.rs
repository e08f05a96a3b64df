//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责发现文件和调度任务，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `dispatcher` - 批量调度器
//! - 扫描输入目录得到文件快照
//! - Unbounded / Bounded 两种并发模式（Semaphore）
//! - 取消信号只停止调度新任务
//! - 汇总批次统计
//!
//! ### `ingestion` - 目录监听器
//! - 管理监听生命周期（Stopped / Watching）
//! - 启动时处理积压文件
//! - 新到达的文件各自启动一个任务
//!
//! ## 层次关系
//!
//! ```text
//! ingestion (监听 + 积压)
//!     ↓
//! dispatcher (处理 Vec<PathBuf>)
//!     ↓
//! workflow::FileProcessor (处理单个文件)
//!     ↓
//! engine (纯计算) / infrastructure (编解码)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：dispatcher 管批量，ingestion 管生命周期
//! 2. **故障隔离**：单个文件的错误在任务边界处理，不会到达本层
//! 3. **无业务逻辑**：只做调度和统计，不做具体计算

pub mod dispatcher;
pub mod ingestion;

// 重新导出主要类型
pub use dispatcher::{scan_input_folder, BatchStats, DispatchMode, Dispatcher};
pub use ingestion::{IngestionController, WatchState};
