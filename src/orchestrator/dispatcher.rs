//! 批量调度器 - 编排层
//!
//! ## 职责
//!
//! 对一次目录快照中的所有文件执行处理任务。
//!
//! ## 两种模式
//!
//! - **Unbounded**：每个文件一个并发任务，全部启动后等待完成
//! - **Bounded**：使用 Semaphore 限制同时运行的任务数，其余文件排队等待空位
//!
//! ## 设计特点
//!
//! - 目录列表只取一次快照，批次进行中不重新扫描
//! - 单个任务失败（包括 panic）只计入统计，不会中止整个批次
//! - Bounded 模式接受取消信号：停止调度新任务，已在运行的任务不受影响

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::IngestionError;
use crate::utils::logging::file_label;
use crate::workflow::{FileProcessor, JobOutcome};

/// 输入文件扩展名
pub const INPUT_EXTENSION: &str = "xml";

/// 调度模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// 不限并发
    Unbounded,
    /// 最多同时运行 `max_workers` 个任务
    Bounded { max_workers: usize },
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchMode::Unbounded => write!(f, "不限并发"),
            DispatchMode::Bounded { max_workers } => write!(f, "最大并发 {}", max_workers),
        }
    }
}

/// 批次统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// 已被其他任务认领或已不存在
    pub skipped: usize,
    /// 取消后未调度的文件
    pub not_scheduled: usize,
}

impl BatchStats {
    fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Completed(_) => self.completed += 1,
            JobOutcome::Failed(_) => self.failed += 1,
            JobOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// 批量调度器
#[derive(Clone)]
pub struct Dispatcher {
    processor: Arc<FileProcessor>,
    mode: DispatchMode,
}

impl Dispatcher {
    pub fn new(processor: Arc<FileProcessor>, mode: DispatchMode) -> Self {
        Self { processor, mode }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// 处理一批文件
    ///
    /// # 参数
    /// - `files`: 目录快照
    /// - `cancel`: 取消信号（仅 Bounded 模式生效）
    ///
    /// # 返回
    /// 批次统计，所有已调度的任务都结束后才返回
    pub async fn dispatch(&self, files: Vec<PathBuf>, cancel: &CancellationToken) -> BatchStats {
        let total = files.len();
        let mut stats = match self.mode {
            DispatchMode::Unbounded => self.dispatch_unbounded(files).await,
            DispatchMode::Bounded { max_workers } => self.dispatch_bounded(files, max_workers, cancel).await,
        };
        stats.total = total;
        stats
    }

    async fn dispatch_unbounded(&self, files: Vec<PathBuf>) -> BatchStats {
        let (paths, handles): (Vec<PathBuf>, Vec<JoinHandle<JobOutcome>>) = files
            .into_iter()
            .map(|file| {
                let handle = self.spawn_job(file.clone(), None);
                (file, handle)
            })
            .unzip();

        let results = join_all(handles).await;

        let mut stats = BatchStats::default();
        for (file, result) in paths.iter().zip(results) {
            tally(&mut stats, file, result);
        }
        stats
    }

    async fn dispatch_bounded(
        &self,
        files: Vec<PathBuf>,
        max_workers: usize,
        cancel: &CancellationToken,
    ) -> BatchStats {
        let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
        let mut stats = BatchStats::default();
        let mut handles = Vec::with_capacity(files.len());
        let mut pending = files.into_iter();

        while let Some(file) = pending.next() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                stats.not_scheduled += 1;
                break;
            };

            let handle = self.spawn_job(file.clone(), Some(permit));
            handles.push((file, handle));
        }

        let remaining = pending.count();
        if stats.not_scheduled > 0 {
            stats.not_scheduled += remaining;
            warn!("⚠️ 收到取消信号，{} 个文件未调度", stats.not_scheduled);
        }

        for (file, handle) in handles {
            tally(&mut stats, &file, handle.await);
        }
        stats
    }

    fn spawn_job(&self, file: PathBuf, permit: Option<OwnedSemaphorePermit>) -> JoinHandle<JobOutcome> {
        let processor = Arc::clone(&self.processor);
        tokio::spawn(async move {
            let _permit = permit;
            processor.run(&file).await
        })
    }
}

fn tally(stats: &mut BatchStats, file: &Path, result: Result<JobOutcome, tokio::task::JoinError>) {
    match result {
        Ok(outcome) => stats.record(&outcome),
        Err(e) => {
            error!("[文件 {}] 任务执行失败: {}", file_label(file), e);
            stats.failed += 1;
        }
    }
}

/// 是否为待处理的输入文件（扩展名不区分大小写）
pub fn is_input_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(INPUT_EXTENSION))
}

/// 扫描输入目录，返回按路径排序的文件快照
pub async fn scan_input_folder(folder: &Path) -> Result<Vec<PathBuf>, IngestionError> {
    info!("📁 正在扫描待处理的文件: {}", folder.display());

    let scan_err = |source| IngestionError::Scan {
        path: folder.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(folder).await.map_err(scan_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(scan_err)? {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file && is_input_file(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
