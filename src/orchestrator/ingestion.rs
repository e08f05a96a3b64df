//! 目录监听器 - 编排层
//!
//! ## 职责
//!
//! 持有输入目录，负责生命周期（start / stop）：
//!
//! 1. **注册监听**：先注册新文件回调，保证启动期间到达的文件不会漏掉
//! 2. **积压处理**：对启动时已存在的文件执行一次批量调度
//! 3. **实时处理**：每个到达的文件独立启动一个处理任务
//!
//! ## 到达判定
//!
//! 直接写入目录的文件在创建时还是空的，不能以创建事件作为到达信号：
//! - Linux：以写入后关闭（`IN_CLOSE_WRITE`）作为到达信号
//! - 其他平台：没有关闭事件，以创建 / 写入事件作为信号
//! - 移入目录（重命名）的文件内容已完整，任何平台都直接视为到达
//!
//! 同一文件的信号在静默期（`arrival_delay_ms`）内合并，
//! 最后一个信号之后静默期结束才启动任务。
//!
//! ## 去重
//!
//! 积压扫描和实时事件可能同时发现同一个文件。
//! 处理器按解析后的路径认领文件，已在处理或已归档的文件会被跳过，
//! 因此无论从哪条路径发现，每个文件只处理一次。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[cfg(target_os = "linux")]
use notify::event::{AccessKind, AccessMode};
#[cfg(not(target_os = "linux"))]
use notify::event::CreateKind;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::IngestionError;
use crate::orchestrator::dispatcher::{is_input_file, scan_input_folder, BatchStats, DispatchMode, Dispatcher};
use crate::utils::logging::file_label;
use crate::workflow::FileProcessor;

/// 监听状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Stopped,
    Watching,
}

/// 目录监听器
pub struct IngestionController {
    processor: Arc<FileProcessor>,
    input_folder: PathBuf,
    mode: DispatchMode,
    arrival_delay: Duration,
    watcher: Option<RecommendedWatcher>,
    forwarder: Option<JoinHandle<()>>,
}

impl IngestionController {
    pub fn new(processor: Arc<FileProcessor>, config: &Config) -> Self {
        Self {
            processor,
            input_folder: config.input_folder.clone(),
            mode: config.dispatch_mode(),
            arrival_delay: Duration::from_millis(config.arrival_delay_ms),
            watcher: None,
            forwarder: None,
        }
    }

    /// 覆盖积压处理的调度模式
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn state(&self) -> WatchState {
        if self.watcher.is_some() {
            WatchState::Watching
        } else {
            WatchState::Stopped
        }
    }

    /// Stopped → Watching
    ///
    /// 先注册实时回调，再处理积压文件；积压批次结束后返回，监听继续有效。
    /// 取消信号只影响积压批次的调度，不会停止监听。
    ///
    /// # 返回
    /// 积压批次的统计
    pub async fn start(&mut self, cancel: CancellationToken) -> Result<BatchStats, IngestionError> {
        if self.watcher.is_some() {
            return Err(IngestionError::AlreadyWatching);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in arrived_files(&event) {
                    // 接收端已关闭说明监听器正在停止
                    let _ = tx.send(path);
                }
            }
            Err(e) => warn!("⚠️ 目录监听事件错误: {}", e),
        })?;
        watcher.watch(&self.input_folder, RecursiveMode::NonRecursive)?;

        self.forwarder = Some(tokio::spawn(forward_arrivals(
            rx,
            Arc::clone(&self.processor),
            self.arrival_delay,
        )));
        self.watcher = Some(watcher);
        info!("👀 正在监听目录: {}", self.input_folder.display());

        let files = match scan_input_folder(&self.input_folder).await {
            Ok(files) => files,
            Err(e) => {
                self.stop();
                return Err(e);
            }
        };

        info!("✓ 找到 {} 个积压文件 ({})", files.len(), self.mode);
        let stats = Dispatcher::new(Arc::clone(&self.processor), self.mode)
            .dispatch(files, &cancel)
            .await;
        info!("✓ 积压文件处理结束");

        Ok(stats)
    }

    /// Watching → Stopped，重复调用无副作用
    ///
    /// 已经启动的任务继续运行到结束。
    pub fn stop(&mut self) {
        let was_watching = self.watcher.take().is_some();
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        if was_watching {
            info!("🛑 已停止监听目录: {}", self.input_folder.display());
        }
    }
}

impl Drop for IngestionController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 等待静默期结束的到达文件
///
/// 同一路径再次收到信号时重新计时。
#[derive(Debug)]
struct ArrivalQueue {
    settle: Duration,
    pending: HashMap<PathBuf, Instant>,
}

impl ArrivalQueue {
    fn new(settle: Duration) -> Self {
        Self {
            settle,
            pending: HashMap::new(),
        }
    }

    fn push(&mut self, path: PathBuf, now: Instant) {
        self.pending.insert(path, now + self.settle);
    }

    /// 最早到期的时间
    fn next_due(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// 取出所有已到期的路径
    fn take_due(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut due: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();
        due.sort();

        for path in &due {
            self.pending.remove(path);
        }
        due
    }
}

/// 合并到达信号，静默期结束后为每个文件启动一个处理任务
async fn forward_arrivals(
    mut rx: mpsc::UnboundedReceiver<PathBuf>,
    processor: Arc<FileProcessor>,
    settle: Duration,
) {
    let mut queue = ArrivalQueue::new(settle);

    loop {
        let next_due = queue.next_due();

        tokio::select! {
            received = rx.recv() => match received {
                Some(path) => {
                    debug!("到达信号: {}", file_label(&path));
                    queue.push(path, Instant::now());
                }
                None => break,
            },
            _ = tokio::time::sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                for path in queue.take_due(Instant::now()) {
                    info!("📥 检测到新文件: {}", file_label(&path));
                    let processor = Arc::clone(&processor);
                    tokio::spawn(async move {
                        processor.run(&path).await;
                    });
                }
            }
        }
    }
    debug!("到达事件通道已关闭");
}

/// 已写完或移入目录的输入文件
fn arrived_files(event: &Event) -> Vec<PathBuf> {
    let candidates: &[PathBuf] = match event.kind {
        #[cfg(target_os = "linux")]
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => &event.paths,
        #[cfg(not(target_os = "linux"))]
        EventKind::Create(CreateKind::File | CreateKind::Any) => &event.paths,
        #[cfg(not(target_os = "linux"))]
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => &event.paths,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => &event.paths,
        // [旧路径, 新路径]
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event.paths.get(1..).unwrap_or_default(),
        _ => &[],
    };

    candidates
        .iter()
        .filter(|path| is_input_file(path))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(PathBuf::from(path)))
    }

    #[test]
    fn move_in_is_an_arrival() {
        let moved_in = event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/in/b.XML"]);

        assert_eq!(arrived_files(&moved_in), vec![PathBuf::from("/in/b.XML")]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn close_after_write_is_the_arrival_not_create() {
        let created = event(EventKind::Create(CreateKind::File), &["/in/a.xml"]);
        let written = event(EventKind::Modify(ModifyKind::Data(DataChange::Any)), &["/in/a.xml"]);
        let closed = event(EventKind::Access(AccessKind::Close(AccessMode::Write)), &["/in/a.xml"]);

        assert!(arrived_files(&created).is_empty());
        assert!(arrived_files(&written).is_empty());
        assert_eq!(arrived_files(&closed), vec![PathBuf::from("/in/a.xml")]);
    }

    #[cfg(not(target_os = "linux"))]
    #[test]
    fn create_and_write_are_arrivals_without_close_events() {
        let created = event(EventKind::Create(CreateKind::File), &["/in/a.xml"]);
        let written = event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), &["/in/a.xml"]);

        assert_eq!(arrived_files(&created), vec![PathBuf::from("/in/a.xml")]);
        assert_eq!(arrived_files(&written), vec![PathBuf::from("/in/a.xml")]);
    }

    #[test]
    fn rename_within_folder_reports_new_path_only() {
        let renamed = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/in/a.xml.part", "/in/a.xml"],
        );

        assert_eq!(arrived_files(&renamed), vec![PathBuf::from("/in/a.xml")]);
    }

    #[test]
    fn other_events_are_ignored() {
        let moved_out = event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/in/a.xml"]);
        let folder = event(EventKind::Create(CreateKind::Folder), &["/in/dir.xml"]);
        let text = event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/in/a.txt"]);
        let removed = event(EventKind::Remove(notify::event::RemoveKind::File), &["/in/a.xml"]);

        for e in [moved_out, folder, text, removed] {
            assert!(arrived_files(&e).is_empty());
        }
    }

    #[test]
    fn repeated_signals_restart_the_settle_period() {
        let mut queue = ArrivalQueue::new(Duration::from_millis(200));
        let t0 = Instant::now();
        let path = PathBuf::from("/in/a.xml");

        queue.push(path.clone(), t0);
        queue.push(path.clone(), t0 + Duration::from_millis(100));

        assert!(queue.take_due(t0 + Duration::from_millis(250)).is_empty());
        assert_eq!(queue.next_due(), Some(t0 + Duration::from_millis(300)));
        assert_eq!(queue.take_due(t0 + Duration::from_millis(300)), vec![path]);
        assert_eq!(queue.next_due(), None);
    }

    #[test]
    fn zero_settle_is_due_immediately() {
        let mut queue = ArrivalQueue::new(Duration::ZERO);
        let now = Instant::now();

        queue.push(PathBuf::from("/in/b.xml"), now);
        queue.push(PathBuf::from("/in/a.xml"), now);

        assert_eq!(
            queue.take_due(now),
            vec![PathBuf::from("/in/a.xml"), PathBuf::from("/in/b.xml")]
        );
    }
}
