//! 单文件处理流程 - 流程层
//!
//! 核心职责：定义"一个文件"的完整处理流程
//!
//! 流程顺序（任一步失败即终止，只影响当前文件）：
//! 1. 解析报告 → `JobError::Decode`（输入文件保持原位）
//! 2. 加载参考数据 → `JobError::ReferenceLoad`
//! 3. 计算（不会失败）
//! 4. 写入输出 → `JobError::Encode`（输入文件不归档）
//! 5. 移动到归档目录 → `JobError::Move`
//!
//! 不重试，不做死信转移。

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engine;
use crate::error::{CodecError, JobError, JobResult};
use crate::infrastructure::Codec;
use crate::utils::logging::file_label;
use crate::workflow::observer::{JobObserver, NoopObserver};

/// 输出文件名中的标记
pub const OUTPUT_MARKER: &str = "_GenerationOutput_";
/// 输出文件名时间戳格式（秒级）
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// 单个任务的完成报告
#[derive(Debug, Clone)]
pub struct JobReport {
    /// 原输入文件
    pub input: PathBuf,
    /// 输出文件
    pub output: PathBuf,
    /// 归档位置
    pub archived: PathBuf,
    pub totals: usize,
    pub max_emission_days: usize,
    pub heat_rates: usize,
    pub elapsed: Duration,
}

/// 任务结果
#[derive(Debug)]
pub enum JobOutcome {
    /// 全部阶段完成
    Completed(JobReport),
    /// 某个阶段失败
    Failed(JobError),
    /// 文件已被其他任务认领，或已不存在
    Skipped,
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed(_))
    }
}

/// 单文件处理器
///
/// 职责：
/// - 持有编解码器、观察者和目录配置
/// - 按顺序执行五个阶段
/// - 在任务边界统一记录日志、通知观察者
/// - 保证同一路径同一时间只有一个任务在处理
pub struct FileProcessor {
    codec: Arc<dyn Codec>,
    observer: Arc<dyn JobObserver>,
    output_folder: PathBuf,
    processed_folder: PathBuf,
    reference_data_path: PathBuf,
    in_flight: Mutex<HashSet<PathBuf>>,
}

impl FileProcessor {
    /// 创建处理器，默认使用空观察者
    pub fn new(config: &Config, codec: Arc<dyn Codec>) -> Self {
        Self {
            codec,
            observer: Arc::new(NoopObserver),
            output_folder: config.output_folder.clone(),
            processed_folder: config.processed_folder.clone(),
            reference_data_path: config.reference_data_path.clone(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// 替换观察者
    pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// 任务边界：认领 → 处理 → 记录结果
    ///
    /// 错误在这里被记录并吞掉，不会传播给调用方。
    pub async fn run(&self, file: &Path) -> JobOutcome {
        let label = file_label(file);

        let Some(_claim) = self.claim(file) else {
            debug!("[文件 {}] 已被其他任务处理，跳过", label);
            self.observer.on_job_skipped(file);
            return JobOutcome::Skipped;
        };

        info!("[文件 {}] 开始处理", label);
        self.observer.on_job_start(file);

        match self.process(file).await {
            Ok(report) => {
                info!(
                    "[文件 {}] ✅ 处理完成: 总值 {} 条, 排放日 {} 条, 热耗率 {} 条 -> {}",
                    label,
                    report.totals,
                    report.max_emission_days,
                    report.heat_rates,
                    file_label(&report.output)
                );
                self.observer.on_job_complete(&report);
                JobOutcome::Completed(report)
            }
            Err(e) => {
                error!("[文件 {}] ❌ {} 阶段失败: {}", label, e.stage(), e);
                self.observer.on_stage_error(file, &e);
                JobOutcome::Failed(e)
            }
        }
    }

    /// 执行五个阶段，第一个失败即返回
    pub async fn process(&self, file: &Path) -> JobResult<JobReport> {
        let started = Instant::now();
        let input = file.to_path_buf();

        // 1. 解析报告
        let decode_source = input.clone();
        let report = self
            .blocking(move |codec| codec.decode_report(&decode_source))
            .await
            .map_err(|source| JobError::Decode {
                file: input.clone(),
                source,
            })?;
        debug!("[文件 {}] 报告解析完成: {} 台机组", file_label(file), report.generators.len());

        // 2. 加载参考数据（每次重新读取）
        let reference_source = self.reference_data_path.clone();
        let reference = self
            .blocking(move |codec| codec.decode_reference(&reference_source))
            .await
            .map_err(|source| JobError::ReferenceLoad {
                file: input.clone(),
                reference: self.reference_data_path.clone(),
                source,
            })?;

        // 3. 计算
        let output = engine::calculate(Some(&report), Some(&reference));
        let totals = output.totals.len();
        let max_emission_days = output.max_emission_generators.len();
        let heat_rates = output.actual_heat_rates.len();

        // 4. 写入输出
        let base_name = base_name(file);
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let planned = self.output_folder.join(output_file_name(&base_name, &timestamp));
        let reserve_target = planned.clone();
        let output_path = self
            .blocking(move |_| reserve_output_path(&reserve_target))
            .await
            .map_err(|source| JobError::Encode {
                file: input.clone(),
                output: planned,
                source,
            })?;

        let encode_target = output_path.clone();
        self.blocking(move |codec| codec.encode_output(&output, &encode_target))
            .await
            .map_err(|source| JobError::Encode {
                file: input.clone(),
                output: output_path.clone(),
                source,
            })?;

        // 5. 归档
        let archived = self.processed_folder.join(format!("{}.xml", base_name));
        archive(file, &archived).await.map_err(|source| JobError::Move {
            file: input.clone(),
            destination: archived.clone(),
            source,
        })?;
        debug!("[文件 {}] 已移动到归档目录", file_label(file));

        Ok(JobReport {
            input,
            output: output_path,
            archived,
            totals,
            max_emission_days,
            heat_rates,
            elapsed: started.elapsed(),
        })
    }

    /// 在阻塞线程池中调用编解码器
    async fn blocking<T, F>(&self, f: F) -> Result<T, CodecError>
    where
        F: FnOnce(&dyn Codec) -> Result<T, CodecError> + Send + 'static,
        T: Send + 'static,
    {
        let codec = Arc::clone(&self.codec);
        tokio::task::spawn_blocking(move || f(codec.as_ref())).await?
    }

    /// 认领文件
    ///
    /// 路径正在被处理或文件已不存在时返回 `None`。
    fn claim(&self, file: &Path) -> Option<Claim<'_>> {
        let key = std::fs::canonicalize(file).ok()?;

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if !in_flight.insert(key.clone()) {
                return None;
            }
        }

        let claim = Claim {
            set: &self.in_flight,
            key,
        };

        // 认领后再次确认，避免处理刚被归档的文件
        if !claim.key.exists() {
            return None;
        }
        Some(claim)
    }
}

/// 认领凭证，析构时释放
struct Claim<'a> {
    set: &'a Mutex<HashSet<PathBuf>>,
    key: PathBuf,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.set.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.key);
    }
}

/// 输入文件名（不含扩展名）
fn base_name(file: &Path) -> String {
    file.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

/// `{base}_GenerationOutput_{timestamp}.xml`
pub fn output_file_name(base_name: &str, timestamp: &str) -> String {
    format!("{}{}{}.xml", base_name, OUTPUT_MARKER, timestamp)
}

/// 原子地占用一个不存在的输出路径
///
/// 同名文件已存在时依次尝试 `_1`、`_2` ... 后缀，输出文件从不覆盖。
fn reserve_output_path(planned: &Path) -> Result<PathBuf, CodecError> {
    let stem = planned
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned();
    let folder = planned.parent().unwrap_or_else(|| Path::new(""));

    let mut candidate = planned.to_path_buf();
    let mut suffix = 0usize;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                suffix += 1;
                candidate = folder.join(format!("{}_{}.xml", stem, suffix));
            }
            Err(e) => return Err(CodecError::io(candidate, e)),
        }
    }
}

/// 移动到归档目录，已存在的同名归档被替换
///
/// `rename` 失败（例如跨文件系统）时退回到复制后删除。
async fn archive(from: &Path, to: &Path) -> io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            warn!(
                "[文件 {}] 重命名失败 ({}), 尝试复制后删除",
                file_label(from),
                rename_err
            );
            tokio::fs::copy(from, to).await?;
            tokio::fs::remove_file(from).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_embeds_base_and_timestamp() {
        assert_eq!(
            output_file_name("01-Basic", "20240102030405"),
            "01-Basic_GenerationOutput_20240102030405.xml"
        );
    }

    #[test]
    fn reserve_never_reuses_an_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let planned = dir.path().join("a_GenerationOutput_20240101000000.xml");

        let first = reserve_output_path(&planned).unwrap();
        let second = reserve_output_path(&planned).unwrap();
        let third = reserve_output_path(&planned).unwrap();

        assert_eq!(first, planned);
        assert_eq!(second, dir.path().join("a_GenerationOutput_20240101000000_1.xml"));
        assert_eq!(third, dir.path().join("a_GenerationOutput_20240101000000_2.xml"));
    }

    #[test]
    fn base_name_drops_extension() {
        assert_eq!(base_name(Path::new("/in/report.final.xml")), "report.final");
        assert_eq!(base_name(Path::new("plain")), "plain");
    }

    #[tokio::test]
    async fn archive_replaces_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("in.xml");
        let to = dir.path().join("out.xml");
        std::fs::write(&from, "new").unwrap();
        std::fs::write(&to, "old").unwrap();

        archive(&from, &to).await.unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "new");
    }
}
