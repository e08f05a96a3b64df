#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use energy_report_generator::error::CodecError;
use energy_report_generator::models::{GenerationOutput, ReferenceData, Report};
use energy_report_generator::{Codec, Config, FileProcessor, JobError, JobObserver, JobReport, XmlCodec};
use tempfile::TempDir;

pub fn reference_xml(low: f64) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<ReferenceData>
  <Factors>
    <ValueFactor><High>0.946</High><Medium>0.696</Medium><Low>{low}</Low></ValueFactor>
    <EmissionsFactor><High>0.812</High><Medium>0.562</Medium><Low>0.312</Low></EmissionsFactor>
  </Factors>
</ReferenceData>"#
    )
}

pub fn wind_report_xml(name: &str, location: &str, energy: f64, price: f64) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<GenerationReport>
  <Wind>
    <WindGenerator>
      <Name>{name}</Name>
      <Generation>
        <Day><Date>2017-01-01T00:00:00+00:00</Date><Energy>{energy}</Energy><Price>{price}</Price></Day>
      </Generation>
      <Location>{location}</Location>
    </WindGenerator>
  </Wind>
  <Gas/>
  <Coal/>
</GenerationReport>"#
    )
}

pub const MALFORMED_XML: &str = "<GenerationReport><Wind><WindGenerator>";

/// 临时目录 + 已创建目录的配置 + 参考数据（Low = 0.3）
pub fn setup() -> (TempDir, Config) {
    let root = tempfile::tempdir().expect("tempdir");
    let config = Config::rooted_at(root.path());
    config.ensure_folders().expect("folders");
    std::fs::write(&config.reference_data_path, reference_xml(0.3)).expect("reference");
    (root, config)
}

pub fn write_input(config: &Config, name: &str, content: &str) -> PathBuf {
    let path = config.input_folder.join(name);
    std::fs::write(&path, content).expect("write input");
    path
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn processor(config: &Config) -> Arc<FileProcessor> {
    Arc::new(FileProcessor::new(config, Arc::new(XmlCodec::new())))
}

pub fn processor_with(config: &Config, codec: Arc<dyn Codec>, observer: Arc<dyn JobObserver>) -> Arc<FileProcessor> {
    Arc::new(FileProcessor::new(config, codec).with_observer(observer))
}

pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

/// 记录解析并发度的编解码器
#[derive(Default)]
pub struct CountingCodec {
    inner: XmlCodec,
    delay: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl CountingCodec {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Codec for CountingCodec {
    fn read_report(&self, reader: &mut dyn BufRead) -> Result<Report, CodecError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        let result = self.inner.read_report(reader);
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn read_reference(&self, reader: &mut dyn BufRead) -> Result<ReferenceData, CodecError> {
        self.inner.read_reference(reader)
    }

    fn write_output(&self, output: &GenerationOutput, writer: &mut dyn Write) -> Result<(), CodecError> {
        self.inner.write_output(output, writer)
    }

    fn read_output(&self, reader: &mut dyn BufRead) -> Result<GenerationOutput, CodecError> {
        self.inner.read_output(reader)
    }
}

/// 写出输出时失败的编解码器，记录尝试写入的路径
#[derive(Default)]
pub struct FailingEncodeCodec {
    inner: XmlCodec,
    attempted: Mutex<Option<PathBuf>>,
}

impl FailingEncodeCodec {
    pub fn attempted(&self) -> Option<PathBuf> {
        self.attempted.lock().expect("lock").clone()
    }
}

impl Codec for FailingEncodeCodec {
    fn read_report(&self, reader: &mut dyn BufRead) -> Result<Report, CodecError> {
        self.inner.read_report(reader)
    }

    fn read_reference(&self, reader: &mut dyn BufRead) -> Result<ReferenceData, CodecError> {
        self.inner.read_reference(reader)
    }

    fn write_output(&self, output: &GenerationOutput, writer: &mut dyn Write) -> Result<(), CodecError> {
        self.inner.write_output(output, writer)
    }

    fn read_output(&self, reader: &mut dyn BufRead) -> Result<GenerationOutput, CodecError> {
        self.inner.read_output(reader)
    }

    fn encode_output(&self, _output: &GenerationOutput, path: &Path) -> Result<(), CodecError> {
        *self.attempted.lock().expect("lock") = Some(path.to_path_buf());
        Err(CodecError::io(path, std::io::Error::new(std::io::ErrorKind::Other, "磁盘已满")))
    }
}

/// 记录任务事件的观察者
#[derive(Default)]
pub struct RecordingObserver {
    pub started: Mutex<HashMap<PathBuf, usize>>,
    pub completed: AtomicUsize,
    pub failed: Mutex<Vec<String>>,
    pub skipped: AtomicUsize,
}

impl RecordingObserver {
    pub fn max_starts_per_file(&self) -> usize {
        self.started
            .lock()
            .expect("lock")
            .values()
            .copied()
            .max()
            .unwrap_or(0)
    }

    pub fn total_starts(&self) -> usize {
        self.started.lock().expect("lock").values().sum()
    }
}

impl JobObserver for RecordingObserver {
    fn on_job_start(&self, file: &Path) {
        *self.started.lock().expect("lock").entry(file.to_path_buf()).or_default() += 1;
    }

    fn on_job_complete(&self, _report: &JobReport) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_stage_error(&self, _file: &Path, error: &JobError) {
        self.failed.lock().expect("lock").push(error.stage().to_string());
    }

    fn on_job_skipped(&self, _file: &Path) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }
}
