use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::orchestrator::DispatchMode;

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "ENERGY_REPORT_CONFIG";
/// 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// 新文件的默认静默期（毫秒）
///
/// Linux 以写入后关闭作为到达信号，静默期只需覆盖多次打开写入的情况；
/// 其他平台以创建 / 写入事件作为信号，需要更长的等待。
#[cfg(target_os = "linux")]
pub const DEFAULT_ARRIVAL_DELAY_MS: u64 = 250;
#[cfg(not(target_os = "linux"))]
pub const DEFAULT_ARRIVAL_DELAY_MS: u64 = 1000;

/// 调度方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchKind {
    /// 每个文件一个并发任务，不限并发数
    Unbounded,
    /// 限制同时运行的任务数
    Bounded,
}

impl DispatchKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unbounded" => Some(DispatchKind::Unbounded),
            "bounded" => Some(DispatchKind::Bounded),
            _ => None,
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 监听的输入目录
    pub input_folder: PathBuf,
    /// 输出目录
    pub output_folder: PathBuf,
    /// 归档目录（处理完成的输入文件）
    pub processed_folder: PathBuf,
    /// 参考数据文件
    pub reference_data_path: PathBuf,
    /// 启动时处理积压文件的调度方式
    pub dispatch_mode: DispatchKind,
    /// 有界模式的最大并发数，未设置时使用逻辑 CPU 数
    pub max_workers: Option<usize>,
    /// 同一新文件最后一次到达信号之后的静默期（毫秒）
    pub arrival_delay_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_folder: PathBuf::from("Input"),
            output_folder: PathBuf::from("Output"),
            processed_folder: PathBuf::from("Processed"),
            reference_data_path: PathBuf::from("Data").join("ReferenceData.xml"),
            dispatch_mode: DispatchKind::Bounded,
            max_workers: None,
            arrival_delay_ms: DEFAULT_ARRIVAL_DELAY_MS,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：默认值 → TOML 文件（可选）→ 环境变量
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let base = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?,
            None => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// 从 TOML 文件读取，缺省字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("无法解析配置文件: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 只使用默认值和环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 用环境变量覆盖，无法解析的值忽略
    pub fn with_env_overrides(self) -> Self {
        let var = |name: &str| std::env::var(name).ok();
        Self {
            input_folder: var("INPUT_FOLDER").map(PathBuf::from).unwrap_or(self.input_folder),
            output_folder: var("OUTPUT_FOLDER").map(PathBuf::from).unwrap_or(self.output_folder),
            processed_folder: var("PROCESSED_FOLDER").map(PathBuf::from).unwrap_or(self.processed_folder),
            reference_data_path: var("REFERENCE_DATA_PATH").map(PathBuf::from).unwrap_or(self.reference_data_path),
            dispatch_mode: var("DISPATCH_MODE").and_then(|v| DispatchKind::parse(&v)).unwrap_or(self.dispatch_mode),
            max_workers: var("MAX_WORKERS").and_then(|v| v.parse().ok()).or(self.max_workers),
            arrival_delay_ms: var("ARRIVAL_DELAY_MS").and_then(|v| v.parse().ok()).unwrap_or(self.arrival_delay_ms),
            verbose_logging: var("VERBOSE_LOGGING").and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
        }
    }

    /// 有界模式的实际并发数（至少为 1）
    pub fn worker_limit(&self) -> usize {
        self.max_workers
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .max(1)
    }

    /// 转换为调度器使用的模式
    pub fn dispatch_mode(&self) -> DispatchMode {
        match self.dispatch_mode {
            DispatchKind::Unbounded => DispatchMode::Unbounded,
            DispatchKind::Bounded => DispatchMode::Bounded {
                max_workers: self.worker_limit(),
            },
        }
    }

    /// 创建所需目录，失败时启动中止
    pub fn ensure_folders(&self) -> Result<()> {
        for folder in [&self.input_folder, &self.output_folder, &self.processed_folder] {
            std::fs::create_dir_all(folder).with_context(|| format!("无法创建目录: {}", folder.display()))?;
        }
        if let Some(parent) = self.reference_data_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| format!("无法创建目录: {}", parent.display()))?;
        }
        Ok(())
    }

    /// 以指定根目录构造一套配置（测试和嵌入场景使用）
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            input_folder: root.join("Input"),
            output_folder: root.join("Output"),
            processed_folder: root.join("Processed"),
            reference_data_path: root.join("Data").join("ReferenceData.xml"),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let config = Config::from_toml_str(
            r#"
            input_folder = "/data/in"
            dispatch_mode = "unbounded"
            "#,
        )
        .unwrap();

        assert_eq!(config.input_folder, PathBuf::from("/data/in"));
        assert_eq!(config.output_folder, PathBuf::from("Output"));
        assert_eq!(config.dispatch_mode(), DispatchMode::Unbounded);
        assert_eq!(config.arrival_delay_ms, DEFAULT_ARRIVAL_DELAY_MS);
    }

    #[test]
    fn live_arrivals_settle_by_default() {
        assert!(Config::default().arrival_delay_ms > 0);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(Config::from_toml_str("dispatch_mode = \"sometimes\"").is_err());
    }

    #[test]
    fn worker_limit_is_never_zero() {
        let config = Config {
            max_workers: Some(0),
            ..Config::default()
        };
        assert_eq!(config.worker_limit(), 1);
        assert_eq!(config.dispatch_mode(), DispatchMode::Bounded { max_workers: 1 });
        assert!(Config::default().worker_limit() >= 1);
    }

    #[test]
    fn ensure_folders_creates_every_folder() {
        let root = tempfile::tempdir().unwrap();
        let config = Config::rooted_at(root.path());

        config.ensure_folders().unwrap();

        assert!(config.input_folder.is_dir());
        assert!(config.output_folder.is_dir());
        assert!(config.processed_folder.is_dir());
        assert!(root.path().join("Data").is_dir());
    }
}
