//! 错误类型
//!
//! - [`CodecError`]：XML 编解码（基础设施层）
//! - [`JobError`]：单个文件处理任务的四个阶段错误
//! - [`IngestionError`]：目录监听 / 扫描（编排层）
//!
//! 单个文件的错误只在任务边界记录日志，不会向上传播到调度器或监听器。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 编解码错误
#[derive(Debug, Error)]
pub enum CodecError {
    /// 打开 / 创建文件失败
    #[error("文件读写失败 ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 流读写失败
    #[error("流读写失败: {0}")]
    Stream(#[source] io::Error),

    /// XML 反序列化失败
    #[error("XML解析失败: {0}")]
    Deserialize(#[from] quick_xml::DeError),

    /// XML 序列化失败
    #[error("XML序列化失败: {0}")]
    Serialize(#[from] quick_xml::SeError),

    /// 日期格式无法识别
    #[error("无法解析日期: '{value}'")]
    InvalidDate { value: String },

    /// 阻塞任务被取消或 panic
    #[error("编解码任务执行失败: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CodecError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CodecError::Io {
            path: path.into(),
            source,
        }
    }
}

/// 处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    ReferenceLoad,
    Encode,
    Move,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Decode => "decode",
            Stage::ReferenceLoad => "reference-load",
            Stage::Encode => "encode",
            Stage::Move => "move",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 单个文件处理任务的错误
///
/// 每个变体都对应流水线中的一个阶段，并携带输入文件路径。
#[derive(Debug, Error)]
pub enum JobError {
    /// 报告解析失败，输入文件保持原位
    #[error("报告解析失败 ({}): {source}", .file.display())]
    Decode {
        file: PathBuf,
        #[source]
        source: CodecError,
    },

    /// 参考数据加载失败
    #[error("参考数据加载失败 ({}, 参考文件: {}): {source}", .file.display(), .reference.display())]
    ReferenceLoad {
        file: PathBuf,
        reference: PathBuf,
        #[source]
        source: CodecError,
    },

    /// 输出写入失败，输入文件不会归档
    #[error("输出写入失败 ({} -> {}): {source}", .file.display(), .output.display())]
    Encode {
        file: PathBuf,
        output: PathBuf,
        #[source]
        source: CodecError,
    },

    /// 归档移动失败，输出已经写入
    #[error("归档移动失败 ({} -> {}): {source}", .file.display(), .destination.display())]
    Move {
        file: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl JobError {
    /// 出错的阶段
    pub fn stage(&self) -> Stage {
        match self {
            JobError::Decode { .. } => Stage::Decode,
            JobError::ReferenceLoad { .. } => Stage::ReferenceLoad,
            JobError::Encode { .. } => Stage::Encode,
            JobError::Move { .. } => Stage::Move,
        }
    }

    /// 出错的输入文件
    pub fn file(&self) -> &std::path::Path {
        match self {
            JobError::Decode { file, .. }
            | JobError::ReferenceLoad { file, .. }
            | JobError::Encode { file, .. }
            | JobError::Move { file, .. } => file,
        }
    }
}

/// 监听器错误（启动 / 扫描级别）
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 已经处于监听状态
    #[error("监听器已经启动")]
    AlreadyWatching,

    /// 注册文件系统监听失败
    #[error("注册目录监听失败: {0}")]
    Watch(#[from] notify::Error),

    /// 扫描输入目录失败
    #[error("扫描输入目录失败 ({}): {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 任务结果类型
pub type JobResult<T> = Result<T, JobError>;
