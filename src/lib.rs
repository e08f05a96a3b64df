//! # Energy Report Generator
//!
//! 监听输入目录中的发电报告文件，结合参考系数计算财务与排放指标，
//! 写出结果文件并归档原始输入。
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 模型层（Models）
//! - `models/` - 报告、参考数据、输出，纯数据
//! - `Generator` + `GeneratorKind` - 风电 / 燃气 / 燃煤三类机组
//!
//! ### ② 计算层（Engine）
//! - `engine/` - 纯函数，不做 I/O
//! - `calculate` - 总价值、每日最高排放、热耗率
//!
//! ### ③ 基础设施层（Infrastructure）
//! - `infrastructure/` - 文档读写能力
//! - `Codec` / `XmlCodec` - 报告、参考数据、输出的 XML 编解码
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 定义"一个文件"的完整处理流程
//! - `FileProcessor` - 解析 → 加载参考数据 → 计算 → 写出 → 归档
//! - `JobObserver` - 任务边界上的扩展点
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/dispatcher` - 批量调度，控制并发
//! - `orchestrator/ingestion` - 目录监听，管理生命周期
//!
//! ## 模块结构

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use engine::calculate;
pub use error::{CodecError, IngestionError, JobError, Stage};
pub use infrastructure::{Codec, XmlCodec};
pub use models::{GenerationOutput, Generator, GeneratorKind, ReferenceData, Report};
pub use orchestrator::{BatchStats, DispatchMode, Dispatcher, IngestionController, WatchState};
pub use workflow::{FileProcessor, JobObserver, JobOutcome, JobReport, NoopObserver, TracingObserver};
