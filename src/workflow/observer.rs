//! 任务观察者
//!
//! 任务边界上的扩展点：开始、完成、阶段失败、跳过。默认全部为空操作。

use std::path::Path;

use tracing::debug;

use crate::error::JobError;
use crate::workflow::file_processor::JobReport;

/// 任务观察者
pub trait JobObserver: Send + Sync {
    /// 任务开始（已认领文件）
    fn on_job_start(&self, _file: &Path) {}

    /// 任务完成（输出已写入、输入已归档）
    fn on_job_complete(&self, _report: &JobReport) {}

    /// 某个阶段失败，任务终止
    fn on_stage_error(&self, _file: &Path, _error: &JobError) {}

    /// 文件已被其他任务认领或已不存在
    fn on_job_skipped(&self, _file: &Path) {}
}

/// 空观察者
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl JobObserver for NoopObserver {}

/// 以 tracing 事件输出的观察者
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl JobObserver for TracingObserver {
    fn on_job_start(&self, file: &Path) {
        debug!(file = %file.display(), "job started");
    }

    fn on_job_complete(&self, report: &JobReport) {
        debug!(
            file = %report.input.display(),
            output = %report.output.display(),
            totals = report.totals,
            emission_days = report.max_emission_days,
            heat_rates = report.heat_rates,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "job completed"
        );
    }

    fn on_stage_error(&self, file: &Path, error: &JobError) {
        debug!(file = %file.display(), stage = %error.stage(), "job failed");
    }

    fn on_job_skipped(&self, file: &Path) {
        debug!(file = %file.display(), "job skipped");
    }
}
