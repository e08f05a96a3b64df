use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::XmlCodec;
use crate::orchestrator::IngestionController;
use crate::utils::logging::{log_startup, print_final_stats};
use crate::workflow::{FileProcessor, TracingObserver};

/// 应用主结构
pub struct App {
    config: Config,
    controller: IngestionController,
}

impl App {
    /// 初始化应用
    ///
    /// 创建所需目录并组装处理器、监听器；目录无法创建时启动失败。
    pub fn initialize(config: Config) -> Result<Self> {
        config.ensure_folders().context("启动失败: 无法创建所需目录")?;

        log_startup(&config);

        if !config.reference_data_path.exists() {
            warn!(
                "⚠️ 参考数据文件不存在: {}，文件处理将在参考数据加载阶段失败",
                config.reference_data_path.display()
            );
        }

        let processor = FileProcessor::new(&config, Arc::new(XmlCodec::new())).with_observer(Arc::new(TracingObserver));
        let controller = IngestionController::new(Arc::new(processor), &config);

        Ok(Self { config, controller })
    }

    /// 运行应用主逻辑：处理积压文件，持续监听，直到 Ctrl-C
    pub async fn run(mut self) -> Result<()> {
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("收到退出信号"),
                Err(e) => warn!("⚠️ 无法监听退出信号: {}", e),
            }
            signal.cancel();
        });

        let stats = self
            .controller
            .start(shutdown.clone())
            .await
            .with_context(|| format!("无法监听输入目录: {}", self.config.input_folder.display()))?;

        print_final_stats(&stats);

        if !shutdown.is_cancelled() {
            info!("💡 按 Ctrl-C 退出");
        }
        shutdown.cancelled().await;

        self.controller.stop();
        info!("程序已退出");

        Ok(())
    }
}
