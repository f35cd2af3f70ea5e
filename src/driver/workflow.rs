//! Workflow Orchestration
//!
//! ワークフローのオーケストレーション

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use tokio_util::sync::CancellationToken;

use crate::adapter::config::{Config, CRYPT_PASSWORD_ENV};
use crate::adapter::notifier::FsChangeNotifier;
use crate::adapter::storage::LocationRegistry;
use crate::application::use_cases::run_pipeline::RunPipelineUseCase;

use super::cli::Args;

/// 設定ファイル、CLI引数、環境変数の順に重ねて設定を組み立てる
pub fn load_config(args: &Args) -> Result<Config> {
    let base = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    Ok(base
        .merge(
            args.dir.clone(),
            args.src.clone(),
            args.dst.clone(),
            args.timeout,
        )
        .with_env_password(std::env::var(CRYPT_PASSWORD_ENV).ok()))
}

/// Ctrl-C でキャンセルされるルートスコープを作る
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            trigger.cancel();
        }
    });
    token
}

/// Watch Upload Workflow
pub struct WatchUploadWorkflow {
    config: Config,
    run_use_case: RunPipelineUseCase<LocationRegistry, FsChangeNotifier>,
}

impl WatchUploadWorkflow {
    /// Create a new workflow instance with dependency injection
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(LocationRegistry::with_default_backends(
            config.backend_options(),
        ));
        let notifier = Arc::new(FsChangeNotifier::new());

        Self {
            config,
            run_use_case: RunPipelineUseCase::new(registry, notifier),
        }
    }

    /// Execute the watch-and-upload loop until the first unrecoverable error
    ///
    /// Never returns `Ok`: every way out of the loop is an error.
    pub async fn execute(&self, shutdown: CancellationToken) -> Result<()> {
        let pipeline = self.config.to_pipeline_config()?;

        info!("Starting watchup...");
        info!("  Watch dir: {}", pipeline.watch_dir.display());
        info!("  Source: {}", pipeline.source);
        info!("  Destination: {}", pipeline.destination);
        info!("  Upload timeout: {:?}", pipeline.upload_timeout);

        match self.run_use_case.execute(&pipeline, &shutdown).await {
            Ok(never) => match never {},
            Err(e) => Err(e).context("watch pipeline stopped"),
        }
    }
}
