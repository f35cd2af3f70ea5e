//! Watchup - Watched Directory Uploader
//!
//! 監視ディレクトリで書き込みが完了したファイルをアップロード先へ転送する

// coverage_nightly cfg が設定されている場合のみ coverage_attribute を有効化
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use anyhow::Result;
use clap::Parser;
use log::error;

use watchup::driver::workflow::{load_config, shutdown_on_ctrl_c};
use watchup::driver::{Args, WatchUploadWorkflow};

#[cfg_attr(coverage_nightly, coverage(off))]
#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 致命的な状態はどれも同じ扱い: 原因を記録して非ゼロで終了する
    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
async fn run() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = load_config(&args)?;

    // Create workflow with injected dependencies
    let workflow = WatchUploadWorkflow::new(config);

    workflow.execute(shutdown_on_ctrl_c()).await
}
