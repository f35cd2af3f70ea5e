//! # Run Pipeline Use Case
//!
//! 変更通知をアップロードタスクに結びつけるプロセス寿命のループ

use std::convert::Infallible;
use std::sync::Arc;

use log::info;
use tokio_util::sync::CancellationToken;

use crate::application::dto::pipeline_config::PipelineConfig;
use crate::application::use_cases::upload_file::UploadFileUseCase;
use crate::domain::errors::{Result, WatchupError};
use crate::domain::repositories::change_notifier::{ChangeNotifier, Notification, WatchHandle};
use crate::domain::repositories::storage_location::{LocationResolver, StorageLocation};

/// パイプラインドライバー
///
/// イベントを到着順に1件ずつ処理し、アップロード中に次のアップロードを始めることはない。
/// 最初の回復不能なエラーでループを終了する。
pub struct PipelineDriver {
    source: Arc<dyn StorageLocation>,
    destination: Arc<dyn StorageLocation>,
    uploader: UploadFileUseCase,
}

impl PipelineDriver {
    pub fn new(
        source: Arc<dyn StorageLocation>,
        destination: Arc<dyn StorageLocation>,
        uploader: UploadFileUseCase,
    ) -> Self {
        Self {
            source,
            destination,
            uploader,
        }
    }

    /// イベントループを実行する
    ///
    /// 成功時には戻らない。通知器のエラー、アップロードの失敗、`shutdown` のキャンセルの
    /// いずれかで、その原因となったエラーを返す。
    pub async fn run(
        &self,
        shutdown: &CancellationToken,
        mut watch: WatchHandle,
    ) -> Result<Infallible> {
        loop {
            let notification = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Err(WatchupError::Cancelled),
                notification = watch.next() => notification,
            };

            match notification {
                Notification::Event(event) => {
                    info!("event: {}", event);
                    self.uploader
                        .execute(
                            shutdown,
                            self.source.as_ref(),
                            self.destination.as_ref(),
                            &event.file_name,
                        )
                        .await?;
                }
                Notification::Failed(e) => return Err(e),
            }
        }
    }
}

/// パイプライン実行ユースケース
///
/// 初期化の順序は アップロード元の解決 → アップロード先の解決 → 監視開始。
/// いずれかが失敗した場合はループに入らずに終了する。
pub struct RunPipelineUseCase<R: LocationResolver, N: ChangeNotifier> {
    resolver: Arc<R>,
    notifier: Arc<N>,
}

impl<R: LocationResolver, N: ChangeNotifier> RunPipelineUseCase<R, N> {
    /// 新しいユースケースを作成
    ///
    /// # Arguments
    ///
    /// * `resolver` - ロケーションの解決器
    /// * `notifier` - 変更通知器
    pub fn new(resolver: Arc<R>, notifier: Arc<N>) -> Self {
        Self { resolver, notifier }
    }

    /// パイプラインを起動して、最初の回復不能なエラーまで実行する
    pub async fn execute(
        &self,
        config: &PipelineConfig,
        shutdown: &CancellationToken,
    ) -> Result<Infallible> {
        let source = self.resolver.resolve(&config.source)?;
        info!("source: {}", source.root());
        let destination = self.resolver.resolve(&config.destination)?;
        info!("destination: {}", destination.root());

        let watch = self.notifier.start_watching(&config.watch_dir)?;
        info!("watching {}", config.watch_dir.display());

        let driver = PipelineDriver::new(
            source,
            destination,
            UploadFileUseCase::new(config.upload_timeout),
        );
        driver.run(shutdown, watch).await
    }
}
