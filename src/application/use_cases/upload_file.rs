//! # Upload File Use Case
//!
//! ファイル1件を時間予算内にアップロード元からアップロード先へ転送するユースケース

use std::time::Duration;

use log::info;
use tokio_util::sync::CancellationToken;

use crate::application::dto::pipeline_config::DEFAULT_UPLOAD_TIMEOUT;
use crate::domain::entities::ObjectInfo;
use crate::domain::errors::{Result, WatchupError};
use crate::domain::repositories::storage_location::StorageLocation;

/// ファイルアップロードユースケース
///
/// リトライも、失敗時の書き込み先の部分オブジェクトの削除も行わない。
#[derive(Debug, Clone)]
pub struct UploadFileUseCase {
    timeout: Duration,
}

impl UploadFileUseCase {
    /// 新しいユースケースを作成
    ///
    /// # Arguments
    ///
    /// * `timeout` - アップロード1件あたりの時間予算
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// ファイルを1件アップロードする
    ///
    /// 親スコープから派生した専用のスコープで実行され、開始から `timeout` 経過で中断される。
    /// 親スコープがキャンセルされた場合も中断される。
    ///
    /// # Arguments
    ///
    /// * `parent` - 親のキャンセルスコープ
    /// * `source` - アップロード元ロケーション
    /// * `destination` - アップロード先ロケーション
    /// * `file_name` - 転送するオブジェクト名
    ///
    /// # Returns
    ///
    /// 書き込み先が確認したオブジェクトのメタデータ
    ///
    /// # Errors
    ///
    /// どの段階の失敗もファイル名で注釈してそのまま返す（`NotFound`, `Io`, `Timeout`, `Cancelled`）
    pub async fn execute(
        &self,
        parent: &CancellationToken,
        source: &dyn StorageLocation,
        destination: &dyn StorageLocation,
        file_name: &str,
    ) -> Result<ObjectInfo> {
        let scope = parent.child_token();
        let _guard = scope.clone().drop_guard();

        info!("uploading {:?}", file_name);

        let outcome = tokio::select! {
            biased;
            _ = scope.cancelled() => Err(WatchupError::Cancelled),
            transferred = tokio::time::timeout(self.timeout, transfer(source, destination, file_name)) => {
                transferred.unwrap_or(Err(WatchupError::Timeout(self.timeout)))
            }
        };

        let stored = outcome.map_err(|e| e.for_file(file_name))?;
        info!("uploaded {:?} ({} bytes)", stored.name, stored.size);
        Ok(stored)
    }
}

impl Default for UploadFileUseCase {
    fn default() -> Self {
        Self::new(DEFAULT_UPLOAD_TIMEOUT)
    }
}

async fn transfer(
    source: &dyn StorageLocation,
    destination: &dyn StorageLocation,
    file_name: &str,
) -> Result<ObjectInfo> {
    let object = source.open(file_name).await?;
    // ストリームは put に移動し、成功・失敗・タイムアウトのいずれでもちょうど一度ドロップされる
    let reader = object.open_read().await?;
    destination.put(reader, object.info()).await
}
