//! # Pipeline Configuration DTO
//!
//! パイプライン設定のData Transfer Object

use std::path::PathBuf;
use std::time::Duration;

/// アップロード1件あたりの既定の時間予算
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// パイプライン設定
///
/// 起動時に一度だけ読み込まれ、以降は変更されない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 監視するディレクトリ（非再帰）
    pub watch_dir: PathBuf,
    /// アップロード元ロケーションの識別子（URI/パス）
    pub source: String,
    /// アップロード先ロケーションの識別子（URI/パス）
    pub destination: String,
    /// アップロード1件あたりの時間予算
    pub upload_timeout: Duration,
}

impl PipelineConfig {
    /// 新しいパイプライン設定を作成します。
    ///
    /// # 例
    ///
    /// ```
    /// use watchup::application::dto::pipeline_config::{PipelineConfig, DEFAULT_UPLOAD_TIMEOUT};
    ///
    /// let config = PipelineConfig::new("/srv/incoming", "/srv/incoming", "crypt:/mnt/backup");
    ///
    /// assert_eq!(config.upload_timeout, DEFAULT_UPLOAD_TIMEOUT);
    /// assert_eq!(config.destination, "crypt:/mnt/backup");
    /// ```
    pub fn new(
        watch_dir: impl Into<PathBuf>,
        source: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            source: source.into(),
            destination: destination.into(),
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    /// 時間予算を変更する
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }
}
