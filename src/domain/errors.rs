//! # Domain Errors
//!
//! パイプライン全体で共有するエラー分類

use std::time::Duration;

use thiserror::Error;

/// パイプラインのエラー
///
/// どの種類のエラーもローカルで回復されることはなく、ドライバーまで伝播してプロセスを終了させる。
#[derive(Debug, Error)]
pub enum WatchupError {
    /// 不正なパス/URI、未知のバックエンド、起動時に到達できないバックエンド
    #[error("configuration error: {0}")]
    Configuration(String),

    /// 指定された名前のオブジェクトが存在しない
    #[error("object not found: {0}")]
    NotFound(String),

    /// 読み書き・ネットワーク障害
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// タスクごとの時間予算を超過
    #[error("upload timed out after {0:?}")]
    Timeout(Duration),

    /// 親スコープ（シャットダウン）によるキャンセル
    #[error("cancelled")]
    Cancelled,

    /// OSの監視機構の障害（ウォッチ記述子の無効化、キューのオーバーフローなど）
    #[error("change notifier failed: {0}")]
    Notifier(String),

    /// ファイル名で注釈されたアップロード失敗
    #[error("upload of {file:?} failed")]
    Upload {
        file: String,
        #[source]
        source: Box<WatchupError>,
    },
}

impl WatchupError {
    /// ファイル名で注釈する
    ///
    /// 既に注釈済みのエラーは二重に包まない。
    pub fn for_file(self, file: &str) -> Self {
        match self {
            Self::Upload { .. } => self,
            other => Self::Upload {
                file: file.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// 注釈を剥がした元のエラーを返す
    ///
    /// ```
    /// use watchup::domain::errors::WatchupError;
    ///
    /// let err = WatchupError::NotFound("report.txt".to_string()).for_file("report.txt");
    /// assert!(matches!(err.root_cause(), WatchupError::NotFound(_)));
    /// ```
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Upload { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// 注釈されたファイル名（あれば）
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Upload { file, .. } => Some(file),
            _ => None,
        }
    }

    pub(crate) fn invalid_data(message: impl Into<String>) -> Self {
        Self::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            message.into(),
        ))
    }
}

pub type Result<T, E = WatchupError> = std::result::Result<T, E>;
