//! # WatchEvent Value Object
//!
//! 変更通知のバリューオブジェクト

use std::fmt;

/// イベントの種類
///
/// 現在は書き込み用に開かれたファイルのクローズのみを扱う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    CloseAfterWrite,
}

/// 監視ディレクトリ内のファイルに対する変更通知
///
/// ドライバーによってちょうど一度だけ消費される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// 監視ディレクトリからの相対ファイル名（ディレクトリ成分を含まない）
    pub file_name: String,
    pub kind: WatchEventKind,
}

impl WatchEvent {
    /// 書き込み後クローズのイベントを作成
    pub fn close_after_write(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            kind: WatchEventKind::CloseAfterWrite,
        }
    }
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?}", self.kind, self.file_name)
    }
}
