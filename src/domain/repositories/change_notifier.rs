//! # Change Notifier Trait
//!
//! OSのディレクトリ監視機構を抽象化
//!
//! 監視ハンドルはイベント列と終端エラーの2つのソースを持ち、
//! `WatchHandle::next` でどちらか先に届いた方を1つだけ待つ。

use std::any::Any;
use std::path::Path;

use tokio::sync::mpsc;

use crate::domain::entities::WatchEvent;
use crate::domain::errors::{Result, WatchupError};

/// 監視ハンドルから受け取る通知
#[derive(Debug)]
pub enum Notification {
    Event(WatchEvent),
    /// 終端エラー。これ以降イベントは届かない
    Failed(WatchupError),
}

/// 変更通知の送信側
///
/// OSのコールバックスレッドから使われるため、送信はブロックしない。
#[derive(Debug, Clone)]
pub struct WatchSender {
    events: mpsc::UnboundedSender<WatchEvent>,
    errors: mpsc::UnboundedSender<WatchupError>,
}

impl WatchSender {
    /// イベントを送る。受信側が閉じていれば `false`
    pub fn send_event(&self, event: WatchEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// 終端エラーを送る。受信側が閉じていれば `false`
    pub fn send_error(&self, error: WatchupError) -> bool {
        self.errors.send(error).is_ok()
    }
}

/// 監視中のディレクトリへのハンドル
///
/// 状態遷移は Watching → Failed のみで、Failed から戻ることはない。
pub struct WatchHandle {
    events: mpsc::UnboundedReceiver<WatchEvent>,
    errors: mpsc::UnboundedReceiver<WatchupError>,
    failed: bool,
    // OSの監視オブジェクトはハンドルと同じ寿命を持つ
    _watcher: Option<Box<dyn Any + Send>>,
}

impl WatchHandle {
    /// 送信側と受信側のペアを作成
    pub fn channel() -> (WatchSender, WatchHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();

        let sender = WatchSender {
            events: event_tx,
            errors: error_tx,
        };
        let handle = WatchHandle {
            events: event_rx,
            errors: error_rx,
            failed: false,
            _watcher: None,
        };
        (sender, handle)
    }

    /// 監視オブジェクトの所有権をハンドルに移す
    pub fn with_watcher<W: Send + 'static>(mut self, watcher: W) -> Self {
        self._watcher = Some(Box::new(watcher));
        self
    }

    /// 失敗状態かどうか
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// 次のイベントまたは終端エラーを待つ
    ///
    /// エラーはキュー済みのイベントより優先される。送信側が全て閉じた場合も終端エラーとして扱う。
    pub async fn next(&mut self) -> Notification {
        if self.failed {
            return Notification::Failed(WatchupError::Notifier(
                "change notifier already failed".to_string(),
            ));
        }

        let notification = tokio::select! {
            biased;
            Some(error) = self.errors.recv() => Notification::Failed(error),
            Some(event) = self.events.recv() => Notification::Event(event),
            else => Notification::Failed(WatchupError::Notifier(
                "change notifier stopped".to_string(),
            )),
        };

        if let Notification::Failed(_) = notification {
            self.failed = true;
        }
        notification
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

/// 変更通知器
///
/// 1つのディレクトリ（非再帰）の「書き込み後クローズ」だけを通知する。
pub trait ChangeNotifier: Send + Sync {
    /// 監視を開始する
    ///
    /// # Errors
    ///
    /// ディレクトリが存在しない、または監視できない場合に `Configuration` を返す
    fn start_watching(&self, directory: &Path) -> Result<WatchHandle>;
}
