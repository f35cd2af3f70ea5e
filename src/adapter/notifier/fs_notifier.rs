//! Filesystem Change Notifier
//!
//! `notify` の監視結果を WatchEvent に変換する
//!
//! 書き込み後クローズ（Linux の inotify `IN_CLOSE_WRITE`）のみを通知し、
//! サブディレクトリは監視しない。

use std::path::{Path, PathBuf};

use log::{debug, warn};
use notify::event::{AccessKind, AccessMode, RemoveKind};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::domain::entities::WatchEvent;
use crate::domain::errors::{Result, WatchupError};
use crate::domain::repositories::change_notifier::{ChangeNotifier, WatchHandle, WatchSender};

/// notify クレートによる変更通知器
#[derive(Debug, Clone, Copy, Default)]
pub struct FsChangeNotifier;

impl FsChangeNotifier {
    pub fn new() -> Self {
        Self
    }

    fn resolve_directory(directory: &Path) -> Result<PathBuf> {
        let expanded = PathBuf::from(shellexpand::tilde(&directory.to_string_lossy()).as_ref());
        let canonical = std::fs::canonicalize(&expanded).map_err(|e| {
            WatchupError::Configuration(format!("cannot watch {}: {}", expanded.display(), e))
        })?;

        if !canonical.is_dir() {
            return Err(WatchupError::Configuration(format!(
                "cannot watch {}: not a directory",
                canonical.display()
            )));
        }
        Ok(canonical)
    }
}

impl ChangeNotifier for FsChangeNotifier {
    fn start_watching(&self, directory: &Path) -> Result<WatchHandle> {
        let directory = Self::resolve_directory(directory)?;
        let (sender, handle) = WatchHandle::channel();

        let watched = directory.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            forward(&watched, &sender, res)
        })
        .map_err(|e| WatchupError::Configuration(format!("cannot create watcher: {}", e)))?;

        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| {
                WatchupError::Configuration(format!("cannot watch {}: {}", directory.display(), e))
            })?;

        Ok(handle.with_watcher(watcher))
    }
}

/// 監視スレッドから呼ばれ、結果を送信側に流す
fn forward(directory: &Path, sender: &WatchSender, res: notify::Result<Event>) {
    let event = match res {
        Ok(event) => event,
        Err(e) => {
            warn!("watcher error: {}", e);
            sender.send_error(WatchupError::Notifier(e.to_string()));
            return;
        }
    };

    if event.need_rescan() {
        warn!("event queue overflowed for {}", directory.display());
        sender.send_error(WatchupError::Notifier(
            "event queue overflowed, events were lost".to_string(),
        ));
        return;
    }

    if is_directory_removed(directory, &event) {
        sender.send_error(WatchupError::Notifier(format!(
            "watched directory {} was removed",
            directory.display()
        )));
        return;
    }

    for watch_event in translate(directory, &event) {
        debug!("notify: {}", watch_event);
        sender.send_event(watch_event);
    }
}

fn is_directory_removed(directory: &Path, event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Remove(RemoveKind::Any | RemoveKind::Folder)
    ) && event.paths.iter().any(|p| p == directory)
}

/// 書き込み後クローズのうち、監視ディレクトリ直下のファイルだけを WatchEvent にする
pub fn translate(directory: &Path, event: &Event) -> Vec<WatchEvent> {
    if !matches!(
        event.kind,
        EventKind::Access(AccessKind::Close(AccessMode::Write))
    ) {
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter(|path| path.parent() == Some(directory))
        .filter_map(|path| path.file_name()?.to_str())
        .map(WatchEvent::close_after_write)
        .collect()
}
