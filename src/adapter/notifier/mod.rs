//! Change Notifier Implementations
//!
//! OSのファイル監視機構（notify クレート）による ChangeNotifier の実装

pub mod fs_notifier;

pub use fs_notifier::FsChangeNotifier;
