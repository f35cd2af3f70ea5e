//! Adapter Layer
//!
//! 外部システム（ファイルシステム、OSの監視機構、ストレージバックエンド）との統合

pub mod config;
pub mod notifier;
pub mod storage;
