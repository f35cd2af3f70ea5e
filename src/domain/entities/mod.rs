//! # Domain Entities
//!
//! ビジネスエンティティとバリューオブジェクトを定義するモジュール
//!
//! ## エンティティ
//!
//! - **WatchEvent**: 監視ディレクトリで発生した「書き込み後クローズ」イベント
//! - **ObjectInfo**: ストレージ上のオブジェクトのメタデータ

pub mod object_info;
pub mod watch_event;

pub use object_info::ObjectInfo;
pub use watch_event::{WatchEvent, WatchEventKind};
