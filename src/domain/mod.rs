//! # Domain Layer
//!
//! このモジュールはパイプラインの核心的なルールとエンティティを定義します。
//!
//! ## 特徴
//!
//! - フレームワークに依存しない
//! - ストレージバックエンドやOSの監視機構について何も知らない
//!
//! ## 構成要素
//!
//! - **entities**: エンティティ（WatchEvent, ObjectInfo）
//! - **errors**: エラー分類
//! - **repositories**: trait（ストレージロケーション、変更通知器）

pub mod entities;
pub mod errors;
pub mod repositories;
