//! # Watchup
//!
//! 監視ディレクトリに書き込まれたファイルを、書き込み完了と同時にアップロード先へ転送するツール
//!
//! このプロジェクトはクリーンアーキテクチャを採用しており、以下の4層で構成されています：
//!
//! - **Domain層**: エンティティ、エラー分類、ストレージと変更通知のtrait
//! - **Application層**: アップロードタスクとパイプラインドライバー（ユースケース）
//! - **Adapter層**: 外部システムとの統合（ローカル/暗号化ストレージ、notify、設定ファイル）
//! - **Driver層**: CLI、依存性注入、シャットダウン

// coverage_nightly cfg が設定されている場合のみ coverage_attribute を有効化
// カバレッジ計測時にシグナル処理などを除外するために使用
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

// Domain層（純粋なビジネスロジック）
pub mod domain;

// Application層（ユースケース）
pub mod application;

// Adapter層（Infrastructure）
pub mod adapter;

// Driver層（Presentation）
pub mod driver;
