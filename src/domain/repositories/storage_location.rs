//! # Storage Location Trait
//!
//! 名前付きストレージエンドポイント（ローカルパス、リモートバケット、他のロケーションを包む変換層）の抽象化

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncRead;

#[cfg(test)]
use mockall::automock;

use crate::domain::entities::ObjectInfo;
use crate::domain::errors::Result;

/// オブジェクトの読み取りストリーム
///
/// ドロップ時にクローズされる。
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

/// ロケーション上で見つかったオブジェクト
#[async_trait]
pub trait ObjectHandle: Send + Sync {
    /// オブジェクトのメタデータ
    fn info(&self) -> &ObjectInfo;

    /// 読み取りストリームを開く
    ///
    /// # Errors
    ///
    /// 下位の読み取りに失敗した場合に `Io` を返す
    async fn open_read(&self) -> Result<ObjectReader>;
}

/// ストレージロケーション
///
/// コアはどの具体的なバックエンドと話しているかを検査しない。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StorageLocation: Send + Sync {
    /// ロケーションのルート（ログ表示用）
    fn root(&self) -> String;

    /// 名前でオブジェクトを探す
    ///
    /// # Errors
    ///
    /// その名前のオブジェクトが存在しない場合に `NotFound` を返す
    async fn open(&self, name: &str) -> Result<Box<dyn ObjectHandle>>;

    /// ストリームの内容を新しいオブジェクトとして書き込む
    ///
    /// 名前・サイズ・更新時刻は `source` から決定する。
    ///
    /// # Returns
    ///
    /// 書き込み先が確認したオブジェクトのメタデータ
    ///
    /// # Errors
    ///
    /// 書き込みの失敗、または転送中の読み取りストリームのエラーで `Io` を返す。
    /// 書き込み先に部分的なオブジェクトが残る場合がある。
    async fn put(&self, reader: ObjectReader, source: &ObjectInfo) -> Result<ObjectInfo>;

    /// オブジェクトを名前順に列挙する
    async fn list(&self) -> Result<Vec<ObjectInfo>>;
}

/// URI/パスからストレージロケーションを解決する
pub trait LocationResolver: Send + Sync {
    /// # Errors
    ///
    /// URI/パスが不正、バックエンドが未知、または解決時点で到達できない場合に `Configuration` を返す
    fn resolve(&self, uri: &str) -> Result<Arc<dyn StorageLocation>>;
}
