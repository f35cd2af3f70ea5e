//! Encrypting Storage Location
//!
//! 別のロケーションを包み、内容を暗号化して書き込み、読み出し時に復号するロケーション
//!
//! 内側のロケーションではオブジェクト名に `.bin` が付く（名前自体は暗号化しない）。

pub mod cipher;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::entities::object_info::validate_object_name;
use crate::domain::entities::ObjectInfo;
use crate::domain::errors::{Result, WatchupError};
use crate::domain::repositories::storage_location::{ObjectHandle, ObjectReader, StorageLocation};

use self::cipher::{decrypted_size, encrypted_size, CryptKey, CryptReader};

const ENCRYPTED_SUFFIX: &str = ".bin";

/// 暗号化ロケーション
pub struct CryptLocation {
    inner: Arc<dyn StorageLocation>,
    key: CryptKey,
}

impl CryptLocation {
    /// # Errors
    ///
    /// パスワードが空の場合に `Configuration` を返す
    pub fn new(inner: Arc<dyn StorageLocation>, password: &str) -> Result<Self> {
        Ok(Self {
            inner,
            key: CryptKey::derive(password)?,
        })
    }

    fn encrypted_name(name: &str) -> String {
        format!("{}{}", name, ENCRYPTED_SUFFIX)
    }

    fn plain_name(name: &str) -> Option<&str> {
        name.strip_suffix(ENCRYPTED_SUFFIX)
            .filter(|plain| !plain.is_empty())
    }

    fn plain_info(name: &str, encrypted: &ObjectInfo) -> Result<ObjectInfo> {
        let size = decrypted_size(encrypted.size).ok_or_else(|| {
            WatchupError::invalid_data(format!(
                "{:?} has an impossible encrypted size ({} bytes)",
                encrypted.name, encrypted.size
            ))
        })?;
        Ok(ObjectInfo::new(name, size, encrypted.modified))
    }
}

struct CryptObject {
    info: ObjectInfo,
    inner: Box<dyn ObjectHandle>,
    key: CryptKey,
}

#[async_trait]
impl ObjectHandle for CryptObject {
    fn info(&self) -> &ObjectInfo {
        &self.info
    }

    async fn open_read(&self) -> Result<ObjectReader> {
        let sealed = self.inner.open_read().await?;
        Ok(Box::new(CryptReader::decrypt(sealed, &self.key)))
    }
}

#[async_trait]
impl StorageLocation for CryptLocation {
    fn root(&self) -> String {
        format!("crypt:{}", self.inner.root())
    }

    async fn open(&self, name: &str) -> Result<Box<dyn ObjectHandle>> {
        validate_object_name(name)?;
        let inner = self
            .inner
            .open(&Self::encrypted_name(name))
            .await
            .map_err(|e| match e {
                WatchupError::NotFound(_) => WatchupError::NotFound(name.to_string()),
                other => other,
            })?;

        Ok(Box::new(CryptObject {
            info: Self::plain_info(name, inner.info())?,
            inner,
            key: self.key.clone(),
        }))
    }

    async fn put(&self, reader: ObjectReader, source: &ObjectInfo) -> Result<ObjectInfo> {
        validate_object_name(&source.name)?;

        let sealed = CryptReader::encrypt(reader, &self.key)?;
        let sealed_info = ObjectInfo::new(
            Self::encrypted_name(&source.name),
            encrypted_size(source.size),
            source.modified,
        );

        let stored = self.inner.put(Box::new(sealed), &sealed_info).await?;
        Self::plain_info(&source.name, &stored)
    }

    async fn list(&self) -> Result<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        for encrypted in self.inner.list().await? {
            let Some(name) = Self::plain_name(&encrypted.name) else {
                continue;
            };
            if let Ok(info) = Self::plain_info(name, &encrypted) {
                objects.push(info);
            }
        }
        Ok(objects)
    }
}
