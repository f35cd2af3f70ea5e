//! Memory Storage Location
//!
//! プロセス内メモリ上のストレージロケーション（テストやドライラン用）

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;

use crate::domain::entities::object_info::validate_object_name;
use crate::domain::entities::ObjectInfo;
use crate::domain::errors::{Result, WatchupError};
use crate::domain::repositories::storage_location::{ObjectHandle, ObjectReader, StorageLocation};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Arc<Vec<u8>>,
    modified: DateTime<Utc>,
}

/// メモリ上のロケーション
///
/// クローンは同じ内容を共有する。
#[derive(Debug, Clone, Default)]
pub struct MemoryLocation {
    name: String,
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
}

impl MemoryLocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Arc::default(),
        }
    }

    /// オブジェクトを直接格納する
    pub fn insert(&self, name: impl Into<String>, data: Vec<u8>, modified: DateTime<Utc>) {
        self.lock().insert(
            name.into(),
            StoredObject {
                data: Arc::new(data),
                modified,
            },
        );
    }

    /// オブジェクトの内容を返す
    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().get(name).map(|o| o.data.as_ref().clone())
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredObject>> {
        // ポイズンは無視する（挿入と削除は単一操作）
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct MemoryObject {
    info: ObjectInfo,
    data: Arc<Vec<u8>>,
}

#[async_trait]
impl ObjectHandle for MemoryObject {
    fn info(&self) -> &ObjectInfo {
        &self.info
    }

    async fn open_read(&self) -> Result<ObjectReader> {
        Ok(Box::new(std::io::Cursor::new(self.data.as_ref().clone())))
    }
}

#[async_trait]
impl StorageLocation for MemoryLocation {
    fn root(&self) -> String {
        format!("memory:{}", self.name)
    }

    async fn open(&self, name: &str) -> Result<Box<dyn ObjectHandle>> {
        let stored = self
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| WatchupError::NotFound(name.to_string()))?;

        Ok(Box::new(MemoryObject {
            info: ObjectInfo::new(name, stored.data.len() as u64, stored.modified),
            data: stored.data,
        }))
    }

    async fn put(&self, mut reader: ObjectReader, source: &ObjectInfo) -> Result<ObjectInfo> {
        validate_object_name(&source.name)?;

        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        drop(reader);

        if data.len() as u64 != source.size {
            return Err(WatchupError::invalid_data(format!(
                "size mismatch for {:?}: expected {} bytes, read {}",
                source.name,
                source.size,
                data.len()
            )));
        }

        let info = ObjectInfo::new(source.name.clone(), data.len() as u64, source.modified);
        self.insert(source.name.clone(), data, source.modified);
        Ok(info)
    }

    async fn list(&self) -> Result<Vec<ObjectInfo>> {
        Ok(self
            .lock()
            .iter()
            .map(|(name, o)| ObjectInfo::new(name.clone(), o.data.len() as u64, o.modified))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let location = MemoryLocation::new("test");
        let err = location.open("nope").await.err().unwrap();
        assert!(matches!(err, WatchupError::NotFound(ref n) if n == "nope"));
    }

    #[tokio::test]
    async fn test_put_then_open() {
        let location = MemoryLocation::new("test");
        let modified = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let info = ObjectInfo::new("a.txt", 3, modified);

        location
            .put(Box::new(std::io::Cursor::new(b"abc".to_vec())), &info)
            .await
            .unwrap();

        let object = location.open("a.txt").await.unwrap();
        assert_eq!(object.info(), &info);

        let mut read = Vec::new();
        object
            .open_read()
            .await
            .unwrap()
            .read_to_end(&mut read)
            .await
            .unwrap();
        assert_eq!(read, b"abc");
    }

    #[tokio::test]
    async fn test_put_size_mismatch() {
        let location = MemoryLocation::new("test");
        let info = ObjectInfo::new("a.txt", 10, Utc::now());

        let err = location
            .put(Box::new(std::io::Cursor::new(b"abc".to_vec())), &info)
            .await
            .unwrap_err();

        assert!(matches!(err, WatchupError::Io(ref e) if e.kind() == std::io::ErrorKind::InvalidData));
        assert!(location.contents("a.txt").is_none());
    }

    #[tokio::test]
    async fn test_list_sorted_and_shared_between_clones() {
        let location = MemoryLocation::new("test");
        let clone = location.clone();
        clone.insert("b", vec![1], Utc::now());
        clone.insert("a", vec![1, 2], Utc::now());

        let names: Vec<String> = location
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(location.root(), "memory:test");
    }
}
