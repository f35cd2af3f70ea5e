//! Local Storage Location
//!
//! ローカルファイルシステムのフラットなディレクトリをストレージロケーションとして扱う実装

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

use crate::domain::entities::object_info::validate_object_name;
use crate::domain::entities::ObjectInfo;
use crate::domain::errors::{Result, WatchupError};
use crate::domain::repositories::storage_location::{ObjectHandle, ObjectReader, StorageLocation};

/// 書き込み中の一時ファイルの接尾辞
const PARTIAL_SUFFIX: &str = ".partial";

/// ローカルディレクトリのロケーション
#[derive(Debug, Clone)]
pub struct LocalLocation {
    root: PathBuf,
}

impl LocalLocation {
    /// ロケーションを作成する
    ///
    /// # Errors
    ///
    /// ルートが存在しない、またはディレクトリでない場合に `Configuration` を返す
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let expanded = PathBuf::from(shellexpand::tilde(&root.to_string_lossy()).as_ref());

        match std::fs::metadata(&expanded) {
            Ok(meta) if meta.is_dir() => Ok(Self { root: expanded }),
            Ok(_) => Err(WatchupError::Configuration(format!(
                "not a directory: {}",
                expanded.display()
            ))),
            Err(e) => Err(WatchupError::Configuration(format!(
                "cannot access {}: {}",
                expanded.display(),
                e
            ))),
        }
    }

    fn object_path(&self, name: &str) -> Result<PathBuf> {
        validate_object_name(name)?;
        Ok(self.root.join(name))
    }

    fn partial_path(&self, name: &str) -> PathBuf {
        self.root
            .join(format!(".{}.{}{}", name, uuid::Uuid::new_v4(), PARTIAL_SUFFIX))
    }

    /// ディレクトリ直下の通常ファイルを列挙する（同期処理）
    fn list_sync(root: &Path) -> Result<Vec<ObjectInfo>> {
        let mut objects = Vec::new();

        for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| WatchupError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            // 隠しファイルと書き込み中の一時ファイルは対象外
            if name.starts_with('.') {
                continue;
            }

            let meta = entry.metadata().map_err(|e| WatchupError::Io(e.into()))?;
            objects.push(ObjectInfo::new(name, meta.len(), modified_time(&meta)));
        }

        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }
}

fn modified_time(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::<Utc>::from(SystemTime::UNIX_EPOCH))
}

/// 書き込み中の一時ファイル。確定前に落とされたら削除する
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    /// 本来の名前にリネームして確定する
    async fn commit(mut self, target: &Path) -> Result<()> {
        tokio::fs::rename(&self.path, target).await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!("failed to remove {}: {}", self.path.display(), e);
        }
    }
}

struct LocalObject {
    info: ObjectInfo,
    path: PathBuf,
}

#[async_trait]
impl ObjectHandle for LocalObject {
    fn info(&self) -> &ObjectInfo {
        &self.info
    }

    async fn open_read(&self) -> Result<ObjectReader> {
        let file = tokio::fs::File::open(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WatchupError::NotFound(self.info.name.clone())
            } else {
                WatchupError::Io(e)
            }
        })?;
        Ok(Box::new(file))
    }
}

#[async_trait]
impl StorageLocation for LocalLocation {
    fn root(&self) -> String {
        self.root.display().to_string()
    }

    async fn open(&self, name: &str) -> Result<Box<dyn ObjectHandle>> {
        let path = self.object_path(name)?;

        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(WatchupError::NotFound(name.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WatchupError::NotFound(name.to_string()))
            }
            Err(e) => return Err(WatchupError::Io(e)),
        };

        Ok(Box::new(LocalObject {
            info: ObjectInfo::new(name, meta.len(), modified_time(&meta)),
            path,
        }))
    }

    async fn put(&self, mut reader: ObjectReader, source: &ObjectInfo) -> Result<ObjectInfo> {
        let target = self.object_path(&source.name)?;
        let partial = PartialFile::new(self.partial_path(&source.name));

        let mut file = tokio::fs::File::create(&partial.path).await?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        drop(reader);

        if written != source.size {
            return Err(WatchupError::invalid_data(format!(
                "size mismatch for {:?}: expected {} bytes, copied {}",
                source.name, source.size, written
            )));
        }

        file.flush().await?;
        file.sync_all().await?;

        let file = file.into_std().await;
        let modified = SystemTime::from(source.modified);
        tokio::task::spawn_blocking(move || file.set_modified(modified))
            .await
            .map_err(|e| WatchupError::Io(std::io::Error::other(e)))??;

        partial.commit(&target).await?;
        debug!("wrote {} ({} bytes)", target.display(), written);

        Ok(ObjectInfo::new(source.name.clone(), written, source.modified))
    }

    async fn list(&self) -> Result<Vec<ObjectInfo>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || Self::list_sync(&root))
            .await
            .map_err(|e| WatchupError::Io(std::io::Error::other(e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_new_missing_root() {
        let err = LocalLocation::new("/nonexistent/watchup/root").unwrap_err();
        assert!(matches!(err, WatchupError::Configuration(_)));
    }

    #[test]
    fn test_new_root_is_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("plain");
        fs::write(&file, "x").unwrap();

        let err = LocalLocation::new(&file).unwrap_err();
        assert!(matches!(err, WatchupError::Configuration(ref m) if m.contains("not a directory")));
    }

    #[tokio::test]
    async fn test_open_and_read() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("report.txt"), "hello").unwrap();
        let location = LocalLocation::new(temp_dir.path()).unwrap();

        let object = location.open("report.txt").await.unwrap();
        assert_eq!(object.info().name, "report.txt");
        assert_eq!(object.info().size, 5);

        let mut content = String::new();
        object
            .open_read()
            .await
            .unwrap()
            .read_to_string(&mut content)
            .await
            .unwrap();
        assert_eq!(content, "hello");
    }

    #[tokio::test]
    async fn test_open_missing_and_directory_are_not_found() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("subdir")).unwrap();
        let location = LocalLocation::new(temp_dir.path()).unwrap();

        let missing = location.open("missing.txt").await.err().unwrap();
        assert!(matches!(missing, WatchupError::NotFound(_)));

        let dir = location.open("subdir").await.err().unwrap();
        assert!(matches!(dir, WatchupError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_open_rejects_path_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let location = LocalLocation::new(temp_dir.path()).unwrap();

        let err = location.open("../escape").await.err().unwrap();
        assert!(matches!(err, WatchupError::Io(ref e) if e.kind() == std::io::ErrorKind::InvalidInput));
    }

    #[tokio::test]
    async fn test_put_writes_content_and_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let location = LocalLocation::new(temp_dir.path()).unwrap();
        let modified = Utc.with_ymd_and_hms(2024, 12, 25, 10, 0, 0).unwrap();
        let info = ObjectInfo::new("report.txt", 5, modified);

        let stored = location
            .put(Box::new(std::io::Cursor::new(b"hello".to_vec())), &info)
            .await
            .unwrap();

        assert_eq!(stored, info);
        let path = temp_dir.path().join("report.txt");
        assert_eq!(fs::read(&path).unwrap(), b"hello");
        let mtime: DateTime<Utc> = fs::metadata(&path).unwrap().modified().unwrap().into();
        assert_eq!(mtime, modified);
    }

    #[tokio::test]
    async fn test_put_size_mismatch_leaves_no_object() {
        let temp_dir = TempDir::new().unwrap();
        let location = LocalLocation::new(temp_dir.path()).unwrap();
        let info = ObjectInfo::new("short.txt", 100, Utc::now());

        let err = location
            .put(Box::new(std::io::Cursor::new(b"hello".to_vec())), &info)
            .await
            .unwrap_err();

        assert!(matches!(err, WatchupError::Io(_)));
        assert!(!temp_dir.path().join("short.txt").exists());
        assert!(location.list().await.unwrap().is_empty());
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_put_removes_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let location = LocalLocation::new(temp_dir.path()).unwrap();
        let info = ObjectInfo::new("slow.txt", 100, Utc::now());

        let (reader, mut writer) = tokio::io::duplex(64);
        writer.write_all(b"partial").await.unwrap();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            location.put(Box::new(reader), &info),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
        drop(writer);
    }

    #[tokio::test]
    async fn test_list_flat_sorted_without_hidden() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.txt"), "bb").unwrap();
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        fs::write(temp_dir.path().join(".a.txt.1234.partial"), "").unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested").join("c.txt"), "c").unwrap();
        let location = LocalLocation::new(temp_dir.path()).unwrap();

        let objects = location.list().await.unwrap();
        let names: Vec<&str> = objects.iter().map(|o| o.name.as_str()).collect();

        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(objects[1].size, 2);
    }
}
