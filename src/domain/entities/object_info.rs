//! # ObjectInfo Value Object
//!
//! ストレージオブジェクトのメタデータ

use chrono::{DateTime, Utc};

use crate::domain::errors::{Result, WatchupError};

/// オブジェクトのメタデータ（名前、サイズ、更新時刻）
///
/// 書き込み先はこのメタデータから新しいオブジェクトの名前・サイズ・更新時刻を決定する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl ObjectInfo {
    pub fn new(name: impl Into<String>, size: u64, modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            size,
            modified,
        }
    }
}

/// フラットなロケーション内のオブジェクト名として妥当かを検証する
///
/// 空文字列、パス区切り文字を含む名前、`.` と `..` は拒否する。
///
/// ```
/// use watchup::domain::entities::object_info::validate_object_name;
///
/// assert!(validate_object_name("report.txt").is_ok());
/// assert!(validate_object_name("../etc/passwd").is_err());
/// ```
pub fn validate_object_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');

    if invalid {
        return Err(WatchupError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid object name: {:?}", name),
        )));
    }
    Ok(())
}
