//! Location Registry
//!
//! スキーム名からバックエンドのコンストラクタを引くレジストリ（起動時に一度だけ解決する）
//!
//! - `local:<path>` または `<path>`: ローカルディレクトリ
//! - `memory:<name>`: プロセス内メモリ（同じレジストリ内では名前ごとに共有）
//! - `crypt:<inner uri>`: 他のロケーションを包む暗号化ロケーション

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};

use log::info;

use crate::adapter::storage::crypt::CryptLocation;
use crate::adapter::storage::local::LocalLocation;
use crate::adapter::storage::memory::MemoryLocation;
use crate::domain::errors::{Result, WatchupError};
use crate::domain::repositories::storage_location::{LocationResolver, StorageLocation};

/// バックエンドのコンストラクタ（スキームを除いた残りの部分を受け取る）
pub type Constructor = fn(&LocationRegistry, &str) -> Result<Arc<dyn StorageLocation>>;

/// バックエンド共通のオプション
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    /// crypt バックエンドのパスワード
    pub crypt_password: Option<String>,
}

/// ロケーションレジストリ
pub struct LocationRegistry {
    constructors: BTreeMap<String, Constructor>,
    options: BackendOptions,
    memory: Mutex<HashMap<String, MemoryLocation>>,
}

impl LocationRegistry {
    /// バックエンドを登録していない空のレジストリ
    pub fn new(options: BackendOptions) -> Self {
        Self {
            constructors: BTreeMap::new(),
            options,
            memory: Mutex::new(HashMap::new()),
        }
    }

    /// 組み込みのバックエンド（local, memory, crypt）を登録したレジストリ
    pub fn with_default_backends(options: BackendOptions) -> Self {
        let mut registry = Self::new(options);
        registry.register("local", local_backend);
        registry.register("memory", memory_backend);
        registry.register("crypt", crypt_backend);
        registry
    }

    /// スキームを登録する（同名のスキームは上書き）
    pub fn register(&mut self, scheme: &str, constructor: Constructor) {
        self.constructors.insert(scheme.to_string(), constructor);
    }

    /// 登録済みのスキーム名
    pub fn schemes(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    fn split_scheme<'a>(&self, uri: &'a str) -> Option<(Constructor, &'a str)> {
        let (scheme, rest) = uri.split_once(':')?;
        self.constructors.get(scheme).map(|c| (*c, rest))
    }
}

/// スキームらしい接頭辞か（`b2:bucket` など）
fn looks_like_scheme(prefix: &str) -> bool {
    prefix.len() > 1
        && prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl LocationResolver for LocationRegistry {
    fn resolve(&self, uri: &str) -> Result<Arc<dyn StorageLocation>> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(WatchupError::Configuration(
                "empty location identifier".to_string(),
            ));
        }

        let location = match self.split_scheme(uri) {
            Some((constructor, rest)) => constructor(self, rest)?,
            None => {
                if let Some((prefix, _)) = uri.split_once(':') {
                    if looks_like_scheme(prefix) && !Path::new(uri).exists() {
                        return Err(WatchupError::Configuration(format!(
                            "unknown backend {:?} in {:?} (known: {})",
                            prefix,
                            uri,
                            self.schemes().join(", ")
                        )));
                    }
                }
                local_backend(self, uri)?
            }
        };

        info!("resolved {:?} to {}", uri, location.root());
        Ok(location)
    }
}

fn local_backend(_registry: &LocationRegistry, path: &str) -> Result<Arc<dyn StorageLocation>> {
    Ok(Arc::new(LocalLocation::new(path)?))
}

fn memory_backend(registry: &LocationRegistry, name: &str) -> Result<Arc<dyn StorageLocation>> {
    if name.is_empty() {
        return Err(WatchupError::Configuration(
            "memory location needs a name".to_string(),
        ));
    }

    let mut stores = registry.memory.lock().unwrap_or_else(|e| e.into_inner());
    let location = stores
        .entry(name.to_string())
        .or_insert_with(|| MemoryLocation::new(name))
        .clone();
    Ok(Arc::new(location))
}

fn crypt_backend(registry: &LocationRegistry, inner: &str) -> Result<Arc<dyn StorageLocation>> {
    let password = registry
        .options
        .crypt_password
        .as_deref()
        .ok_or_else(|| {
            WatchupError::Configuration("crypt backend requires a password".to_string())
        })?;

    let inner = registry.resolve(inner)?;
    Ok(Arc::new(CryptLocation::new(inner, password)?))
}
