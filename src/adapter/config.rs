//! Configuration
//!
//! JSON設定ファイルとCLI引数からの設定の読み込み

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapter::storage::BackendOptions;
use crate::application::dto::pipeline_config::PipelineConfig;

/// パスワードを上書きする環境変数
pub const CRYPT_PASSWORD_ENV: &str = "WATCHUP_CRYPT_PASSWORD";

fn default_upload_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub watch_dir: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,

    // Backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypt_password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_dir: String::new(),
            source: String::new(),
            destination: String::new(),
            upload_timeout_secs: default_upload_timeout_secs(),
            crypt_password: None,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let path = shellexpand::tilde(path).to_string();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        Ok(config)
    }

    /// 空でない値で上書きする
    pub fn merge(
        mut self,
        watch_dir: Option<String>,
        source: Option<String>,
        destination: Option<String>,
        upload_timeout_secs: Option<u64>,
    ) -> Self {
        if let Some(v) = watch_dir.filter(|v| !v.is_empty()) {
            self.watch_dir = v;
        }
        if let Some(v) = source.filter(|v| !v.is_empty()) {
            self.source = v;
        }
        if let Some(v) = destination.filter(|v| !v.is_empty()) {
            self.destination = v;
        }
        if let Some(v) = upload_timeout_secs {
            self.upload_timeout_secs = v;
        }
        self
    }

    /// 環境変数のパスワードで上書きする
    pub fn with_env_password(mut self, value: Option<String>) -> Self {
        if let Some(password) = value.filter(|v| !v.is_empty()) {
            self.crypt_password = Some(password);
        }
        self
    }

    /// 必須項目を検証してパイプライン設定に変換する
    pub fn to_pipeline_config(&self) -> Result<PipelineConfig> {
        if self.watch_dir.trim().is_empty() {
            anyhow::bail!("configuration error: watch directory is required (--dir)");
        }
        if self.source.trim().is_empty() {
            anyhow::bail!("configuration error: source location is required (--src)");
        }
        if self.destination.trim().is_empty() {
            anyhow::bail!("configuration error: destination location is required (--dst)");
        }
        if self.upload_timeout_secs == 0 {
            anyhow::bail!("configuration error: upload timeout must be positive");
        }

        let watch_dir = PathBuf::from(shellexpand::tilde(self.watch_dir.trim()).as_ref());
        let source = shellexpand::tilde(self.source.trim()).to_string();
        let destination = shellexpand::tilde(self.destination.trim()).to_string();

        Ok(PipelineConfig::new(watch_dir, source, destination)
            .with_upload_timeout(Duration::from_secs(self.upload_timeout_secs)))
    }

    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            crypt_password: self.crypt_password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        let json = r#"{
            "watch_dir": "/srv/incoming",
            "source": "/srv/incoming",
            "destination": "crypt:/mnt/backup",
            "upload_timeout_secs": 30,
            "crypt_password": "pw"
        }"#;
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.watch_dir, "/srv/incoming");
        assert_eq!(config.destination, "crypt:/mnt/backup");
        assert_eq!(config.upload_timeout_secs, 30);
        assert_eq!(config.crypt_password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_load_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"source": "/a"}"#).unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.source, "/a");
        assert_eq!(config.upload_timeout_secs, 60);
        assert!(config.crypt_password.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/watchup.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = Config::load(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_merge_overrides_non_empty_values() {
        let base = Config {
            watch_dir: "/file/watch".to_string(),
            source: "/file/src".to_string(),
            destination: "/file/dst".to_string(),
            ..Config::default()
        };

        let merged = base.merge(
            Some("/cli/watch".to_string()),
            Some(String::new()),
            None,
            Some(5),
        );

        assert_eq!(merged.watch_dir, "/cli/watch");
        assert_eq!(merged.source, "/file/src");
        assert_eq!(merged.destination, "/file/dst");
        assert_eq!(merged.upload_timeout_secs, 5);
    }

    #[test]
    fn test_env_password_overrides() {
        let config = Config {
            crypt_password: Some("file".to_string()),
            ..Config::default()
        };

        assert_eq!(
            config
                .clone()
                .with_env_password(Some("env".to_string()))
                .crypt_password
                .as_deref(),
            Some("env")
        );
        assert_eq!(
            config.with_env_password(None).crypt_password.as_deref(),
            Some("file")
        );
    }

    #[test]
    fn test_to_pipeline_config() {
        let config = Config::default().merge(
            Some("/watch".to_string()),
            Some("/src".to_string()),
            Some("memory:dst".to_string()),
            None,
        );

        let pipeline = config.to_pipeline_config().unwrap();

        assert_eq!(pipeline.watch_dir, PathBuf::from("/watch"));
        assert_eq!(pipeline.source, "/src");
        assert_eq!(pipeline.destination, "memory:dst");
        assert_eq!(pipeline.upload_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_to_pipeline_config_requires_fields() {
        let err = Config::default().to_pipeline_config().unwrap_err();
        assert!(err.to_string().contains("--dir"));

        let err = Config::default()
            .merge(Some("/w".to_string()), Some("/s".to_string()), None, None)
            .to_pipeline_config()
            .unwrap_err();
        assert!(err.to_string().contains("--dst"));
    }
}
