//! Pipeline Integration Tests
//!
//! 実際のディレクトリ監視とローカル/暗号化ストレージを使った統合テスト

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use watchup::adapter::notifier::FsChangeNotifier;
use watchup::adapter::storage::{BackendOptions, LocationRegistry};
use watchup::application::dto::pipeline_config::PipelineConfig;
use watchup::application::use_cases::run_pipeline::{PipelineDriver, RunPipelineUseCase};
use watchup::application::use_cases::upload_file::UploadFileUseCase;
use watchup::domain::errors::WatchupError;
use watchup::domain::repositories::change_notifier::{ChangeNotifier, Notification};
use watchup::domain::repositories::storage_location::{LocationResolver, StorageLocation};

fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// 条件が満たされるまで最大10秒待つ
async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

#[tokio::test]
async fn test_notifier_reports_close_after_write() {
    let watch_dir = TempDir::new().unwrap();
    fs::create_dir(watch_dir.path().join("nested")).unwrap();

    let mut handle = FsChangeNotifier::new()
        .start_watching(watch_dir.path())
        .unwrap();

    // サブディレクトリ内のファイルは通知されない
    fs::write(watch_dir.path().join("nested").join("ignored.txt"), "x").unwrap();
    fs::write(watch_dir.path().join("report.txt"), "hello").unwrap();

    let notification = tokio::time::timeout(Duration::from_secs(10), handle.next())
        .await
        .expect("no notification within 10s");

    match notification {
        Notification::Event(event) => assert_eq!(event.file_name, "report.txt"),
        Notification::Failed(e) => panic!("notifier failed: {}", e),
    }
}

#[tokio::test]
async fn test_written_file_is_uploaded() {
    let watch_dir = TempDir::new().unwrap();
    let dst_dir = TempDir::new().unwrap();

    let registry = LocationRegistry::with_default_backends(BackendOptions::default());
    let source = registry.resolve(&path_str(watch_dir.path())).unwrap();
    let destination = registry.resolve(&path_str(dst_dir.path())).unwrap();
    let handle = FsChangeNotifier::new()
        .start_watching(watch_dir.path())
        .unwrap();

    let shutdown = CancellationToken::new();
    let driver = PipelineDriver::new(source, destination, UploadFileUseCase::default());
    let running = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { driver.run(&shutdown, handle).await })
    };

    fs::write(watch_dir.path().join("report.txt"), "hello").unwrap();

    let uploaded = dst_dir.path().join("report.txt");
    assert!(wait_for(|| uploaded.exists()).await, "report.txt was not uploaded");
    assert_eq!(fs::read(&uploaded).unwrap(), b"hello");

    shutdown.cancel();
    let err = running.await.unwrap().unwrap_err();
    assert!(matches!(err, WatchupError::Cancelled));
}

#[tokio::test]
async fn test_written_file_is_uploaded_encrypted() {
    let watch_dir = TempDir::new().unwrap();
    let dst_dir = TempDir::new().unwrap();

    let registry = LocationRegistry::with_default_backends(BackendOptions {
        crypt_password: Some("integration".to_string()),
    });
    let source = registry.resolve(&path_str(watch_dir.path())).unwrap();
    let crypt_uri = format!("crypt:{}", path_str(dst_dir.path()));
    let destination = registry.resolve(&crypt_uri).unwrap();
    let handle = FsChangeNotifier::new()
        .start_watching(watch_dir.path())
        .unwrap();

    let shutdown = CancellationToken::new();
    let driver = PipelineDriver::new(source, destination.clone(), UploadFileUseCase::default());
    let running = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { driver.run(&shutdown, handle).await })
    };

    fs::write(watch_dir.path().join("secret.txt"), "top secret").unwrap();

    let sealed = dst_dir.path().join("secret.txt.bin");
    assert!(wait_for(|| sealed.exists()).await, "secret.txt was not uploaded");
    assert!(!dst_dir.path().join("secret.txt").exists());

    let object = destination.open("secret.txt").await.unwrap();
    assert_eq!(object.info().size, 10);
    let mut plain = String::new();
    object
        .open_read()
        .await
        .unwrap()
        .read_to_string(&mut plain)
        .await
        .unwrap();
    assert_eq!(plain, "top secret");

    shutdown.cancel();
    let _ = running.await.unwrap();
}

#[tokio::test]
async fn test_startup_fails_on_unreachable_source() {
    let watch_dir = TempDir::new().unwrap();
    let dst_dir = TempDir::new().unwrap();

    let use_case = RunPipelineUseCase::new(
        Arc::new(LocationRegistry::with_default_backends(BackendOptions::default())),
        Arc::new(FsChangeNotifier::new()),
    );
    let config = PipelineConfig::new(
        watch_dir.path(),
        "/nonexistent/watchup/source",
        path_str(dst_dir.path()),
    );

    let err = use_case
        .execute(&config, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WatchupError::Configuration(_)));
}

#[tokio::test]
async fn test_startup_fails_on_missing_watch_dir() {
    let src_dir = TempDir::new().unwrap();

    let use_case = RunPipelineUseCase::new(
        Arc::new(LocationRegistry::with_default_backends(BackendOptions::default())),
        Arc::new(FsChangeNotifier::new()),
    );
    let config = PipelineConfig::new(
        "/nonexistent/watchup/watch",
        path_str(src_dir.path()),
        "memory:dst",
    );

    let err = use_case
        .execute(&config, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WatchupError::Configuration(ref m) if m.contains("cannot watch")));
}
