//! # Use Cases
//!
//! アプリケーションのフロー（ユースケース）
//!
//! ## ユースケース
//!
//! - **UploadFileUseCase**: ファイル1件の時間予算付きアップロード
//! - **RunPipelineUseCase / PipelineDriver**: イベントループ

pub mod run_pipeline;
pub mod upload_file;
