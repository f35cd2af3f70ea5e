//! CLI Argument Parsing
//!
//! CLIの引数解析

use clap::Parser;

/// 監視ディレクトリに書き込まれたファイルをアップロード先に転送するCLI
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "watchup")]
#[command(about = "Upload files from a watched directory as soon as they are written", long_about = None)]
pub struct Args {
    /// Directory to watch for file uploads
    #[arg(long)]
    pub dir: Option<String>,

    /// Location to upload from
    #[arg(long)]
    pub src: Option<String>,

    /// Location to upload to
    #[arg(long)]
    pub dst: Option<String>,

    /// Per-file upload timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Config file path
    #[arg(short, long)]
    pub config: Option<String>,
}
