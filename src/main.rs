use anyhow::Result;
use clap::Parser;

use xnat_roi_export::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行
    let cli = Cli::parse();

    // 加载配置、初始化日志并执行命令
    cli::run(cli).await
}
