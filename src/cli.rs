//! 命令行入口
//!
//! 查看器状态（测量、分割、图像缓存、会话映射）从 JSON 快照文件加载

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::clients::XnatClient;
use crate::config::Config;
use crate::infrastructure::ViewerState;
use crate::models::loaders::{load_collection_file, load_snapshot};
use crate::orchestrator::{
    export_segmentation, export_segmentation_csv, store_measurements, CommandContext,
};
use crate::services::measurement_importer::import_collection;
use crate::services::notifier::TracingNotifier;
use crate::services::prompt::TerminalPrompt;
use crate::utils::logging;

#[derive(Debug, Parser)]
#[command(name = "xnat-roi-export")]
#[command(about = "Export OHIF measurements and segmentations to XNAT ROI collections")]
pub struct Cli {
    /// TOML 配置文件
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 查看器状态快照
    #[arg(short, long, global = true, default_value = "snapshot.json")]
    pub snapshot: PathBuf,

    /// 集合名称（不再询问）
    #[arg(short, long, global = true)]
    pub label: Option<String>,

    /// 集合已存在时直接覆盖
    #[arg(short, long, global = true, conflicts_with = "no")]
    pub yes: bool,

    /// 集合已存在时不覆盖
    #[arg(long, global = true)]
    pub no: bool,

    /// 只保存到本地，不上传
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// 详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 导出当前全部测量
    ExportMeasurements,
    /// 导出分割为 DICOM-SEG
    ExportSegmentation {
        /// 分割 ID
        id: String,
        /// 参考序列 UID，缺省为当前序列
        #[arg(long)]
        series: Option<String>,
    },
    /// 导出分割统计 CSV
    SegmentationCsv {
        /// 分割 ID
        id: String,
    },
    /// 读取测量集合文件并输出测量 JSON
    ImportMeasurements {
        /// 集合文件
        file: PathBuf,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::ExportMeasurements => "export-measurements",
            Command::ExportSegmentation { .. } => "export-segmentation",
            Command::SegmentationCsv { .. } => "segmentation-csv",
            Command::ImportMeasurements { .. } => "import-measurements",
        }
    }
}

impl Cli {
    /// 覆盖确认的预设答案
    pub fn preset_confirm(&self) -> Option<bool> {
        match (self.yes, self.no) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    /// 配置文件 + 环境变量 + 命令行开关
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref()).context("加载配置失败")?;
        config.dry_run |= self.dry_run;
        config.verbose_logging |= self.verbose;
        Ok(config)
    }
}

/// 执行命令
pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    logging::init(config.verbose_logging);
    logging::log_startup(cli.command.name(), &config.xnat_root_url, config.dry_run);

    if let Command::ImportMeasurements { file } = &cli.command {
        return import_measurements(file).await;
    }

    let snapshot = load_snapshot(&cli.snapshot)
        .await
        .with_context(|| format!("无法加载快照 {}", cli.snapshot.display()))?;
    let viewer = ViewerState::from_snapshot(snapshot);

    let notifier = TracingNotifier;
    let prompt = TerminalPrompt::new()
        .with_label(cli.label.clone())
        .with_confirm(cli.preset_confirm());
    let uploader = XnatClient::new(&config).context("创建 XNAT 客户端失败")?;
    let ctx = CommandContext::from_viewer(&config, &viewer, &notifier, &prompt, &uploader);

    match &cli.command {
        Command::ExportMeasurements => {
            let outcome = store_measurements(&ctx).await?;
            logging::log_export_summary(cli.command.name(), &outcome);
        }
        Command::ExportSegmentation { id, series } => {
            let outcome = export_segmentation(id, series.as_deref(), &ctx).await?;
            logging::log_export_summary(cli.command.name(), &outcome);
        }
        Command::SegmentationCsv { id } => {
            let csv = export_segmentation_csv(id, &ctx).await?;
            info!("✓ CSV 共 {} 行", csv.lines().count());
        }
        Command::ImportMeasurements { .. } => {}
    }

    Ok(())
}

async fn import_measurements(file: &Path) -> Result<()> {
    let bytes = load_collection_file(file).await?;
    let measurements = import_collection(&bytes)
        .with_context(|| format!("无法解析测量集合 {}", file.display()))?;
    info!("✓ 已导入 {} 个测量", measurements.len());
    println!("{}", serde_json::to_string_pretty(&measurements)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export_segmentation() {
        let cli = Cli::try_parse_from([
            "xnat-roi-export",
            "--snapshot",
            "state.json",
            "export-segmentation",
            "seg-1",
            "--series",
            "1.2.3",
            "--yes",
        ])
        .unwrap();

        assert_eq!(cli.snapshot, PathBuf::from("state.json"));
        assert_eq!(cli.preset_confirm(), Some(true));
        match cli.command {
            Command::ExportSegmentation { id, series } => {
                assert_eq!(id, "seg-1");
                assert_eq!(series.as_deref(), Some("1.2.3"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_yes_and_no_conflict() {
        let result = Cli::try_parse_from(["xnat-roi-export", "--yes", "--no", "export-measurements"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["xnat-roi-export", "segmentation-csv", "seg-1"]).unwrap();
        assert_eq!(cli.snapshot, PathBuf::from("snapshot.json"));
        assert_eq!(cli.preset_confirm(), None);
        assert_eq!(cli.command.name(), "segmentation-csv");
    }
}
