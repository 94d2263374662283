use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::compare::ZeroPolicy;
use crate::stage::Stage;

#[derive(Parser, Debug)]
#[command(
    name = "manifest-drift",
    version,
    about = "Statistical analysis of generated deployment manifests across pipeline stages"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Analyze(AnalyzeArgs),
    Drift(DriftArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AnalysisOptions {
    #[arg(long, default_value_t = 0.05)]
    pub alpha: f64,

    #[arg(long, default_value_t = 3)]
    pub min_pairs: usize,

    #[arg(long, default_value_t = 2)]
    pub min_group_size: usize,

    #[arg(long, value_enum, default_value_t = ZeroPolicy::Exclude)]
    pub zero_policy: ZeroPolicy,

    #[arg(long = "unknown-severity-as-error", default_value_t = false)]
    pub unknown_severity_as_error: bool,

    #[arg(long, default_value_t = Stage::WithoutIr)]
    pub drift_baseline: Stage,

    #[arg(long, default_value_t = Stage::WithOverrides)]
    pub drift_final: Stage,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    pub metrics_json: PathBuf,

    #[arg(long)]
    pub diff_json: Option<PathBuf>,

    #[arg(long)]
    pub repo_csv: Option<PathBuf>,

    #[arg(long, default_value = "analysis/report.json")]
    pub report_path: PathBuf,

    #[command(flatten)]
    pub options: AnalysisOptions,
}

#[derive(Args, Debug, Clone)]
pub struct DriftArgs {
    pub diff_json: PathBuf,

    #[arg(long, default_value = "analysis/drift_report.json")]
    pub report_path: PathBuf,

    #[command(flatten)]
    pub options: AnalysisOptions,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    pub metrics_json: PathBuf,

    #[arg(long)]
    pub diff_json: Option<PathBuf>,
}
