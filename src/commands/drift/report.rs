use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::drift::DriftSection;
use crate::model::InputFile;

#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub report_version: String,
    pub run_id: String,
    pub generated_at: String,
    pub inputs: Vec<InputFile>,
    pub applications: usize,
    pub config: AnalysisConfig,
    pub drift: DriftSection,
}
