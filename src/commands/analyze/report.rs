use serde::Serialize;

use crate::agreement::StageAgreement;
use crate::config::AnalysisConfig;
use crate::drift::DriftSection;
use crate::model::InputFile;
use crate::stage::Stage;

use super::effort::EffortSection;
use super::metadata::MetadataSection;
use super::outcomes::OutcomeSection;
use super::security::SecuritySection;

#[derive(Debug, Clone, Serialize)]
pub struct ReportSections {
    pub metadata: Option<MetadataSection>,
    pub outcomes: Option<OutcomeSection>,
    pub effort: Option<EffortSection>,
    pub security: Option<SecuritySection>,
    pub alignment: Option<Vec<StageAgreement>>,
    pub drift: Option<DriftSection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub report_version: String,
    pub run_id: String,
    pub generated_at: String,
    pub inputs: Vec<InputFile>,
    pub stages: Vec<Stage>,
    pub applications: usize,
    pub config: AnalysisConfig,
    pub sections: ReportSections,
}
