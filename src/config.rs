use anyhow::{Result, bail};
use serde::Serialize;

use crate::cli::AnalysisOptions;
use crate::compare::{Hypothesis, PairedConfig, UnpairedConfig, ZeroPolicy};
use crate::drift::{ClassifierPolicy, DriftConfig};
use crate::stage::Stage;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisConfig {
    pub alpha: f64,
    pub min_pairs: usize,
    pub min_group_size: usize,
    pub zero_policy: ZeroPolicy,
    pub unknown_severity_is_error: bool,
    pub drift_baseline: Stage,
    pub drift_final: Stage,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            min_pairs: 3,
            min_group_size: 2,
            zero_policy: ZeroPolicy::Exclude,
            unknown_severity_is_error: false,
            drift_baseline: Stage::WithoutIr,
            drift_final: Stage::WithOverrides,
        }
    }
}

impl From<&AnalysisOptions> for AnalysisConfig {
    fn from(options: &AnalysisOptions) -> Self {
        Self {
            alpha: options.alpha,
            min_pairs: options.min_pairs,
            min_group_size: options.min_group_size,
            zero_policy: options.zero_policy,
            unknown_severity_is_error: options.unknown_severity_as_error,
            drift_baseline: options.drift_baseline,
            drift_final: options.drift_final,
        }
    }
}

impl AnalysisConfig {
    pub fn from_options(options: &AnalysisOptions) -> Result<Self> {
        let config = Self::from(options);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            bail!("alpha must be in (0, 1), got {}", self.alpha);
        }
        if self.min_pairs < 1 {
            bail!("min_pairs must be >= 1, got {}", self.min_pairs);
        }
        if self.min_group_size < 2 {
            bail!("min_group_size must be >= 2, got {}", self.min_group_size);
        }
        if self.drift_baseline == self.drift_final {
            bail!(
                "drift baseline and final stage must differ (both are {})",
                self.drift_baseline
            );
        }
        Ok(())
    }

    pub fn paired(&self, hypothesis: Hypothesis) -> PairedConfig {
        PairedConfig {
            min_pairs: self.min_pairs,
            zero_policy: self.zero_policy,
            hypothesis,
            alpha: self.alpha,
        }
    }

    pub fn unpaired(&self) -> UnpairedConfig {
        UnpairedConfig {
            min_group_size: self.min_group_size,
            hypothesis: Hypothesis::TwoSided,
            alpha: self.alpha,
        }
    }

    pub fn drift(&self) -> DriftConfig {
        DriftConfig {
            policy: ClassifierPolicy {
                unknown_severity_is_error: self.unknown_severity_is_error,
            },
            baseline: self.drift_baseline,
            final_stage: self.drift_final,
            paired: self.paired(Hypothesis::TwoSided),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.drift(), DriftConfig::default());
        assert_eq!(config.unpaired(), UnpairedConfig::default());
        assert_eq!(config.paired(Hypothesis::TwoSided), PairedConfig::default());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let bad_alpha = AnalysisConfig {
            alpha: 1.0,
            ..AnalysisConfig::default()
        };
        let error = bad_alpha.validate().expect_err("alpha");
        assert!(error.to_string().contains("alpha"));

        let bad_pairs = AnalysisConfig {
            min_pairs: 0,
            ..AnalysisConfig::default()
        };
        assert!(bad_pairs.validate().is_err());

        let bad_groups = AnalysisConfig {
            min_group_size: 1,
            ..AnalysisConfig::default()
        };
        assert!(bad_groups.validate().is_err());

        let same_stage = AnalysisConfig {
            drift_final: Stage::WithoutIr,
            ..AnalysisConfig::default()
        };
        assert!(same_stage.validate().is_err());
    }

    #[test]
    fn drift_config_carries_policy_and_stages() {
        let config = AnalysisConfig {
            unknown_severity_is_error: true,
            zero_policy: ZeroPolicy::Pratt,
            drift_final: Stage::WithOverridesCorrected,
            ..AnalysisConfig::default()
        };
        let drift = config.drift();
        assert!(drift.policy.unknown_severity_is_error);
        assert_eq!(drift.final_stage, Stage::WithOverridesCorrected);
        assert_eq!(drift.paired.zero_policy, ZeroPolicy::Pratt);
    }
}
