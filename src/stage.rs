use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    WithoutIr,
    WithIr,
    WithIrCorrected,
    WithOverrides,
    WithOverridesCorrected,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::WithoutIr,
        Stage::WithIr,
        Stage::WithIrCorrected,
        Stage::WithOverrides,
        Stage::WithOverridesCorrected,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::WithoutIr => "without_ir",
            Self::WithIr => "with_ir",
            Self::WithIrCorrected => "with_ir_corrected",
            Self::WithOverrides => "with_overrides",
            Self::WithOverridesCorrected => "with_overrides_corrected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::WithoutIr => "Without IR",
            Self::WithIr => "With IR",
            Self::WithIrCorrected => "With IR Corrected",
            Self::WithOverrides => "IR With Overrides",
            Self::WithOverridesCorrected => "IR With Overrides Corrected",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.key() == key)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::from_key(&normalized).ok_or_else(|| {
            let known = Self::ALL.map(Stage::key).join(", ");
            format!("unknown stage `{raw}` (expected one of: {known})")
        })
    }
}

pub fn present_in_order<I>(stages: I) -> Vec<Stage>
where
    I: IntoIterator<Item = Stage>,
{
    stages
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_keys_round_trip_through_from_str() {
        for stage in Stage::ALL {
            assert_eq!(stage.key().parse::<Stage>(), Ok(stage));
        }
        assert_eq!("With-IR".parse::<Stage>(), Ok(Stage::WithIr));
    }

    #[test]
    fn unknown_stage_lists_known_keys() {
        let error = "with_magic".parse::<Stage>().expect_err("unknown stage");
        assert!(error.contains("without_ir"), "unexpected error: {error}");
    }

    #[test]
    fn present_in_order_sorts_and_deduplicates() {
        let stages = present_in_order([
            Stage::WithOverrides,
            Stage::WithoutIr,
            Stage::WithOverrides,
            Stage::WithIr,
        ]);
        assert_eq!(
            stages,
            vec![Stage::WithoutIr, Stage::WithIr, Stage::WithOverrides]
        );
    }
}
