use super::baseline::single_file_plan;
use super::{require_field, BuildStep, StepPlan};
use anyhow::Result;

/// Capture a snapshot of a model or connection into a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotStep {
    pub input: String,
    pub output_file: String,
}

impl BuildStep for SnapshotStep {
    fn validate(&self) -> Result<()> {
        require_field("Input file or folder", &self.input)?;
        require_field("Output file", &self.output_file)
    }

    fn plan(&self) -> StepPlan {
        single_file_plan("snapshot", "-snapshot", &self.input, &self.output_file)
    }
}
