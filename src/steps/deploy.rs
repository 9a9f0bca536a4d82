use super::{require_field, BuildStep, StagedInput, StepPlan};
use anyhow::Result;

/// Run a SQL script against the target described by a connection file.
///
/// The target connection goes in through `-out` but is an input like any
/// other: staged, guarded, and removed afterwards. Nothing is collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployScriptStep {
    pub script: String,
    pub target: String,
}

impl BuildStep for DeployScriptStep {
    fn validate(&self) -> Result<()> {
        require_field("Script file", &self.script)?;
        require_field("Target connection", &self.target)
    }

    fn plan(&self) -> StepPlan {
        StepPlan {
            name: "deploy",
            action: "-deploy",
            inputs: vec![
                StagedInput {
                    flag: "-in",
                    role: "IN",
                    source: self.script.clone(),
                },
                StagedInput {
                    flag: "-out",
                    role: "OUT",
                    source: self.target.clone(),
                },
            ],
            output: None,
            extra_args: Vec::new(),
        }
    }
}
