use super::{
    require_field, BuildStep, Collect, OutputKind, StagedInput, StagedOutput, StepPlan,
};
use anyhow::Result;

/// Generate a SQL change script from a folder of comparison input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeScriptStep {
    pub input_folder: String,
    pub output_file: String,
}

impl BuildStep for ChangeScriptStep {
    fn validate(&self) -> Result<()> {
        require_field("Input folder", &self.input_folder)?;
        require_field("Output file", &self.output_file)
    }

    fn plan(&self) -> StepPlan {
        StepPlan {
            name: "change-script",
            action: "-sql_change",
            inputs: vec![StagedInput {
                flag: "-in",
                role: "INPUT",
                source: self.input_folder.clone(),
            }],
            output: Some(StagedOutput {
                flag: "-out",
                role: "OUTPUT",
                extension: Some("sql"),
                kind: OutputKind::File,
                collect: Collect::ToFile(self.output_file.clone()),
            }),
            extra_args: Vec::new(),
        }
    }
}
