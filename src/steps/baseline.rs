use super::{
    require_field, BuildStep, Collect, OutputKind, StagedInput, StagedOutput, StepPlan,
};
use anyhow::Result;

/// Capture a baseline of a model or connection into a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineStep {
    pub input: String,
    pub output_file: String,
}

impl BuildStep for BaselineStep {
    fn validate(&self) -> Result<()> {
        require_field("Input file or folder", &self.input)?;
        require_field("Output file", &self.output_file)
    }

    fn plan(&self) -> StepPlan {
        single_file_plan("baseline", "-baseline", &self.input, &self.output_file)
    }
}

/// Plan shared by the steps that read one input and produce one file.
pub(super) fn single_file_plan(
    name: &'static str,
    action: &'static str,
    input: &str,
    output_file: &str,
) -> StepPlan {
    StepPlan {
        name,
        action,
        inputs: vec![StagedInput {
            flag: "-in",
            role: "INPUT",
            source: input.to_string(),
        }],
        output: Some(StagedOutput {
            flag: "-out",
            role: "TMP_OUTPUT",
            extension: None,
            kind: OutputKind::File,
            collect: Collect::ToFile(output_file.to_string()),
        }),
        extra_args: Vec::new(),
    }
}
