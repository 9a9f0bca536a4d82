use super::{
    require_field, BuildStep, Collect, OutputKind, StagedInput, StagedOutput, StepPlan,
};
use crate::report::REPORT_DIR_NAME;
use anyhow::Result;

/// Which flavor of report the tool renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportKind {
    /// Stored with the build and exposed under `comparehtmlreport`.
    Jenkins,
    /// Copied into the given output folder.
    Standalone { output_folder: String },
}

impl ReportKind {
    fn type_arg(&self) -> &'static str {
        match self {
            ReportKind::Jenkins => "JENKINS",
            ReportKind::Standalone { .. } => "STANDALONE",
        }
    }
}

/// Render an HTML report from a comparison result folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportStep {
    pub input_folder: String,
    pub kind: ReportKind,
}

impl BuildStep for ReportStep {
    fn validate(&self) -> Result<()> {
        require_field("Input folder", &self.input_folder)?;
        if let ReportKind::Standalone { output_folder } = &self.kind {
            require_field("Output folder", output_folder)?;
        }
        Ok(())
    }

    fn plan(&self) -> StepPlan {
        let (role, collect) = match &self.kind {
            ReportKind::Jenkins => (REPORT_DIR_NAME, Collect::BuildReport),
            ReportKind::Standalone { output_folder } => {
                ("TMP_OUTPUT", Collect::IntoDir(output_folder.clone()))
            }
        };
        StepPlan {
            name: "report",
            action: "-report",
            inputs: vec![StagedInput {
                flag: "-in",
                role: "TMP_INPUT",
                source: self.input_folder.clone(),
            }],
            output: Some(StagedOutput {
                flag: "-out",
                role,
                extension: None,
                kind: OutputKind::Dir,
                collect,
            }),
            extra_args: vec![("-type", self.kind.type_arg().to_string())],
        }
    }
}
