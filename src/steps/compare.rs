use super::{
    require_field, BuildStep, Collect, OutputKind, StagedInput, StagedOutput, StepPlan,
};
use anyhow::Result;

/// Compare two models (source against target) and write an HTML diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareStep {
    pub source: String,
    pub target: String,
    pub output_folder: String,
    /// Optional comparison settings file passed as `-settings`.
    pub config_file: Option<String>,
}

impl BuildStep for CompareStep {
    fn validate(&self) -> Result<()> {
        require_field("Source input", &self.source)?;
        require_field("Target input", &self.target)?;
        require_field("Output folder", &self.output_folder)
    }

    fn plan(&self) -> StepPlan {
        let mut inputs = vec![
            StagedInput {
                flag: "-in_source",
                role: "IN_SOURCE",
                source: self.source.clone(),
            },
            StagedInput {
                flag: "-in_target",
                role: "IN_TARGET",
                source: self.target.clone(),
            },
        ];
        if let Some(config) = self.config_file.as_deref().filter(|c| !c.trim().is_empty()) {
            inputs.push(StagedInput {
                flag: "-settings",
                role: "CONFIG",
                source: config.to_string(),
            });
        }
        StepPlan {
            name: "compare",
            action: "-compare",
            inputs,
            output: Some(StagedOutput {
                flag: "-out",
                role: "TMP_OUTPUT",
                extension: None,
                kind: OutputKind::Dir,
                collect: Collect::IntoDir(self.output_folder.clone()),
            }),
            extra_args: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(config_file: Option<&str>) -> CompareStep {
        CompareStep {
            source: "models/a.txt".to_string(),
            target: "models/b.txt".to_string(),
            output_folder: "out".to_string(),
            config_file: config_file.map(str::to_string),
        }
    }

    #[test]
    fn settings_are_staged_only_when_configured() {
        let flags = |plan: StepPlan| -> Vec<&'static str> {
            plan.inputs.iter().map(|input| input.flag).collect()
        };
        assert_eq!(flags(step(None).plan()), ["-in_source", "-in_target"]);
        assert_eq!(flags(step(Some("  ")).plan()), ["-in_source", "-in_target"]);
        assert_eq!(
            flags(step(Some("cmp.xml")).plan()),
            ["-in_source", "-in_target", "-settings"]
        );
    }

    #[test]
    fn empty_output_folder_is_rejected() {
        let mut step = step(None);
        step.output_folder = String::new();
        let err = step.validate().unwrap_err();
        assert_eq!(err.to_string(), "Output folder must not be empty");
    }
}
