use super::*;
use crate::config::GlobalConfig;
use crate::context::Platform;
use crate::invoke::testing::{flag_value, write_cli_zip, FakeLauncher, FakeOutput};
use crate::report::{load_build_record, REPORT_DIR_NAME};
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    ctx: BuildContext,
    config: GlobalConfig,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("ws");
        fs::create_dir_all(workspace.join("models/src/tables")).unwrap();
        fs::write(workspace.join("models/src/schema.sql"), "create schema s;").unwrap();
        fs::write(workspace.join("models/src/tables/t.sql"), "create table t;").unwrap();
        fs::write(workspace.join("models/tgt.txt"), "target").unwrap();

        let archive = temp.path().join("toad-edge-cli.zip");
        write_cli_zip(&archive, true);

        let mut ctx = BuildContext::new(workspace, temp.path().join("builds/7"), 7);
        ctx.platform = Platform::Unix;
        ctx.env
            .insert("JAVA_HOME".to_string(), "/opt/jdk".to_string());
        let config = GlobalConfig {
            libs: Some(archive),
            ..GlobalConfig::default()
        };
        Self {
            _temp: temp,
            ctx,
            config,
        }
    }

    fn run(&self, fake: &FakeLauncher, step: &dyn BuildStep) -> (Result<StepOutcome>, String) {
        let (log, buffer) = BuildLog::capture();
        let runner = StepRunner::new(&self.ctx, Invoker::new(&self.config, fake), &log);
        let result = runner.run(step);
        (result, buffer.contents())
    }

    /// Workspace entries that are not part of the fixture itself.
    fn leftovers(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.ctx.workspace)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| !matches!(name.as_str(), "models" | "workspace" | "out"))
            .collect();
        names.sort();
        names
    }
}

fn compare(src: &str) -> CompareStep {
    CompareStep {
        source: src.to_string(),
        target: "${WORKSPACE}/models/tgt.txt".to_string(),
        output_folder: "${WORKSPACE}/out/diff".to_string(),
        config_file: None,
    }
}

#[test]
fn compare_stages_inputs_collects_output_and_cleans_up() {
    let fx = Fixture::new();
    let fake = FakeLauncher::new(0, Some(FakeOutput::Dir));
    let (result, log) = fx.run(&fake, &compare("models/src"));

    assert!(result.unwrap().success());
    let argv = fake.last_call();
    assert!(flag_value(&argv, "-in_source")
        .unwrap()
        .ends_with("/IN_SOURCE7/"));
    assert!(flag_value(&argv, "-in_target")
        .unwrap()
        .ends_with("/IN_TARGET7.txt"));
    assert!(flag_value(&argv, "-out").unwrap().ends_with("/TMP_OUTPUT7/"));
    assert_eq!(argv.last().map(String::as_str), Some("-compare"));

    let out = fx.ctx.workspace.join("out/diff");
    assert!(out.join("index.html").is_file());
    assert!(out.join("css/site.css").is_file());
    assert!(fx.leftovers().is_empty(), "left behind: {:?}", fx.leftovers());
    assert!(log.contains("Copying finished"));
    assert!(log.contains("Deleting "));
}

#[test]
fn inputs_outside_workspace_are_rejected_before_anything_is_staged() {
    let fx = Fixture::new();
    let outside = fx.ctx.build_dir.join("elsewhere.txt");
    fs::create_dir_all(&fx.ctx.build_dir).unwrap();
    fs::write(&outside, "x").unwrap();

    let mut step = compare("models/src");
    step.target = outside.to_string_lossy().into_owned();
    let fake = FakeLauncher::new(0, Some(FakeOutput::Dir));
    let (result, _) = fx.run(&fake, &step);

    let err = result.unwrap_err();
    assert!(err
        .to_string()
        .contains("should be inside project workspace directory"));
    assert!(fake.calls.borrow().is_empty());
    assert!(fx.leftovers().is_empty(), "left behind: {:?}", fx.leftovers());
}

#[test]
fn empty_required_field_fails_before_filesystem_access() {
    let fx = Fixture::new();
    let fake = FakeLauncher::new(0, None);
    let step = BaselineStep {
        input: String::new(),
        output_file: "base.axbl".to_string(),
    };
    let (result, log) = fx.run(&fake, &step);
    assert_eq!(
        result.unwrap_err().to_string(),
        "Input file or folder must not be empty"
    );
    assert!(log.is_empty());
    assert!(fx.leftovers().is_empty());
}

#[test]
fn missing_input_is_an_error() {
    let fx = Fixture::new();
    let fake = FakeLauncher::new(0, None);
    let step = SnapshotStep {
        input: "models/absent.txt".to_string(),
        output_file: "snap.tedg".to_string(),
    };
    let (result, _) = fx.run(&fake, &step);
    assert!(result.unwrap_err().to_string().contains("does not exist"));
    assert!(fake.calls.borrow().is_empty());
}

#[test]
fn nonzero_exit_code_reports_failure_and_still_cleans_up() {
    let fx = Fixture::new();
    let fake = FakeLauncher::new(3, None);
    let step = BaselineStep {
        input: "models/tgt.txt".to_string(),
        output_file: "${WORKSPACE}/out/base.axbl".to_string(),
    };
    let (result, log) = fx.run(&fake, &step);

    let outcome = result.unwrap();
    assert!(!outcome.success());
    assert_eq!(outcome.exit_code, 3);
    assert!(!fx.ctx.workspace.join("out/base.axbl").exists());
    assert!(fx.leftovers().is_empty(), "left behind: {:?}", fx.leftovers());
    assert!(log.contains("No output produced"));
    assert!(log.contains("baseline failed with exit code 3"));
}

#[test]
fn snapshot_output_file_is_copied_to_destination() {
    let fx = Fixture::new();
    let fake = FakeLauncher::new(0, Some(FakeOutput::File));
    let step = SnapshotStep {
        input: "./models/tgt.txt".to_string(),
        output_file: "${JOB_ROOT_DIR}/snapshots/s.tedg".to_string(),
    };
    let (result, _) = fx.run(&fake, &step);

    assert!(result.unwrap().success());
    assert_eq!(
        fs::read_to_string(fx.ctx.build_dir.join("snapshots/s.tedg")).unwrap(),
        "tool output"
    );
    assert!(fake.last_call().iter().any(|arg| arg == "-snapshot"));
    assert!(fx.leftovers().is_empty());
}

#[test]
fn success_without_output_is_an_error_after_cleanup() {
    let fx = Fixture::new();
    let fake = FakeLauncher::new(0, None);
    let step = BaselineStep {
        input: "models/src".to_string(),
        output_file: "base.axbl".to_string(),
    };
    let (result, _) = fx.run(&fake, &step);
    assert!(result.unwrap_err().to_string().contains("wrote nothing"));
    assert!(fx.leftovers().is_empty(), "left behind: {:?}", fx.leftovers());
}

#[test]
fn collection_failure_is_returned_after_cleanup() {
    let fx = Fixture::new();
    fs::write(fx.ctx.workspace.join("blocker"), "not a dir").unwrap();
    let fake = FakeLauncher::new(0, Some(FakeOutput::File));
    let step = ChangeScriptStep {
        input_folder: "models/src".to_string(),
        output_file: "blocker/change.sql".to_string(),
    };
    let (result, _) = fx.run(&fake, &step);
    assert!(result.is_err());
    assert_eq!(fx.leftovers(), ["blocker"]);
}

#[test]
fn change_script_writes_sql_temp_and_collects_it() {
    let fx = Fixture::new();
    let fake = FakeLauncher::new(0, Some(FakeOutput::File));
    let step = ChangeScriptStep {
        input_folder: "${WORKSPACE}\\models\\src".to_string(),
        output_file: "out/change.sql".to_string(),
    };
    let (result, _) = fx.run(&fake, &step);

    assert!(result.unwrap().success());
    let argv = fake.last_call();
    assert!(flag_value(&argv, "-in").unwrap().ends_with("/INPUT7/"));
    assert!(flag_value(&argv, "-out").unwrap().ends_with("/OUTPUT7.sql"));
    assert_eq!(argv.last().map(String::as_str), Some("-sql_change"));
    assert!(fx.ctx.workspace.join("out/change.sql").is_file());
    assert!(fx.leftovers().is_empty());
}

#[test]
fn deploy_stages_script_and_connection_without_collecting() {
    let fx = Fixture::new();
    fs::write(fx.ctx.workspace.join("deploy.sql"), "alter table t;").unwrap();
    fs::write(fx.ctx.workspace.join("target.json"), "{}").unwrap();
    let fake = FakeLauncher::new(0, None);
    let step = DeployScriptStep {
        script: "deploy.sql".to_string(),
        target: "${WORKSPACE}/target.json".to_string(),
    };
    let (result, _) = fx.run(&fake, &step);

    assert!(result.unwrap().success());
    let argv = fake.last_call();
    assert!(flag_value(&argv, "-in").unwrap().ends_with("/IN7.sql"));
    assert!(flag_value(&argv, "-out").unwrap().ends_with("/OUT7.json"));
    assert_eq!(argv.last().map(String::as_str), Some("-deploy"));
    assert_eq!(fx.leftovers(), ["deploy.sql", "target.json"]);
}

#[test]
fn jenkins_report_is_published_on_the_build() {
    let fx = Fixture::new();
    let fake = FakeLauncher::new(0, Some(FakeOutput::Dir));
    let step = ReportStep {
        input_folder: "models/src".to_string(),
        kind: ReportKind::Jenkins,
    };
    let (result, _) = fx.run(&fake, &step);

    let outcome = result.unwrap();
    let published = outcome.report.unwrap();
    assert_eq!(published.report_dir, fx.ctx.build_dir.join(REPORT_DIR_NAME));
    assert!(published.report_dir.join("index.html").is_file());
    let argv = fake.last_call();
    assert!(flag_value(&argv, "-out")
        .unwrap()
        .ends_with("/JENKINS_REPORT7/"));
    assert_eq!(flag_value(&argv, "-type"), Some("JENKINS"));
    let record = load_build_record(&fx.ctx.build_dir).unwrap().unwrap();
    assert_eq!(record.actions.len(), 2);
    assert!(fx.leftovers().is_empty());
}

#[test]
fn failed_jenkins_report_is_not_published() {
    let fx = Fixture::new();
    let fake = FakeLauncher::new(1, Some(FakeOutput::Dir));
    let step = ReportStep {
        input_folder: "models/src".to_string(),
        kind: ReportKind::Jenkins,
    };
    let (result, _) = fx.run(&fake, &step);

    let outcome = result.unwrap();
    assert!(!outcome.success());
    assert!(outcome.report.is_none());
    assert!(load_build_record(&fx.ctx.build_dir).unwrap().is_none());
    assert!(fx.leftovers().is_empty());
}

#[test]
fn standalone_report_is_copied_to_output_folder() {
    let fx = Fixture::new();
    let fake = FakeLauncher::new(0, Some(FakeOutput::Dir));
    let step = ReportStep {
        input_folder: "models/src".to_string(),
        kind: ReportKind::Standalone {
            output_folder: "out/report".to_string(),
        },
    };
    let (result, _) = fx.run(&fake, &step);

    assert!(result.unwrap().report.is_none());
    assert!(fx.ctx.workspace.join("out/report/index.html").is_file());
    assert_eq!(
        flag_value(&fake.last_call(), "-type"),
        Some("STANDALONE")
    );
    assert!(fx.leftovers().is_empty());
}

#[test]
fn missing_library_archive_aborts_before_staging() {
    let mut fx = Fixture::new();
    fx.config.libs = None;
    let fake = FakeLauncher::new(0, Some(FakeOutput::Dir));
    let (result, log) = fx.run(&fake, &compare("models/src"));

    assert!(result.unwrap_err().to_string().contains("undefined"));
    assert!(log.is_empty());
    assert!(fx.leftovers().is_empty());
    assert!(!fx.ctx.workspace.join("workspace").exists());
}

#[test]
fn whole_workspace_can_be_staged_as_an_input() {
    let fx = Fixture::new();
    for source in ["${WORKSPACE}", "."] {
        let fake = FakeLauncher::new(0, Some(FakeOutput::Dir));
        let (result, _) = fx.run(&fake, &compare(source));

        assert!(result.unwrap().success(), "staging {source}");
        assert_eq!(fake.calls.borrow().len(), 1);
        assert!(flag_value(&fake.last_call(), "-in_source")
            .unwrap()
            .ends_with("/IN_SOURCE7/"));
        assert!(fx.leftovers().is_empty(), "left behind: {:?}", fx.leftovers());
    }
}
