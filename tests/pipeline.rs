//! Pipeline tests driven by a scripted command runner: no git, no docker.
//!
//! The fake runner records every argv it sees and materializes the files a
//! real `git clone` / `docker cp` would produce, so the whole pipeline can
//! be asserted end to end as an exact command transcript.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use parabuild::config::BuildConfig;
use parabuild::pipeline::Pipeline;
use parabuild::runner::{CommandRunner, Invocation, RunOutput};
use parabuild::Result;

const HEAD_SHA: &str = "4f2c9a31b7d85fd0e6b1c2a3d4e5f60718293a4b";

const ENV_TEMPLATE: &str = "\
# IS_ENTERPRISE=false
HOST=
PROTO=
PORT=
CDN_BASE_URL=
GITHUB_CLIENT_ID=
";

const PATCHED_ENV: &str = "\
IS_ENTERPRISE=true
HOST='10.127.80.126'
PROTO='http'
PORT='80'
CDN_BASE_URL='//10.127.80.126/parabol'
GITHUB_CLIENT_ID=
";

/// Records every invocation; clones and container copies create real files.
struct FakeRunner {
    calls: RefCell<Vec<Vec<String>>>,
    buildx_ls_output: String,
    /// Fail any command whose argv line contains the needle.
    fail_matching: Option<(String, i32)>,
    /// Leave `.env.example` out of the "clone".
    omit_template: bool,
}

impl FakeRunner {
    fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            buildx_ls_output: "default * docker\n  default default running".to_string(),
            fail_matching: None,
            omit_template: false,
        }
    }

    fn without_active_builder(mut self) -> Self {
        self.buildx_ls_output = "default docker\n  default default running".to_string();
        self
    }

    fn failing_on(mut self, needle: &str, exit_code: i32) -> Self {
        self.fail_matching = Some((needle.to_string(), exit_code));
        self
    }

    fn without_template(mut self) -> Self {
        self.omit_template = true;
        self
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    fn call_lines(&self) -> Vec<String> {
        self.calls().iter().map(|argv| argv.join(" ")).collect()
    }

    /// The scratch directory as seen by the recorded `git clone`.
    fn cloned_dir(&self) -> PathBuf {
        let calls = self.calls.borrow();
        let clone = calls
            .iter()
            .find(|argv| argv.len() > 1 && argv[0] == "git" && argv[1] == "clone")
            .expect("no git clone recorded");
        PathBuf::from(clone.last().expect("clone argv empty").clone())
    }

    fn materialize_clone(&self, dest: &Path) {
        fs::create_dir_all(dest).unwrap();
        fs::write(
            dest.join("package.json"),
            r#"{"name": "parabol", "engines": {"node": "^22.0.0"}}"#,
        )
        .unwrap();
        if !self.omit_template {
            fs::write(dest.join(".env.example"), ENV_TEMPLATE).unwrap();
        }
    }

    fn dispatch(&self, invocation: &Invocation) -> Result<RunOutput> {
        let argv = invocation.argv();
        self.calls.borrow_mut().push(argv.clone());
        let line = argv.join(" ");

        if let Some((needle, exit_code)) = &self.fail_matching {
            if line.contains(needle.as_str()) {
                return Ok(RunOutput::new(*exit_code, String::new()));
            }
        }

        if argv[0] == "git" && argv.get(1).map(String::as_str) == Some("clone") {
            self.materialize_clone(Path::new(argv.last().unwrap()));
        } else if argv[0] == "docker" && argv.get(1).map(String::as_str) == Some("cp") {
            fs::write(Path::new(&argv[3]), ENV_TEMPLATE).unwrap();
        }

        let stdout = if line.starts_with("docker buildx ls") {
            self.buildx_ls_output.clone()
        } else if line.contains("rev-parse") {
            format!("{}\n", HEAD_SHA)
        } else if line.starts_with("docker create") {
            "f3a9c2d1e0b4\n".to_string()
        } else {
            String::new()
        };

        Ok(RunOutput::new(0, stdout))
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<RunOutput> {
        self.dispatch(invocation)
    }

    fn run_capture(&self, invocation: &Invocation) -> Result<RunOutput> {
        self.dispatch(invocation)
    }
}

/// Config with all filesystem side effects confined to `workdir`.
fn test_config(workdir: &Path) -> BuildConfig {
    let mut config = BuildConfig::with_host("10.127.80.126");
    config.env_path = workdir.join(".env");
    config.cache_dir = Some(workdir.join("cache"));
    config
}

#[test]
fn single_stage_build_issues_the_expected_transcript() {
    let workdir = tempfile::tempdir().unwrap();
    let config = test_config(workdir.path());
    let runner = FakeRunner::new();

    let report = Pipeline::new(&config, &runner)
        .run_with_scratch_parent(workdir.path())
        .unwrap();

    let lines = runner.call_lines();
    assert_eq!(lines[0], "docker info");
    assert_eq!(lines[1], "docker buildx version");
    assert_eq!(lines[2], "docker buildx ls");
    assert!(lines[3].starts_with("git clone --depth 1 https://github.com/ParabolInc/parabol.git"));
    assert!(lines[4].ends_with("rev-parse HEAD"));

    let build = &lines[5];
    assert!(build.starts_with("docker buildx build"));
    assert!(build.contains(&format!(
        "--cache-from type=local,src={}",
        workdir.path().join("cache").display()
    )));
    assert!(build.contains("--build-arg PUBLIC_URL=/parabol"));
    assert!(build.contains("--build-arg CDN_BASE_URL=//10.127.80.126/parabol"));
    assert!(build.contains(&format!("--build-arg DD_GIT_COMMIT_SHA={}", HEAD_SHA)));
    assert!(build.contains("-t parabol:local"));
    assert_eq!(lines.len(), 6);

    assert_eq!(report.image_tag, "parabol:local");
    assert_eq!(report.commit_sha, HEAD_SHA);
    assert_eq!(report.node_version, "22.0.0");
}

#[test]
fn patched_env_is_left_behind_and_staged_into_the_context() {
    let workdir = tempfile::tempdir().unwrap();
    let config = test_config(workdir.path());
    let runner = FakeRunner::new();

    Pipeline::new(&config, &runner)
        .run_with_scratch_parent(workdir.path())
        .unwrap();

    assert_eq!(fs::read_to_string(&config.env_path).unwrap(), PATCHED_ENV);
}

#[test]
fn scratch_directory_is_removed_after_success() {
    let workdir = tempfile::tempdir().unwrap();
    let config = test_config(workdir.path());
    let runner = FakeRunner::new();

    Pipeline::new(&config, &runner)
        .run_with_scratch_parent(workdir.path())
        .unwrap();

    assert!(!runner.cloned_dir().exists());
}

#[test]
fn active_builder_skips_creation() {
    let workdir = tempfile::tempdir().unwrap();
    let config = test_config(workdir.path());
    let runner = FakeRunner::new();

    Pipeline::new(&config, &runner)
        .run_with_scratch_parent(workdir.path())
        .unwrap();

    assert!(!runner
        .call_lines()
        .iter()
        .any(|line| line.contains("buildx create")));
}

#[test]
fn missing_builder_is_created_and_bootstrapped_before_the_clone() {
    let workdir = tempfile::tempdir().unwrap();
    let config = test_config(workdir.path());
    let runner = FakeRunner::new().without_active_builder();

    Pipeline::new(&config, &runner)
        .run_with_scratch_parent(workdir.path())
        .unwrap();

    let lines = runner.call_lines();
    let create = lines
        .iter()
        .position(|l| l == "docker buildx create --use")
        .expect("builder never created");
    let bootstrap = lines
        .iter()
        .position(|l| l == "docker buildx inspect --bootstrap")
        .expect("builder never bootstrapped");
    let clone = lines
        .iter()
        .position(|l| l.starts_with("git clone"))
        .expect("no clone");
    assert!(create < bootstrap);
    assert!(bootstrap < clone);
}

#[test]
fn build_failure_propagates_exit_code_and_still_cleans_up() {
    let workdir = tempfile::tempdir().unwrap();
    let config = test_config(workdir.path());
    let runner = FakeRunner::new().failing_on("buildx build", 17);

    let err = Pipeline::new(&config, &runner)
        .run_with_scratch_parent(workdir.path())
        .unwrap_err();

    assert_eq!(err.exit_code(), 17);
    assert!(!runner.cloned_dir().exists());
}

#[test]
fn unreachable_daemon_aborts_before_any_clone() {
    let workdir = tempfile::tempdir().unwrap();
    let config = test_config(workdir.path());
    let runner = FakeRunner::new().failing_on("docker info", 1);

    let err = Pipeline::new(&config, &runner)
        .run_with_scratch_parent(workdir.path())
        .unwrap_err();

    assert_eq!(err.code(), "DOCKER_ERROR");
    assert!(!runner.call_lines().iter().any(|l| l.starts_with("git clone")));
}

#[test]
fn missing_env_template_aborts_before_any_build() {
    let workdir = tempfile::tempdir().unwrap();
    let config = test_config(workdir.path());
    let runner = FakeRunner::new().without_template();

    let err = Pipeline::new(&config, &runner)
        .run_with_scratch_parent(workdir.path())
        .unwrap_err();

    assert_eq!(err.code(), "TEMPLATE_MISSING");
    assert_eq!(err.exit_code(), 1);
    assert!(!runner.call_lines().iter().any(|l| l.contains("buildx build")));
    assert!(!runner.cloned_dir().exists());
}

#[test]
fn two_stage_builds_base_then_local_with_plain_docker_build() {
    let workdir = tempfile::tempdir().unwrap();
    let mut config = test_config(workdir.path());
    config.two_stage = true;
    let runner = FakeRunner::new();

    Pipeline::new(&config, &runner)
        .run_with_scratch_parent(workdir.path())
        .unwrap();

    let lines = runner.call_lines();
    let base = lines
        .iter()
        .position(|l| l.contains("-t parabol:base"))
        .expect("base image never built");
    let local = lines
        .iter()
        .position(|l| l.contains("-t parabol:local"))
        .expect("local image never built");
    assert!(base < local);

    assert!(lines[base].starts_with("docker build "));
    assert!(lines[base].contains("--build-arg _NODE_VERSION=22.0.0"));
    assert!(lines[base].contains("docker/images/parabol-ubi/dockerfiles/basic.dockerfile"));
    assert!(lines[local].starts_with("docker build "));
}

#[test]
fn asset_prebuild_runs_in_a_node_container_between_clone_and_build() {
    let workdir = tempfile::tempdir().unwrap();
    let mut config = test_config(workdir.path());
    config.prebuild_assets = true;
    let runner = FakeRunner::new();

    Pipeline::new(&config, &runner)
        .run_with_scratch_parent(workdir.path())
        .unwrap();

    let calls = runner.calls();
    let prebuild = calls
        .iter()
        .position(|argv| argv.len() > 1 && argv[0] == "docker" && argv[1] == "run")
        .expect("no asset build container run");

    let argv = &calls[prebuild];
    let scratch = runner.cloned_dir();
    assert_eq!(argv[2], "--rm");
    assert_eq!(argv[3], "-v");
    assert_eq!(argv[4], format!("{}:/app", scratch.display()));
    assert_eq!(argv[5], "-w");
    assert_eq!(argv[6], "/app");
    assert_eq!(argv[7], "node:22-trixie-slim");
    assert_eq!(argv[8], "bash");
    assert_eq!(argv[9], "-c");
    assert!(argv[10].contains("corepack enable"));
    assert!(argv[10].contains("pnpm install --frozen-lockfile"));
    assert!(argv[10].contains("pnpm build"));
    assert_eq!(argv.len(), 11);

    let lines = runner.call_lines();
    let clone = lines
        .iter()
        .position(|l| l.starts_with("git clone"))
        .expect("no clone");
    let build = lines
        .iter()
        .position(|l| l.starts_with("docker buildx build"))
        .expect("no image build");
    assert!(clone < prebuild);
    assert!(prebuild < build);
}

#[test]
fn extract_env_pulls_the_template_from_a_throwaway_container() {
    let workdir = tempfile::tempdir().unwrap();
    let mut config = test_config(workdir.path());
    config.extract_env = true;
    let runner = FakeRunner::new();

    Pipeline::new(&config, &runner)
        .run_with_scratch_parent(workdir.path())
        .unwrap();

    let lines = runner.call_lines();
    let create = lines
        .iter()
        .position(|l| l == "docker create parabol:local")
        .expect("no throwaway container created");
    let cp = lines
        .iter()
        .position(|l| l.starts_with("docker cp f3a9c2d1e0b4:/home/node/parabol/.env.example"))
        .expect("template never copied out");
    let rm = lines
        .iter()
        .position(|l| l == "docker rm f3a9c2d1e0b4")
        .expect("throwaway container never removed");
    assert!(create < cp);
    assert!(cp < rm);

    // Extracted template gets the same deployment rewrite
    assert_eq!(fs::read_to_string(&config.env_path).unwrap(), PATCHED_ENV);
}
