//! Thin wrappers over the docker / buildx CLI.
//!
//! Probing helpers (`daemon_reachable`, `buildx_available`, `builder_active`)
//! tolerate failure and report it as a boolean; everything else converts a
//! non-zero exit into a fatal command failure.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::runner::{require_success, CommandRunner, Invocation};

/// Marker buildx prints next to the selected builder in `buildx ls` output.
const ACTIVE_BUILDER_MARKER: char = '*';

/// Shell script run inside the Node container to build the web app's
/// static assets before the image build.
const ASSET_BUILD_SCRIPT: &str = "apt-get update && apt-get install -y git && \
corepack enable && \
pnpm install --frozen-lockfile && \
pnpm build";

pub fn daemon_reachable(runner: &dyn CommandRunner) -> bool {
    runner
        .run_capture(&Invocation::new("docker", ["info"]))
        .map(|output| output.success)
        .unwrap_or(false)
}

pub fn buildx_available(runner: &dyn CommandRunner) -> bool {
    runner
        .run_capture(&Invocation::new("docker", ["buildx", "version"]))
        .map(|output| output.success)
        .unwrap_or(false)
}

/// Whether `buildx ls` reports a currently selected builder.
pub fn builder_active(runner: &dyn CommandRunner) -> Result<bool> {
    let output = runner.run_capture(&Invocation::new("docker", ["buildx", "ls"]))?;
    require_success(&output, "docker buildx ls")?;
    Ok(output.stdout.contains(ACTIVE_BUILDER_MARKER))
}

/// Create a new builder, select it, and bootstrap it synchronously.
pub fn create_builder(runner: &dyn CommandRunner) -> Result<()> {
    let created = runner.run(&Invocation::new("docker", ["buildx", "create", "--use"]))?;
    require_success(&created, "docker buildx create")?;

    let bootstrapped = runner.run(&Invocation::new(
        "docker",
        ["buildx", "inspect", "--bootstrap"],
    ))?;
    require_success(&bootstrapped, "docker buildx inspect")
}

/// Probe for an active builder and create one when none is selected.
/// A failed probe counts as "no builder" and is remediated, not fatal;
/// failing to create the builder is fatal.
pub fn ensure_builder(runner: &dyn CommandRunner) -> Result<()> {
    match builder_active(runner) {
        Ok(true) => {
            crate::log_status!("docker", "buildx builder already active");
            Ok(())
        }
        Ok(false) | Err(_) => {
            crate::log_status!("docker", "creating and selecting a new buildx builder");
            create_builder(runner)
        }
    }
}

/// One image build against a context directory.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub dockerfile: PathBuf,
    pub tag: String,
    pub context_dir: PathBuf,
    pub build_args: Vec<(String, String)>,
    /// Local content-addressed layer cache shared across runs. Purely an
    /// optimization; a cold cache still produces a correct image.
    pub cache_dir: Option<PathBuf>,
    /// `docker buildx build` when set, plain `docker build` otherwise.
    pub buildx: bool,
}

impl BuildRequest {
    fn to_invocation(&self) -> Invocation {
        let mut args: Vec<String> = if self.buildx {
            vec!["buildx".to_string(), "build".to_string()]
        } else {
            vec!["build".to_string()]
        };

        if let Some(cache) = &self.cache_dir {
            let cache = cache.to_string_lossy();
            args.push("--cache-from".to_string());
            args.push(format!("type=local,src={}", cache));
            args.push("--cache-to".to_string());
            args.push(format!("type=local,dest={},mode=max", cache));
        }

        for (key, value) in &self.build_args {
            args.push("--build-arg".to_string());
            args.push(format!("{}={}", key, value));
        }

        args.push("-f".to_string());
        args.push(self.dockerfile.to_string_lossy().to_string());
        args.push("-t".to_string());
        args.push(self.tag.clone());
        args.push(self.context_dir.to_string_lossy().to_string());

        Invocation::new("docker", args)
    }
}

/// Run one image build; the failure context names the tag being built.
pub fn build_image(runner: &dyn CommandRunner, request: &BuildRequest) -> Result<()> {
    let output = runner.run(&request.to_invocation())?;
    require_success(&output, &format!("docker build {}", request.tag))
}

/// Create a stopped container from `image` without starting its main
/// process; returns the container id.
pub fn create_container(runner: &dyn CommandRunner, image: &str) -> Result<String> {
    let output = runner.run_capture(&Invocation::new("docker", ["create", image]))?;
    require_success(&output, "docker create")?;
    Ok(output.stdout.trim().to_string())
}

/// Copy a file out of a stopped container to the host.
pub fn copy_from_container(
    runner: &dyn CommandRunner,
    container_id: &str,
    container_path: &str,
    dest: &Path,
) -> Result<()> {
    let source = format!("{}:{}", container_id, container_path);
    let output = runner.run(&Invocation::new(
        "docker",
        ["cp", source.as_str(), dest.to_string_lossy().as_ref()],
    ))?;
    require_success(&output, "docker cp")
}

pub fn remove_container(runner: &dyn CommandRunner, container_id: &str) -> Result<()> {
    let output = runner.run(&Invocation::new("docker", ["rm", container_id]))?;
    require_success(&output, "docker rm")
}

/// Build the web app's static assets inside a disposable Node container,
/// mounting the scratch clone at /app.
pub fn run_asset_build(
    runner: &dyn CommandRunner,
    scratch: &Path,
    node_image: &str,
) -> Result<()> {
    let mount = format!("{}:/app", scratch.display());
    let output = runner.run(&Invocation::new(
        "docker",
        [
            "run",
            "--rm",
            "-v",
            mount.as_str(),
            "-w",
            "/app",
            node_image,
            "bash",
            "-c",
            ASSET_BUILD_SCRIPT,
        ],
    ))?;
    require_success(&output, "node asset build")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buildx_request_orders_cache_args_build_args_then_context() {
        let request = BuildRequest {
            dockerfile: PathBuf::from("setup.dockerfile"),
            tag: "parabol:local".to_string(),
            context_dir: PathBuf::from("/tmp/ctx"),
            build_args: vec![("PUBLIC_URL".to_string(), "/parabol".to_string())],
            cache_dir: Some(PathBuf::from(".docker-cache")),
            buildx: true,
        };

        let argv = request.to_invocation().argv();
        assert_eq!(
            argv,
            vec![
                "docker",
                "buildx",
                "build",
                "--cache-from",
                "type=local,src=.docker-cache",
                "--cache-to",
                "type=local,dest=.docker-cache,mode=max",
                "--build-arg",
                "PUBLIC_URL=/parabol",
                "-f",
                "setup.dockerfile",
                "-t",
                "parabol:local",
                "/tmp/ctx",
            ]
        );
    }

    #[test]
    fn plain_build_request_skips_buildx_and_cache() {
        let request = BuildRequest {
            dockerfile: PathBuf::from("injector.dockerfile"),
            tag: "parabol:local".to_string(),
            context_dir: PathBuf::from("/tmp/ctx"),
            build_args: Vec::new(),
            cache_dir: None,
            buildx: false,
        };

        let argv = request.to_invocation().argv();
        assert_eq!(
            argv,
            vec![
                "docker",
                "build",
                "-f",
                "injector.dockerfile",
                "-t",
                "parabol:local",
                "/tmp/ctx",
            ]
        );
    }
}
