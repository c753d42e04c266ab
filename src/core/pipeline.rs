//! The build pipeline: clone, patch, build, tag, clean up.
//!
//! A strict total order of steps with a single abort-on-first-failure
//! policy. The scratch directory is the one guaranteed finalizer: it is
//! released on every exit path, including error propagation out of any
//! step. There is no retry and no rollback of the local env file.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::config::BuildConfig;
use crate::docker::{self, BuildRequest};
use crate::envfile;
use crate::error::{Error, Result};
use crate::git;
use crate::manifest;
use crate::runner::CommandRunner;
use crate::scratch::ScratchDir;

/// What a completed run produced; serialized into the CLI response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub image_tag: String,
    pub commit_sha: String,
    pub node_version: String,
    pub env_path: String,
}

pub struct Pipeline<'a> {
    config: &'a BuildConfig,
    runner: &'a dyn CommandRunner,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a BuildConfig, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    /// Run the whole pipeline against a fresh scratch directory under the
    /// home directory.
    pub fn run(&self) -> Result<BuildReport> {
        self.run_inner(None)
    }

    /// Same pipeline with the scratch directory allocated under `parent`
    /// instead of the home directory.
    pub fn run_with_scratch_parent(&self, parent: &Path) -> Result<BuildReport> {
        self.run_inner(Some(parent))
    }

    fn run_inner(&self, scratch_parent: Option<&Path>) -> Result<BuildReport> {
        self.preflight()?;

        if let Some(cache) = &self.config.cache_dir {
            fs::create_dir_all(cache)?;
        }

        // Allocation happens before any clone or build step; a failure
        // here aborts the run with nothing to clean up.
        let scratch = match scratch_parent {
            Some(parent) => ScratchDir::create_in(parent)?,
            None => ScratchDir::create()?,
        };
        crate::log_status!("build", "scratch dir: {}", scratch.path().display());

        self.execute(scratch.path())
        // `scratch` drops here on success and on error alike
    }

    fn preflight(&self) -> Result<()> {
        if !docker::daemon_reachable(self.runner) {
            return Err(Error::Docker(
                "cannot talk to the Docker daemon; check that it is running and DOCKER_HOST is correct"
                    .to_string(),
            ));
        }
        if !docker::buildx_available(self.runner) {
            return Err(Error::Docker(
                "docker CLI has no buildx support".to_string(),
            ));
        }
        docker::ensure_builder(self.runner)
    }

    fn execute(&self, scratch: &Path) -> Result<BuildReport> {
        git::clone_shallow(self.runner, &self.config.repo_url, scratch)?;

        let node_version = manifest::node_version(scratch)?;
        let sha = git::head_sha(self.runner, scratch)?;
        crate::log_status!("build", "node {} at commit {}", node_version, sha);

        if !self.config.extract_env {
            self.materialize_env(scratch)?;
        }

        if self.config.prebuild_assets {
            docker::run_asset_build(self.runner, scratch, &self.config.node_image)?;
        }

        if self.config.two_stage {
            self.build_two_stage(scratch, &node_version, &sha)?;
        } else {
            self.build_single_stage(scratch, &sha)?;
        }

        if self.config.extract_env {
            self.extract_env_template()?;
        }

        crate::log_status!("build", "built image {}", self.config.image_tag);

        Ok(BuildReport {
            image_tag: self.config.image_tag.clone(),
            commit_sha: sha,
            node_version,
            env_path: self.config.env_path.to_string_lossy().to_string(),
        })
    }

    /// Copy `.env.example` out of the clone, rewrite the deployment keys,
    /// and stage the result into the build context so the image embeds it.
    fn materialize_env(&self, scratch: &Path) -> Result<()> {
        let template = scratch.join(".env.example");
        if !template.exists() {
            return Err(Error::MissingTemplate(template));
        }

        fs::copy(&template, &self.config.env_path)?;
        envfile::patch_file(&self.config.env_path, &self.config.patch_rules())?;
        fs::copy(&self.config.env_path, scratch.join(".env"))?;
        Ok(())
    }

    fn build_single_stage(&self, scratch: &Path, sha: &str) -> Result<()> {
        let request = BuildRequest {
            dockerfile: self.config.dockerfile.clone(),
            tag: self.config.image_tag.clone(),
            context_dir: scratch.to_path_buf(),
            build_args: vec![
                ("PUBLIC_URL".to_string(), self.config.public_url.clone()),
                ("CDN_BASE_URL".to_string(), self.config.cdn_base_url.clone()),
                ("DD_GIT_COMMIT_SHA".to_string(), sha.to_string()),
                (
                    "DD_GIT_REPOSITORY_URL".to_string(),
                    self.config.repo_url.clone(),
                ),
            ],
            cache_dir: self.config.cache_dir.clone(),
            buildx: true,
        };
        docker::build_image(self.runner, &request)
    }

    /// Base image from the upstream Dockerfile first, then the local
    /// Dockerfile layered on top of it. Order matters: the second build
    /// consumes the first build's image.
    fn build_two_stage(&self, scratch: &Path, node_version: &str, sha: &str) -> Result<()> {
        let base = BuildRequest {
            dockerfile: self.config.base_dockerfile(scratch),
            tag: self.config.base_image_tag.clone(),
            context_dir: scratch.to_path_buf(),
            build_args: vec![
                ("_NODE_VERSION".to_string(), node_version.to_string()),
                ("DD_GIT_COMMIT_SHA".to_string(), sha.to_string()),
                (
                    "DD_GIT_REPOSITORY_URL".to_string(),
                    self.config.repo_url.clone(),
                ),
            ],
            cache_dir: None,
            buildx: false,
        };
        docker::build_image(self.runner, &base)?;

        let local = BuildRequest {
            dockerfile: self.config.dockerfile.clone(),
            tag: self.config.image_tag.clone(),
            context_dir: scratch.to_path_buf(),
            build_args: Vec::new(),
            cache_dir: None,
            buildx: false,
        };
        docker::build_image(self.runner, &local)
    }

    /// Pull the canonical env template out of the built image through a
    /// throwaway container, then apply the deployment rewrite to it.
    fn extract_env_template(&self) -> Result<()> {
        let container_id = docker::create_container(self.runner, &self.config.image_tag)?;

        // Remove the container even when the copy fails, but never let a
        // removal failure mask the copy's result.
        let copied = docker::copy_from_container(
            self.runner,
            &container_id,
            self.config.env_template_in_image(),
            &self.config.env_path,
        );
        let removed = docker::remove_container(self.runner, &container_id);
        copied?;
        removed?;

        envfile::patch_file(&self.config.env_path, &self.config.patch_rules())
    }
}
