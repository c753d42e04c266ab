//! Immutable per-run configuration for the build pipeline.
//!
//! All fixed values (upstream URL, image tags, paths) live here as an
//! explicit struct handed to the pipeline, so tests can inject their own.

use std::path::{Path, PathBuf};

use crate::envfile::PatchRule;
use crate::runner::{CommandRunner, Invocation};

pub const UPSTREAM_REPO_URL: &str = "https://github.com/ParabolInc/parabol.git";
pub const IMAGE_TAG: &str = "parabol:local";
pub const BASE_IMAGE_TAG: &str = "parabol:base";
pub const NODE_IMAGE: &str = "node:22-trixie-slim";

/// Fallback advertised address when no flag is given and the mesh client
/// is unavailable.
pub const DEFAULT_HOST: &str = "10.127.80.126";

/// Upstream base-image Dockerfile, relative to the clone root.
const BASE_DOCKERFILE_IN_CLONE: &str = "docker/images/parabol-ubi/dockerfiles/basic.dockerfile";

/// Where the built image keeps its canonical env template, for
/// `extract_env` mode.
const ENV_TEMPLATE_IN_IMAGE: &str = "/home/node/parabol/.env.example";

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub repo_url: String,
    pub image_tag: String,
    pub base_image_tag: String,
    /// Local Dockerfile for the final image.
    pub dockerfile: PathBuf,
    /// Where the patched env file is left for the deployment step.
    pub env_path: PathBuf,
    /// Layer cache shared across runs; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    pub public_url: String,
    pub host: String,
    pub proto: String,
    pub port: String,
    pub cdn_base_url: String,
    pub node_image: String,
    /// Build the upstream base image first, then layer the local
    /// Dockerfile on top of it.
    pub two_stage: bool,
    /// Build static assets in a Node container before the image build.
    pub prebuild_assets: bool,
    /// Pull the env template out of the built image instead of the clone.
    pub extract_env: bool,
}

impl BuildConfig {
    /// Defaults for a plain `parabuild build` with the given advertised
    /// host. The CDN base URL derives from the host.
    pub fn with_host(host: &str) -> Self {
        let public_url = "/parabol".to_string();
        Self {
            repo_url: UPSTREAM_REPO_URL.to_string(),
            image_tag: IMAGE_TAG.to_string(),
            base_image_tag: BASE_IMAGE_TAG.to_string(),
            dockerfile: PathBuf::from("setup.dockerfile"),
            env_path: PathBuf::from(".env"),
            cache_dir: Some(PathBuf::from(".docker-cache")),
            cdn_base_url: format!("//{}{}", host, public_url),
            public_url,
            host: host.to_string(),
            proto: "http".to_string(),
            port: "80".to_string(),
            node_image: NODE_IMAGE.to_string(),
            two_stage: false,
            prebuild_assets: false,
            extract_env: false,
        }
    }

    /// The deployment rewrite applied to every materialized env file, in
    /// this fixed order.
    pub fn patch_rules(&self) -> Vec<PatchRule> {
        vec![
            PatchRule::new("IS_ENTERPRISE", "IS_ENTERPRISE=true"),
            PatchRule::new("HOST", format!("HOST='{}'", self.host)),
            PatchRule::new("PROTO", format!("PROTO='{}'", self.proto)),
            PatchRule::new("PORT", format!("PORT='{}'", self.port)),
            PatchRule::new(
                "CDN_BASE_URL",
                format!("CDN_BASE_URL='{}'", self.cdn_base_url),
            ),
        ]
    }

    pub fn base_dockerfile(&self, scratch: &Path) -> PathBuf {
        scratch.join(BASE_DOCKERFILE_IN_CLONE)
    }

    pub fn env_template_in_image(&self) -> &str {
        ENV_TEMPLATE_IN_IMAGE
    }
}

/// Resolve the advertised host address: an explicit flag wins, then the
/// first address reported by the tailscale client, then the fixed
/// fallback. The mesh-client probe tolerates failure.
pub fn resolve_host(runner: &dyn CommandRunner, explicit: Option<&str>) -> String {
    if let Some(host) = explicit {
        return host.to_string();
    }

    if let Ok(output) = runner.run_capture(&Invocation::new("tailscale", ["ip", "-4"])) {
        if output.success {
            if let Some(line) = output.stdout.lines().next() {
                let addr = line.trim();
                if !addr.is_empty() {
                    return addr.to_string();
                }
            }
        }
    }

    DEFAULT_HOST.to_string()
}
