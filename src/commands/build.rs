use std::path::PathBuf;

use clap::Args;
use parabuild::config::{self, BuildConfig};
use parabuild::pipeline::{BuildReport, Pipeline};
use parabuild::runner::SystemRunner;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct BuildArgs {
    /// Advertised host written into HOST and the CDN base URL
    /// (default: the tailscale address, else 10.127.80.126)
    #[arg(long)]
    pub host: Option<String>,

    /// Protocol written into PROTO
    #[arg(long, default_value = "http")]
    pub proto: String,

    /// Port written into PORT
    #[arg(long, default_value = "80")]
    pub port: String,

    /// CDN base URL (default: //<host>/parabol)
    #[arg(long)]
    pub cdn_base_url: Option<String>,

    /// Local Dockerfile for the final image
    #[arg(long, default_value = "setup.dockerfile")]
    pub dockerfile: String,

    /// Layer cache directory shared across runs
    #[arg(long, default_value = ".docker-cache")]
    pub cache_dir: String,

    /// Disable the local layer cache
    #[arg(long)]
    pub no_cache: bool,

    /// Build the upstream base image first, then layer the local
    /// Dockerfile on top of it
    #[arg(long)]
    pub two_stage: bool,

    /// Build the web app's static assets in a Node container before the
    /// image build
    #[arg(long)]
    pub prebuild_assets: bool,

    /// Pull .env.example out of the built image instead of the clone
    #[arg(long)]
    pub extract_env: bool,

    /// Where to leave the patched env file
    #[arg(long, default_value = ".env")]
    pub env_path: String,
}

pub fn run(args: BuildArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<BuildReport> {
    let runner = SystemRunner::new();

    let host = config::resolve_host(&runner, args.host.as_deref());
    let mut config = BuildConfig::with_host(&host);

    config.proto = args.proto;
    config.port = args.port;
    if let Some(cdn) = args.cdn_base_url {
        config.cdn_base_url = cdn;
    }
    config.dockerfile = PathBuf::from(shellexpand::tilde(&args.dockerfile).into_owned());
    config.env_path = PathBuf::from(shellexpand::tilde(&args.env_path).into_owned());
    config.cache_dir = if args.no_cache {
        None
    } else {
        Some(PathBuf::from(shellexpand::tilde(&args.cache_dir).into_owned()))
    };
    config.two_stage = args.two_stage;
    config.prebuild_assets = args.prebuild_assets;
    config.extract_env = args.extract_env;

    let report = Pipeline::new(&config, &runner).run()?;
    Ok((report, 0))
}
