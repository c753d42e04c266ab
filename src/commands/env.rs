use std::path::PathBuf;

use clap::{Args, Subcommand};
use parabuild::config::{self, BuildConfig};
use parabuild::envfile;
use parabuild::runner::SystemRunner;
use serde::Serialize;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct EnvArgs {
    #[command(subcommand)]
    pub command: EnvCommand,
}

#[derive(Subcommand)]
pub enum EnvCommand {
    /// Rewrite the deployment keys in an env file in place
    Patch(PatchArgs),
}

#[derive(Args)]
pub struct PatchArgs {
    /// Env file to patch
    #[arg(default_value = ".env")]
    pub path: String,

    /// Advertised host (default: the tailscale address, else 10.127.80.126)
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
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOutput {
    pub path: String,
    pub keys: Vec<String>,
}

pub fn run(args: EnvArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<PatchOutput> {
    match args.command {
        EnvCommand::Patch(patch) => run_patch(patch),
    }
}

fn run_patch(args: PatchArgs) -> CmdResult<PatchOutput> {
    let runner = SystemRunner::new();

    let host = config::resolve_host(&runner, args.host.as_deref());
    let mut config = BuildConfig::with_host(&host);
    config.proto = args.proto;
    config.port = args.port;
    if let Some(cdn) = args.cdn_base_url {
        config.cdn_base_url = cdn;
    }

    let path = PathBuf::from(shellexpand::tilde(&args.path).into_owned());
    let rules = config.patch_rules();
    envfile::patch_file(&path, &rules)?;

    Ok((
        PatchOutput {
            path: path.to_string_lossy().to_string(),
            keys: rules.into_iter().map(|rule| rule.key).collect(),
        },
        0,
    ))
}
