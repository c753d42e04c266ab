use clap::Args;
use parabuild::docker;
use parabuild::git;
use parabuild::runner::SystemRunner;
use serde::Serialize;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct DoctorArgs {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorReport {
    pub git: bool,
    pub docker_daemon: bool,
    pub buildx: bool,
    pub builder_active: bool,
}

impl DoctorReport {
    fn healthy(&self) -> bool {
        self.git && self.docker_daemon && self.buildx
    }
}

/// Probe the external toolchain. Probes tolerate failure; the exit code
/// reports overall health (an inactive builder is not fatal because the
/// build pipeline creates one on demand).
pub fn run(_args: DoctorArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<DoctorReport> {
    let runner = SystemRunner::new();

    let docker_daemon = docker::daemon_reachable(&runner);
    let buildx = docker_daemon && docker::buildx_available(&runner);

    let report = DoctorReport {
        git: git::available(&runner),
        docker_daemon,
        buildx,
        builder_active: buildx && docker::builder_active(&runner).unwrap_or(false),
    };

    let exit_code = if report.healthy() { 0 } else { 1 };
    Ok((report, exit_code))
}
