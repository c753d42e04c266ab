use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{build, doctor, env, GlobalArgs};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "parabuild")]
#[command(version = VERSION)]
#[command(about = "Build and configure local Parabol Docker images")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone upstream, patch .env, and build the parabol:local image
    Build(build::BuildArgs),
    /// Env-file operations
    Env(env::EnvArgs),
    /// Check the local toolchain (git, docker, buildx)
    Doctor(doctor::DoctorArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    let exit_code = match cli.command {
        Commands::Build(args) => output::print_result(build::run(args, &global)),
        Commands::Env(args) => output::print_result(env::run(args, &global)),
        Commands::Doctor(args) => output::print_result(doctor::run(args, &global)),
    };

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
