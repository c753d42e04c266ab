// Public modules
pub mod config;
pub mod docker;
pub mod envfile;
pub mod error;
pub mod git;
pub mod manifest;
pub mod pipeline;
pub mod runner;
pub mod scratch;

// Re-export common types for convenience
pub use error::{Error, Result};
pub use runner::{CommandRunner, Invocation, RunOutput, SystemRunner};
