pub mod build;
pub mod doctor;
pub mod env;

/// Command results carry their payload and the process exit code.
pub type CmdResult<T> = parabuild::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}
