// SCHEDPIPE ERRORS
// EVERY FAILURE IS FATAL. NO RETRY, NO DEGRADED MODE.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BenchError>;

#[derive(Debug, Error)]
pub enum BenchError {
    /// Effective UID is not root
    #[error("this benchmark requires ROOT permission to set up CPUFreq during tests")]
    Privilege,

    #[error("invalid configuration: {0}")]
    Config(String),

    /// `cpufreq-set` (or the governor read) failed
    #[error("governor control failed: {0}")]
    Governor(String),

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}")]
    ExitStatus { program: String, status: std::process::ExitStatus },

    /// Measurement output was not exactly one number
    #[error("unparseable measurement output {output:?}")]
    Parse { output: String },

    #[error("no samples accumulated")]
    EmptyAccumulator,

    #[error("malformed report row {line} in {path}: {reason}")]
    Report { path: PathBuf, line: usize, reason: String },

    #[error("benchmark interrupted")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
