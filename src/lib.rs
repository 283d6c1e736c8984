// SCHEDPIPE -- SCHEDULER PIPE BENCHMARK AND REPORTING
// PAIRED PIPE PING-PONG UNDER `perf bench sched pipe`, SCALED FROM 1 TO N TASK PAIRS
//
// LIBRARY CRATE: EVERYTHING BUT THE CLI ENTRY POINT.
// SHARED BETWEEN THE BINARY (main.rs) AND THE INTEGRATION TESTS.

pub mod bench;
pub mod cli;
pub mod error;
pub mod governor;
pub mod host;
pub mod plot;
pub mod report;
pub mod stats;

pub use error::{BenchError, Result};
