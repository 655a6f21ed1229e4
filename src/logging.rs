//! Log output for the command line tool.
//!
//! Logs go to stderr so that `--show` and `--dump-profiles` output on
//! stdout stays clean. The level is taken from `RUST_LOG`, falling
//! back to `info` for this crate.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "oncogen=info";

pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
