//! Log output setup

use tracing_subscriber::EnvFilter;

/// Variable holding an `EnvFilter` directive string
pub const LOG_ENV: &str = "SCRIBE_CAPTURE_LOG";

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "warn,scribe_capture=debug"
    } else {
        "warn"
    }
}

/// Build the filter: the environment wins, then `--verbose`
pub fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install the stderr fmt subscriber. Safe to call once per process.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
