use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

use crate::args::GlobalArgs;

fn default_directive(global: &GlobalArgs, debug: bool) -> &'static str {
    if global.quiet {
        return "off";
    }
    match global.verbose {
        0 if debug => "debug",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v`/`-q`, which
/// win over `debug = true` in the settings.
///
/// stdout is reserved for rewritten text and diffs.
pub fn init(global: &GlobalArgs, debug: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(global, debug)));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(global.verbose > 1)
        .without_time()
        .with_filter(env_filter);

    // A second init (tests driving `cli::run` twice) keeps the first.
    let _ = Registry::default().with(stderr_layer).try_init();
}
