use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Installs the stderr subscriber when `verbose` is set. Stdout stays
/// reserved for JSON output. `RUST_LOG` refines the filter if present.
pub fn init(verbose: bool) {
    if !verbose {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("m2c_lib=debug,m2c=debug,info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}
