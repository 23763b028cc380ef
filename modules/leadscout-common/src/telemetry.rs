use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber reading `RUST_LOG` (defaulting to `info`
/// for this crate family). Safe to call more than once; later calls are
/// no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("leadscout=info")),
        )
        .try_init();
}
