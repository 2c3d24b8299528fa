use tracing_subscriber::EnvFilter;

/// Install the stderr tracing subscriber.
/// `RUST_LOG` overrides; otherwise `--verbose` selects debug, else warnings only.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "codemask=debug,codemask_cli=debug,codemask_core=debug"
        } else {
            "codemask=warn,codemask_cli=warn,codemask_core=warn"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
