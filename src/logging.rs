// Log output for the binary; library code only emits events

use tracing_subscriber::EnvFilter;

// Call once at the start of main. RUST_LOG picks the level, info when unset or unparsable.
// Output goes to stderr so stdout stays free for script results.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("Failed to install logger: {}", e);
    }
}
