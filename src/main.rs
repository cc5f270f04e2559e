mod cli;

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("binday=info")),
        )
        .init();

    // The local offset can only be read while the process is single threaded.
    let config = match cli::run() {
        cli::RunOutcome::Serve(config) => config,
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start runtime: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = runtime.block_on(binday::serve(config)) {
        tracing::error!(error = %err, "server stopped");
        std::process::exit(1);
    }
}
