// src/main.rs

use watchrun::{cli, logging, run};

// Current-thread flavor on purpose: the run loop's restart semantics rely on
// single-threaded alternation of child polling and event polling.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("watchrun error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.verbose)?;
    run(args).await
}
