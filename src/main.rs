// src/main.rs

use pipedag::engine::RunOutcome;
use pipedag::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(RunOutcome::Success) => {}
        Ok(RunOutcome::Failure) => std::process::exit(2),
        Err(err) => {
            eprintln!("pipedag error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<RunOutcome> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
