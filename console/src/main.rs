mod cli;
mod console_reporter;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use console_reporter::ConsoleReporter;
use rag_client::{ClientConfig, QueryOrchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment variables and logging
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let config = ClientConfig::load()?;
    let parameters = cli.retrieval.parameters(&config.base_url)?;

    log::info!("Using RAG service at {}", parameters.base_url());
    let orchestrator = QueryOrchestrator::new(config.timeouts);
    let mut reporter = ConsoleReporter;

    let summary = match &cli.command {
        Command::Configure => {
            orchestrator
                .submit_parameters(&parameters, &mut reporter)
                .await
        }
        Command::Query(args) => {
            let request = args.request()?;
            orchestrator
                .run_query(&parameters, &args.keywords(), &request, &mut reporter)
                .await
        }
    };

    if summary.aborted() {
        std::process::exit(1);
    }
    Ok(())
}
