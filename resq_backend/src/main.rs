use anyhow::Result;
use clap::{Parser, Subcommand};
use resq_backend::cli;
use resq_backend::config::ResqConfig;
use resq_backend::node::ResqNode;
use resq_backend::telemetry;
use resq_backend::utils;

#[derive(Parser)]
#[command(author, version, about = "ResQ community backend daemon and CLI")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (Axum) for REST/API access
    Serve,
    /// Start the interactive CLI for the feed, account, and hotlines
    Cli,
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::print_banner();
    telemetry::init_tracing();

    let args = Args::parse();

    let config = ResqConfig::from_env()?;
    let node = ResqNode::start(config).await?;
    tracing::info!("bootstrap complete");

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => node.run_http_server().await,
        Command::Cli => {
            let snapshot = node.snapshot();
            cli::run_cli(snapshot.store, snapshot.events, snapshot.contacts).await
        }
    }
}
