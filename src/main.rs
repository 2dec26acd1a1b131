use clap::Parser;
use signalbot::adapter::inbound::cli::command::Cli;
use signalbot::adapter::inbound::cli::{execute, output};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Err(e) = execute(cli).await {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
