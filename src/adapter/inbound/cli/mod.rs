//! CLI entry points.

pub mod check;
pub mod command;
pub mod output;
pub mod run;

use std::time::Duration;

use self::command::{CheckCommand, Cli, Commands, RunArgs};
use self::output::OutputConfig;
use crate::adapter::outbound::crypto::CredentialCipher;
use crate::error::Result;

/// Run the parsed command line.
pub async fn execute(cli: Cli) -> Result<()> {
    output::configure(OutputConfig::new(cli.json, cli.quiet));

    match cli.command {
        None => run::execute_run(&RunArgs::default()).await,
        Some(Commands::Run(args)) => run::execute_run(&args).await,
        Some(Commands::Check(CheckCommand::Config(arg))) => check::execute_config(&arg.config),
        Some(Commands::Check(CheckCommand::Health(args))) => {
            check::execute_health(&args.url, Duration::from_secs(args.timeout_secs)).await
        }
        Some(Commands::Keygen) => {
            println!("{}", CredentialCipher::generate_key());
            Ok(())
        }
    }
}
