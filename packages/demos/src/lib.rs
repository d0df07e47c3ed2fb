//! Demos for the bounded work queue and concurrent task aggregation
//!
//! Every demo shares one root cancellation token; Ctrl-C cancels it.

pub mod cli;
pub mod commands;
pub mod console;
pub mod settings;

pub use cli::{AwaitBasicsArgs, ChannelArgs, Cli, Commands, ValueTaskArgs, WhenAllArgs};

use conduit_async::CancellationToken;
use conduit_common::LoggingTransformer;
use log::warn;

/// Parse the command line, set up logging and run the chosen demo
///
/// Returns whether the demo finished successfully.
///
/// # Errors
///
/// Returns an error if the settings are invalid or output cannot be written.
#[tokio::main]
pub async fn run() -> Result<bool, Box<dyn std::error::Error>> {
    use clap::Parser;

    let cli = Cli::parse();
    LoggingTransformer::init_with_default(cli.log_level());

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling");
                cancel.cancel();
            }
        })
    };

    let outcome = dispatch(cli, &cancel).await;
    interrupt.abort();
    Ok(outcome?)
}

/// Run the demo selected by `cli` under `cancel`
///
/// # Errors
///
/// Returns an error if the settings are invalid or output cannot be written.
pub async fn dispatch(cli: Cli, cancel: &CancellationToken) -> conduit_common::Result<bool> {
    match cli.command {
        Commands::List => commands::list::handle_list(cli.json),
        Commands::AwaitBasics(args) => {
            commands::await_basics::handle_await_basics(args, cli.json, cancel).await
        }
        Commands::Channel(args) => commands::channel::handle_channel(args, cli.json, cancel).await,
        Commands::WhenAll(args) => commands::when_all::handle_when_all(args, cli.json, cancel).await,
        Commands::ValueTask(args) => commands::valuetask::handle_valuetask(args, cli.json, cancel).await,
    }
}
