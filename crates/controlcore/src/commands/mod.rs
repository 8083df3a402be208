//! Command dispatch: bridges CLI args -> core client -> output formatting.

pub mod config_cmd;
pub mod parse;
pub mod publish;
pub mod send;
pub mod snapshot;
pub mod util;
pub mod watch;

use controlcore_config::Config;
use controlcore_core::Client;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a broker-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    client: &Client,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(client, args, config, global).await,
        Command::Snapshot(args) => snapshot::handle(client, args, config, global).await,
        Command::Send(args) => send::handle(client, args, global).await,
        Command::Publish(args) => publish::handle(client, args, global).await,
        // Offline commands are handled before dispatch
        Command::Config(_) | Command::Parse(_) | Command::Completions(_) => Err(
            CliError::Internal("offline command reached the broker dispatcher".into()),
        ),
    }
}
