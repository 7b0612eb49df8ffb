//! Command dispatch: bridges CLI args -> core bridge calls -> output.

pub mod config_cmd;
pub mod ops;
pub mod run;
pub mod status;
pub mod verify;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Dispatch the parsed command to the appropriate handler.
pub async fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Run(args) => run::handle(&args, &cli.global).await,
        Command::Status(args) => status::handle(&args, &cli.global).await,
        Command::Lock(args) => ops::handle(&args, latchkey_core::LockState::Locked, &cli.global).await,
        Command::Unlock(args) => {
            ops::handle(&args, latchkey_core::LockState::Unlocked, &cli.global).await
        }
        Command::Verify(args) => verify::handle(args, &cli.global).await,
        Command::Config(args) => config_cmd::handle(args, &cli.global),
    }
}
