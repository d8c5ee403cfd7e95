//! Command dispatch: bridges CLI args -> API/coordinator calls -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod events;
pub mod login;
pub mod poll;
pub mod util;
pub mod values;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

/// Dispatch a network-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => login::handle(session, args, global).await,
        Command::Devices => devices::handle(session, global).await,
        Command::Values(args) => values::handle(session, args, global).await,
        Command::Events(args) => events::handle(session, args, global).await,
        Command::Poll(args) => poll::handle(session, args, global).await,
        Command::Watch(args) => watch::handle(session, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "handled without a session".into(),
        }),
    }
}
