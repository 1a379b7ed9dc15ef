//! Command line front end over the aggregator

pub mod assets;
pub mod health;
pub mod logs;
pub mod setup;
pub mod ui;
pub mod watch;

/// Outcome of a command; a failure maps to a non-zero exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failure,
}
