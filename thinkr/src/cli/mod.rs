//! CLI argument parsing module.

mod args;
mod chat;
mod commands;

pub use args::{Cli, Commands};
pub use commands::execute;
