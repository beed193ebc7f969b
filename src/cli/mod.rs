//! CLI module
//!
//! Command-line front end over the data layer.
//!
//! # Commands
//!
//! - `list` - Page through a resource list and print items as JSON lines
//! - `ack-alert` - Acknowledge an alert, retrying on version conflicts
//! - `config` - Print the effective configuration

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::{parse_filters, Runner};
