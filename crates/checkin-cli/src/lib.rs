//! Check-in CLI library.
//!
//! This crate provides the CLI interface for the attendance tracker.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, PeopleAction};
pub use config::{Config, NotifyConfig};
