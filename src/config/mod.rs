//! Configuration and CLI handling

pub mod cli;
pub mod settings;

pub use cli::{Cli, Command, ImportArgs, TagArgs};
pub use settings::{ImportSettings, TagSettings};
