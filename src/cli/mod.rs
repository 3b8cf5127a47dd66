//! CLI module
//!
//! Command-line interface for operating a gallery deployment.
//!
//! # Commands
//!
//! - `synth` - Synthesize CloudFormation templates for the stacks
//! - `tokens` - Show, store or clear the signed-in user's tokens
//! - `request` - Call the API with the stored credentials
//! - `check` - Validate the configuration file

mod commands;
mod runner;

pub use commands::{Cli, Commands, MethodArg, StackArg, TokenAction};
pub use runner::Runner;
