//! CLI commands and argument parsing

use crate::infra::StackSelection;
use crate::types::{Method, Stage};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Gallery toolkit CLI
#[derive(Parser, Debug)]
#[command(name = "gallery-kit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short = 'C', long, global = true, default_value = "gallery.yaml")]
    pub config: PathBuf,

    /// Token file, overriding `auth.token_file`
    #[arg(long, global = true)]
    pub token_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synthesize CloudFormation templates
    Synth {
        /// Which stack to synthesize
        #[arg(long, value_enum, default_value = "all")]
        stack: StackArg,

        /// Stage, overriding `infra.stage`
        #[arg(long)]
        stage: Option<Stage>,

        /// Write `<stack>.template.json` files here instead of printing
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Inspect or modify the stored tokens
    Tokens {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Send an API request through the auth interceptor
    Request {
        /// HTTP method
        #[arg(value_enum)]
        method: MethodArg,

        /// Path relative to `environment.api_url`, or a full URL
        path: String,

        /// JSON request body
        #[arg(long)]
        data: Option<String>,
    },

    /// Validate the configuration file
    Check,
}

/// Token subcommands
#[derive(Subcommand, Debug)]
pub enum TokenAction {
    /// Show who is signed in
    Show,

    /// Store tokens obtained elsewhere
    Set {
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        id_token: String,
        #[arg(long)]
        refresh_token: Option<String>,
    },

    /// Sign out locally
    Clear,
}

/// Stack selection argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StackArg {
    All,
    Database,
    Dns,
}

impl From<StackArg> for StackSelection {
    fn from(arg: StackArg) -> Self {
        match arg {
            StackArg::All => StackSelection::All,
            StackArg::Database => StackSelection::Database,
            StackArg::Dns => StackSelection::Dns,
        }
    }
}

/// HTTP method argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<MethodArg> for Method {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Get => Method::GET,
            MethodArg::Post => Method::POST,
            MethodArg::Put => Method::PUT,
            MethodArg::Patch => Method::PATCH,
            MethodArg::Delete => Method::DELETE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_synth() {
        let cli = Cli::parse_from([
            "gallery-kit",
            "synth",
            "--stack",
            "dns",
            "--stage",
            "prod",
        ]);
        match cli.command {
            Commands::Synth {
                stack,
                stage,
                out_dir,
            } => {
                assert_eq!(stack, StackArg::Dns);
                assert_eq!(stage, Some(Stage::Prod));
                assert!(out_dir.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.config, PathBuf::from("gallery.yaml"));
    }

    #[test]
    fn test_parse_request() {
        let cli = Cli::parse_from([
            "gallery-kit",
            "-C",
            "prod.yaml",
            "request",
            "post",
            "/favorites",
            "--data",
            r#"{"photoId":"p1"}"#,
        ]);
        assert_eq!(cli.config, PathBuf::from("prod.yaml"));
        match cli.command {
            Commands::Request { method, path, data } => {
                assert_eq!(Method::from(method), Method::POST);
                assert_eq!(path, "/favorites");
                assert!(data.is_some());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_tokens_set() {
        let cli = Cli::parse_from([
            "gallery-kit",
            "tokens",
            "set",
            "--access-token",
            "a",
            "--id-token",
            "i",
        ]);
        assert!(matches!(
            cli.command,
            Commands::Tokens {
                action: TokenAction::Set { refresh_token: None, .. }
            }
        ));
    }
}
