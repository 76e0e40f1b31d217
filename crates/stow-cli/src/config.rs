//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── container: ContainerConfig  # Account, key, container, endpoint
//! └── command: Command            # The operation to run
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! stow --account-name myaccount --account-key "..." --container photos list
//!
//! # Or via environment variables
//! STOW_ACCOUNT_NAME=myaccount STOW_ACCOUNT_KEY="..." STOW_CONTAINER=photos stow list
//! ```

use std::process;

use clap::Parser;
use stow_container::ContainerConfig;

use crate::commands::Command;
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "stow")]
#[command(about = "Upload, download, list, rename and delete blobs in one container")]
#[command(version)]
pub struct Cli {
    /// Storage account and container.
    #[clap(flatten)]
    pub container: ContainerConfig,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded before clap parses arguments, so its variables
    /// act as defaults for the `env` bindings.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Logs configuration at debug level (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            account = %self.container.account_name,
            container = %self.container.container_name,
            endpoint = %self.container.endpoint_url(),
            request_timeout_secs = self.container.request_timeout().as_secs(),
            command = self.command.name(),
            "Container configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::CommandFactory;

    use super::*;

    const CREDENTIALS: [&str; 7] = [
        "stow",
        "--account-name",
        "myaccount",
        "--account-key",
        "c3Rvdw==",
        "--container",
        "photos",
    ];

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(CREDENTIALS.iter().chain(args).copied()).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_container_flags() {
        let cli = parse(&["--endpoint", "http://127.0.0.1:10000/devstoreaccount1", "init"]);
        assert_eq!(cli.container.account_name, "myaccount");
        assert_eq!(cli.container.container_name, "photos");
        assert_eq!(
            cli.container.endpoint.as_deref(),
            Some("http://127.0.0.1:10000/devstoreaccount1")
        );
        assert!(matches!(cli.command, Command::Init));
    }

    #[test]
    fn parses_upload_with_name() {
        let cli = parse(&["upload", "./cat.png", "--name", "2024/cat.png"]);
        match cli.command {
            Command::Upload { file, name } => {
                assert_eq!(file, PathBuf::from("./cat.png"));
                assert_eq!(name.as_deref(), Some("2024/cat.png"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn list_prefix_defaults_to_everything() {
        let cli = parse(&["list"]);
        match cli.command {
            Command::List { prefix, json } => {
                assert_eq!(prefix, "");
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = parse(&["list", "foo/", "--json"]);
        assert!(matches!(cli.command, Command::List { ref prefix, json: true } if prefix == "foo/"));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(CREDENTIALS).is_err());
    }
}
