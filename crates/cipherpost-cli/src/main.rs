//! Cipherpost command-line client.
//!
//! # Usage
//!
//! ```bash
//! cipherpost register --as bob
//! cipherpost send --as alice --to bob "meet at noon"
//! cipherpost inbox --as bob
//! cipherpost read --as bob 1
//! ```
//!
//! State lives in a single redb file, `cipherpost.redb` unless `--db` or
//! `CIPHERPOST_DB` says otherwise.

mod commands;

use std::{path::PathBuf, time::Duration};

use cipherpost_core::{
    CodexConfig, DEFAULT_MAX_MESSAGE_SIZE, MessageCodex, Postmaster, RedbStorage, SystemEnv,
};
use clap::Parser;
use commands::Command;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Cipherpost message client
#[derive(Parser, Debug)]
#[command(name = "cipherpost")]
#[command(about = "End-to-end encrypted point-to-point messages")]
#[command(version)]
struct Args {
    /// Path to the database file
    #[arg(long, env = "CIPHERPOST_DB", default_value = "cipherpost.redb")]
    db: PathBuf,

    /// Largest accepted plaintext in bytes
    #[arg(long, env = "CIPHERPOST_MAX_MESSAGE_SIZE", default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    max_message_size: usize,

    /// Seconds to wait for key generation
    #[arg(long, default_value = "30")]
    keygen_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    fn codex_config(&self) -> CodexConfig {
        CodexConfig {
            max_message_size: self.max_message_size,
            keygen_timeout: Duration::from_secs(self.keygen_timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // stdout carries command output
    let logs = fmt::layer().with_writer(std::io::stderr);
    tracing_subscriber::registry().with(logs).with(filter).init();

    tracing::debug!("Opening database at {}", args.db.display());

    let storage = RedbStorage::open(&args.db)?;
    let codex = MessageCodex::new(storage, SystemEnv::new(), args.codex_config())?;
    let postmaster = Postmaster::new(codex);

    let mut stdout = std::io::stdout().lock();
    commands::execute(args.command, &postmaster, &mut stdout).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use cipherpost_core::{MessageId, PrincipalId};

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_send_with_defaults() {
        let args =
            Args::try_parse_from(["cipherpost", "send", "--as", "alice", "--to", "bob", "hi"])
                .unwrap();

        assert_eq!(args.codex_config(), CodexConfig::default());
        assert_eq!(
            args.command,
            Command::Send {
                principal: PrincipalId::new("alice").unwrap(),
                to: PrincipalId::new("bob").unwrap(),
                message: Some("hi".to_string()),
                file: None,
            }
        );
    }

    #[test]
    fn parses_read_and_overrides() {
        let args = Args::try_parse_from([
            "cipherpost",
            "--db",
            "/tmp/other.redb",
            "--max-message-size",
            "1024",
            "--keygen-timeout-secs",
            "5",
            "read",
            "--as",
            "bob",
            "7",
        ])
        .unwrap();

        assert_eq!(args.db, PathBuf::from("/tmp/other.redb"));
        assert_eq!(args.codex_config().max_message_size, 1024);
        assert_eq!(args.codex_config().keygen_timeout, Duration::from_secs(5));
        assert_eq!(
            args.command,
            Command::Read { principal: PrincipalId::new("bob").unwrap(), id: MessageId(7) }
        );
    }

    #[test]
    fn rejects_invalid_principal() {
        let result = Args::try_parse_from(["cipherpost", "register", "--as", "has space"]);
        assert!(result.is_err());
    }

    #[test]
    fn send_needs_exactly_one_body() {
        assert!(Args::try_parse_from(["cipherpost", "send", "--as", "a", "--to", "b"]).is_err());
        assert!(
            Args::try_parse_from([
                "cipherpost", "send", "--as", "a", "--to", "b", "text", "--file", "body.txt",
            ])
            .is_err()
        );
    }
}
