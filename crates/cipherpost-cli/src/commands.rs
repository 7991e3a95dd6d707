//! Subcommands and their output.
//!
//! Output goes to a caller-supplied writer so the commands can be exercised
//! without a terminal. Logs go to stderr, never into this writer.

use std::{io::Write, path::PathBuf};

use cipherpost_core::{CodexError, Environment, MessageId, Postmaster, PrincipalId, Storage};
use cipherpost_crypto::CryptoError;
use clap::Subcommand;
use thiserror::Error;

/// Errors surfaced to the user.
#[derive(Debug, Error)]
pub enum CliError {
    /// Vault or codex operation failed
    #[error(transparent)]
    Codex(#[from] CodexError),

    /// Key could not be encoded for display
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Writing output or reading an input file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Arguments were syntactically valid but unusable
    #[error("invalid input: {0}")]
    Input(String),
}

/// Cipherpost operations. `--as` names the acting principal.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate and store a keypair
    Register {
        /// Principal to register
        #[arg(long = "as", value_name = "PRINCIPAL")]
        principal: PrincipalId,
    },

    /// Encrypt a message for a recipient
    Send {
        /// Sending principal
        #[arg(long = "as", value_name = "PRINCIPAL")]
        principal: PrincipalId,

        /// Recipient principal
        #[arg(long, value_name = "PRINCIPAL")]
        to: PrincipalId,

        /// Message text
        #[arg(required_unless_present = "file")]
        message: Option<String>,

        /// Read the message body from a file instead
        #[arg(long, conflicts_with = "message")]
        file: Option<PathBuf>,
    },

    /// Decrypt one of your messages
    Read {
        /// Reading principal
        #[arg(long = "as", value_name = "PRINCIPAL")]
        principal: PrincipalId,

        /// Message id
        id: MessageId,
    },

    /// List messages sent to you
    Inbox {
        /// Principal whose inbox to list
        #[arg(long = "as", value_name = "PRINCIPAL")]
        principal: PrincipalId,
    },

    /// List messages you sent
    Outbox {
        /// Principal whose outbox to list
        #[arg(long = "as", value_name = "PRINCIPAL")]
        principal: PrincipalId,
    },

    /// List registered principals
    Directory,

    /// Show a principal's public key and fingerprint
    Pubkey {
        /// Principal to look up
        principal: PrincipalId,
    },
}

/// Run `command` against `postmaster`, writing results to `out`.
pub async fn execute<S, E, W>(
    command: Command,
    postmaster: &Postmaster<S, E>,
    out: &mut W,
) -> Result<(), CliError>
where
    S: Storage,
    E: Environment,
    W: Write,
{
    match command {
        Command::Register { principal } => {
            let public_key = postmaster.register_keypair(principal.clone()).await?;
            writeln!(out, "registered {principal}")?;
            writeln!(out, "fingerprint {}", public_key.fingerprint()?)?;
        },

        Command::Send { principal, to, message, file } => {
            let body = match (message, file) {
                (Some(text), None) => text.into_bytes(),
                (None, Some(path)) => {
                    // Refuse oversize files before reading them into memory
                    let max = postmaster.codex().config().max_message_size;
                    let len = std::fs::metadata(&path)?.len();
                    let size = usize::try_from(len).unwrap_or(usize::MAX);
                    if size > max {
                        return Err(CodexError::MessageTooLarge { size, max }.into());
                    }
                    std::fs::read(path)?
                },
                _ => return Err(CliError::Input("give either a message or --file".to_string())),
            };

            let sent = postmaster.send_message(principal, to.clone(), body).await?;
            writeln!(out, "sent message {} to {to}", sent.id)?;
        },

        Command::Read { principal, id } => {
            let plaintext = postmaster.read_message(id, principal).await?;
            out.write_all(&plaintext)?;
            if !plaintext.ends_with(b"\n") {
                writeln!(out)?;
            }
        },

        Command::Inbox { principal } => {
            let inbox = postmaster.inbox(principal).await?;
            if inbox.is_empty() {
                writeln!(out, "no messages")?;
            }
            for entry in inbox {
                let (id, from, at) = (entry.id, entry.sender, entry.created_at_secs);
                writeln!(out, "{id}\tfrom {from}\tat {at}")?;
            }
        },

        Command::Outbox { principal } => {
            let outbox = postmaster.outbox(principal).await?;
            if outbox.is_empty() {
                writeln!(out, "no messages")?;
            }
            for entry in outbox {
                let (id, to, at) = (entry.id, entry.recipient, entry.created_at_secs);
                writeln!(out, "{id}\tto {to}\tat {at}")?;
            }
        },

        Command::Directory => {
            for principal in postmaster.directory().await? {
                writeln!(out, "{principal}")?;
            }
        },

        Command::Pubkey { principal } => {
            let public_key = postmaster.public_key_of(principal).await?;
            write!(out, "{}", public_key.to_pem()?)?;
            writeln!(out, "fingerprint {}", public_key.fingerprint()?)?;
        },
    }

    Ok(())
}
