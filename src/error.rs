//! Error type shared by message building, configuration and delivery.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong between building a message and handing it to
/// the MTA.
///
/// Sources that are not `Clone` are kept behind an [`Arc`] so a preset error
/// can be handed out more than once (see [`MockMailer`](crate::MockMailer)).
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A message is missing `from` or has no `to` recipient.
    #[error("message is missing required field `{0}`")]
    MissingField(&'static str),

    /// An address could not be parsed for the SMTP envelope.
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// An attachment file could not be opened or read.
    #[error("failed to read attachment {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// Writing the multipart structure failed.
    #[error("failed to encode message: {0}")]
    Encoding(String),

    /// Dialing, TLS negotiation or the socket itself failed.
    #[error("SMTP connection failed: {0}")]
    Connection(#[source] Arc<lettre::transport::smtp::Error>),

    /// The server rejected authentication, a recipient or the data.
    #[error("SMTP server rejected the transaction: {0}")]
    Protocol(#[source] Arc<lettre::transport::smtp::Error>),

    /// Configuration could not be loaded, parsed or saved.
    #[error("config error: {0}")]
    Config(String),

    /// The OS credential store refused a request.
    #[error("keyring error: {0}")]
    Keyring(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn encoding(err: io::Error) -> Self {
        Self::Encoding(err.to_string())
    }

    /// Sort a `lettre` SMTP error into a server rejection or a transport
    /// failure.
    pub(crate) fn smtp(err: lettre::transport::smtp::Error) -> Self {
        if err.is_permanent() || err.is_transient() || err.is_response() {
            Self::Protocol(Arc::new(err))
        } else {
            Self::Connection(Arc::new(err))
        }
    }

    /// Returns `true` if the message itself was malformed, as opposed to a
    /// failure while reading files or talking to the server.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingField(_) | Self::InvalidAddress { .. })
    }
}
