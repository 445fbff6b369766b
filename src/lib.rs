pub mod attachment;
pub mod config;
pub mod encryption;
pub mod error;
pub mod keyring;
pub mod mailer;
pub mod message;
pub mod mime;
pub mod smtp;

pub use attachment::{AttachOption, Attachment};
pub use config::SmtpConfig;
pub use encryption::Encryption;
pub use error::{Error, Result};
pub use mailer::{Mailer, MockMailer};
pub use message::Message;
pub use smtp::{Client, Session};
