//! The sending capability and a recording stand-in for tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::message::Message;

/// Anything that can deliver messages.
///
/// Implemented by [`Client`](crate::Client) for real delivery and by
/// [`MockMailer`] for code under test.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `messages` in order, stopping at the first error.
    async fn send(&self, messages: &[Message]) -> Result<()>;
}

/// Records messages instead of sending them.
///
/// Recorded messages accumulate across calls. With a preset error every call
/// returns that error and records nothing.
#[derive(Debug, Default)]
pub struct MockMailer {
    sent: Mutex<Vec<Message>>,
    error: Option<Error>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every `send` fails with `error`.
    pub fn failing(error: Error) -> Self {
        MockMailer {
            sent: Mutex::default(),
            error: Some(error),
        }
    }

    pub fn set_error(&mut self, error: Option<Error>) {
        self.error = error;
    }

    /// Everything recorded so far, in send order.
    pub async fn sent_messages(&self) -> Vec<Message> {
        self.sent.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, messages: &[Message]) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.sent.lock().await.extend_from_slice(messages);
        Ok(())
    }
}
