use std::time::Duration;

use async_trait::async_trait;
use lettre::address::Envelope;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::{Credentials, DEFAULT_MECHANISMS};
use lettre::transport::smtp::client::{AsyncSmtpConnection, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use lettre::Address;

use crate::config::SmtpConfig;
use crate::encryption::Encryption;
use crate::error::{Error, Result};
use crate::mailer::Mailer;
use crate::message::Message;

/// Same as `lettre`'s transport default.
const TIMEOUT: Duration = Duration::from_secs(60);

/// SMTP connection parameters. Holds no connection state, so one client can
/// serve any number of concurrent [`Client::send`] calls.
#[derive(Clone)]
pub struct Client {
    host: String,
    port: u16,
    username: String,
    password: String,
    encryption: Encryption,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("encryption", &self.encryption)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        encryption: Encryption,
    ) -> Self {
        Client {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            encryption,
        }
    }

    pub fn from_config(config: &SmtpConfig) -> Self {
        Self::new(
            config.server.clone(),
            config.port,
            config.username.clone(),
            config.password.clone(),
            config.encryption,
        )
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn encryption(&self) -> Encryption {
        self.encryption
    }

    /// Open one connection: greeting and EHLO, the TLS upgrade the
    /// encryption mode calls for, then AUTH when a username is set.
    ///
    /// Every message sent through the returned [`Session`] reuses this
    /// connection. Call [`Session::close`] to say QUIT.
    pub async fn connect(&self) -> Result<Session> {
        let server = format!("{}:{}", self.host, self.port);
        log::debug!("Connecting to SMTP {server} (encryption={})", self.encryption);

        let hello = ClientId::default();
        let wrapper = match self.encryption {
            Encryption::Ssl => Some(self.tls_parameters()?),
            Encryption::None | Encryption::Tls => None,
        };
        let mut conn = AsyncSmtpConnection::connect_tokio1(
            (self.host.as_str(), self.port),
            Some(TIMEOUT),
            &hello,
            wrapper,
            None,
        )
        .await
        .map_err(|e| {
            log::warn!("SMTP connect to {server} failed: {e}");
            Error::smtp(e)
        })?;

        if let Err(err) = self.handshake(&mut conn, &hello).await {
            log::warn!("SMTP handshake with {server} failed: {err}");
            conn.abort().await;
            return Err(err);
        }
        Ok(Session { conn, server })
    }

    /// Deliver `messages` in order over one fresh connection, stopping at the
    /// first failure. Messages after the failing one are not attempted.
    pub async fn send(&self, messages: &[Message]) -> Result<()> {
        let mut session = self.connect().await?;
        let result = session.send_all(messages).await;
        if let Err(err) = session.close().await {
            log::warn!("SMTP QUIT failed: {err}");
        }
        result
    }

    async fn handshake(&self, conn: &mut AsyncSmtpConnection, hello: &ClientId) -> Result<()> {
        match self.encryption {
            // Required STARTTLS: a server without it fails the session.
            Encryption::Tls => conn
                .starttls(self.tls_parameters()?, hello)
                .await
                .map_err(Error::smtp)?,
            Encryption::None if conn.can_starttls() => conn
                .starttls(self.tls_parameters()?, hello)
                .await
                .map_err(Error::smtp)?,
            Encryption::None | Encryption::Ssl => {}
        }

        if !self.username.is_empty() {
            let credentials = Credentials::new(self.username.clone(), self.password.clone());
            conn.auth(DEFAULT_MECHANISMS, &credentials)
                .await
                .map_err(Error::smtp)?;
            log::debug!("SMTP authenticated as {}", self.username);
        }
        Ok(())
    }

    fn tls_parameters(&self) -> Result<TlsParameters> {
        TlsParameters::new(self.host.clone()).map_err(Error::smtp)
    }
}

#[async_trait]
impl Mailer for Client {
    async fn send(&self, messages: &[Message]) -> Result<()> {
        Client::send(self, messages).await
    }
}

/// One open SMTP connection, reused for every message sent through it.
///
/// Dropping a session closes the socket without QUIT.
pub struct Session {
    conn: AsyncSmtpConnection,
    server: String,
}

impl Session {
    /// Run one mail transaction: MAIL FROM, RCPT TO for `to`, `cc` and `bcc`
    /// in that order, then DATA.
    ///
    /// The message is serialized before any command is issued, so an invalid
    /// message never reaches the server.
    pub async fn send(&mut self, message: &Message) -> Result<()> {
        let payload = message.to_bytes()?;
        let envelope = envelope(message)?;

        self.conn.send(&envelope, &payload).await.map_err(|e| {
            log::warn!("SMTP delivery via {} failed: {e}", self.server);
            Error::smtp(e)
        })?;
        log::debug!(
            "Delivered message to {} recipient(s) via {}",
            envelope.to().len(),
            self.server
        );
        Ok(())
    }

    /// Send each message in order, stopping at the first error.
    pub async fn send_all(&mut self, messages: &[Message]) -> Result<()> {
        for message in messages {
            self.send(message).await?;
        }
        Ok(())
    }

    /// Say QUIT and close the connection. A connection already torn down by
    /// a failed command is just dropped.
    pub async fn close(mut self) -> Result<()> {
        log::debug!("Closing SMTP session to {}", self.server);
        if self.conn.has_broken() {
            return Ok(());
        }
        self.conn.quit().await.map_err(Error::smtp)?;
        Ok(())
    }
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.parse::<Mailbox>()
        .map(|mailbox| mailbox.email)
        .map_err(|e| Error::InvalidAddress {
            address: raw.to_string(),
            reason: e.to_string(),
        })
}

/// SMTP envelope for `message`: the bare address of `from` and every
/// recipient from `to`, `cc` and `bcc`, order and duplicates kept.
pub(crate) fn envelope(message: &Message) -> Result<Envelope> {
    let from = parse_address(&message.from)?;
    let to = message
        .recipients()
        .into_iter()
        .map(parse_address)
        .collect::<Result<Vec<_>>>()?;
    Envelope::new(Some(from), to).map_err(|e| Error::InvalidAddress {
        address: message.recipients().join(", "),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        let mut m = Message::new();
        m.set_from("Alice <a@x.com>")
            .add_to(["b@x.com", "c@x.com"])
            .add_cc(["d@x.com"])
            .add_bcc(["b@x.com", "e@x.com"])
            .set_subject("Hi")
            .set_body("text/plain", "hello");
        m
    }

    #[test]
    fn envelope_uses_bare_sender_address() {
        let env = envelope(&message()).unwrap();
        assert_eq!(env.from().map(|a| a.to_string()), Some("a@x.com".into()));
    }

    #[test]
    fn envelope_recipients_keep_to_cc_bcc_order() {
        let env = envelope(&message()).unwrap();
        let rcpts: Vec<String> = env.to().iter().map(|a| a.to_string()).collect();
        assert_eq!(
            rcpts,
            vec!["b@x.com", "c@x.com", "d@x.com", "b@x.com", "e@x.com"]
        );
    }

    #[test]
    fn bad_recipient_is_reported() {
        let mut m = message();
        m.add_bcc(["not an address"]);
        match envelope(&m) {
            Err(Error::InvalidAddress { address, .. }) => assert_eq!(address, "not an address"),
            other => panic!("expected InvalidAddress, got {other:?}"),
        }
    }

    #[test]
    fn client_from_config_copies_fields() {
        let cfg = SmtpConfig {
            server: "smtp.example.com".into(),
            port: 465,
            username: "me".into(),
            password: "hunter2".into(),
            encryption: Encryption::Ssl,
        };
        let client = Client::from_config(&cfg);
        assert_eq!(client.host(), "smtp.example.com");
        assert_eq!(client.port(), 465);
        assert_eq!(client.encryption(), Encryption::Ssl);
        assert!(!format!("{client:?}").contains("hunter2"));
    }
}
