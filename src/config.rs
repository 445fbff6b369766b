use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::encryption::Encryption;
use crate::error::{Error, Result};
use crate::keyring;

// ---------------------------------------------------------------------------
// Runtime SMTP config (fully resolved)
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub encryption: Encryption,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("encryption", &self.encryption)
            .finish()
    }
}

const ENV_SERVER: &str = "NEVERLIGHT_MAIL_SMTP_SERVER";
const ENV_PORT: &str = "NEVERLIGHT_MAIL_SMTP_PORT";
const ENV_USER: &str = "NEVERLIGHT_MAIL_SMTP_USER";
const ENV_PASSWORD: &str = "NEVERLIGHT_MAIL_SMTP_PASSWORD";
const ENV_ENCRYPTION: &str = "NEVERLIGHT_MAIL_SMTP_ENCRYPTION";

impl SmtpConfig {
    /// Try env vars. Returns None if the server is unset or empty.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let Some(server) = var(ENV_SERVER).filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        let encryption = match var(ENV_ENCRYPTION) {
            Some(v) => v
                .parse()
                .map_err(|e| Error::Config(format!("{ENV_ENCRYPTION}: {e}")))?,
            None => Encryption::default(),
        };
        let port = match var(ENV_PORT) {
            Some(p) => p
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("{ENV_PORT}={p:?}: {e}")))?,
            None => encryption.default_port(),
        };
        Ok(Some(SmtpConfig {
            server: server.trim().to_string(),
            port,
            username: var(ENV_USER).unwrap_or_default(),
            password: var(ENV_PASSWORD).unwrap_or_default(),
            encryption,
        }))
    }

    /// Resolve config: env vars first, then the config file.
    pub fn load() -> Result<Option<Self>> {
        Self::load_with(|name| std::env::var(name).ok(), &config_path())
    }

    fn load_with(lookup: impl Fn(&str) -> Option<String>, path: &Path) -> Result<Option<Self>> {
        if let Some(config) = Self::from_vars(lookup)? {
            log::info!("SMTP config loaded from environment variables");
            return Ok(Some(config));
        }
        match FileSmtpConfig::load_from(path)? {
            Some(file) => {
                log::info!("SMTP config loaded from {}", path.display());
                file.resolve().map(Some)
            }
            None => {
                log::info!("No SMTP config found");
                Ok(None)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// On-disk config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend")]
pub enum PasswordBackend {
    #[serde(rename = "keyring")]
    Keyring,
    #[serde(rename = "plaintext")]
    Plaintext { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSmtpConfig {
    pub server: String,
    /// Falls back to the encryption mode's conventional port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: String,
    /// Defaults to `tls`, same as the env loader.
    #[serde(default)]
    pub encryption: Encryption,
    pub password: PasswordBackend,
}

impl FileSmtpConfig {
    pub fn load() -> Result<Option<Self>> {
        Self::load_from(&config_path())
    }

    fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
        Self::parse(&data).map(Some)
    }

    pub fn parse(data: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(|e| Error::Config(format!("parse config: {e}")))
    }

    pub fn save(&self) -> Result<()> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("create config dir: {e}")))?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("serialize config: {e}")))?;
        fs::write(&path, data).map_err(|e| Error::Config(format!("write config: {e}")))
    }

    /// Fill in the port and fetch the password, from the keyring if needed.
    pub fn resolve(&self) -> Result<SmtpConfig> {
        let password = match &self.password {
            PasswordBackend::Plaintext { value } => value.clone(),
            PasswordBackend::Keyring => keyring::get_password(&self.username, &self.server)?,
        };
        Ok(SmtpConfig {
            server: self.server.clone(),
            port: self.port.unwrap_or_else(|| self.encryption.default_port()),
            username: self.username.clone(),
            password,
            encryption: self.encryption,
        })
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("neverlight-mail")
}

pub fn config_path() -> PathBuf {
    config_dir().join("smtp.json")
}
