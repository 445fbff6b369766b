use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the SMTP connection is secured. Defaults to [`Encryption::Tls`]
/// wherever a mode is left unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    /// Plain TCP. STARTTLS is used only if the server offers it.
    None,
    /// Implicit TLS from the first byte (usually port 465).
    Ssl,
    /// STARTTLS is required before authenticating (usually port 587).
    #[default]
    Tls,
}

impl Encryption {
    /// Conventional submission port for this mode.
    pub fn default_port(self) -> u16 {
        match self {
            Encryption::None => 25,
            Encryption::Ssl => 465,
            Encryption::Tls => 587,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Encryption::None => "none",
            Encryption::Ssl => "ssl",
            Encryption::Tls => "tls",
        }
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encryption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "plain" => Ok(Encryption::None),
            "ssl" | "implicit" => Ok(Encryption::Ssl),
            "tls" | "starttls" => Ok(Encryption::Tls),
            other => Err(format!("unknown encryption mode {other:?}")),
        }
    }
}
