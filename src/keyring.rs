use crate::error::{Error, Result};

const SERVICE: &str = "neverlight-mail-send";

fn key_id(username: &str, server: &str) -> String {
    format!("smtp-{username}@{server}")
}

fn entry(key: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(SERVICE, key).map_err(|e| {
        log::error!("keyring Entry::new failed for key={key:?}: {e}");
        Error::Keyring(e.to_string())
    })
}

/// Fetch the SMTP password stored for `username` on `server`.
pub fn get_password(username: &str, server: &str) -> Result<String> {
    let key = key_id(username, server);
    log::debug!("keyring GET: service={SERVICE:?} key={key:?}");
    entry(&key)?.get_password().map_err(|e| {
        log::warn!("keyring get_password failed for key={key:?}: {e}");
        Error::Keyring(format!("get: {e}"))
    })
}

pub fn set_password(username: &str, server: &str, password: &str) -> Result<()> {
    let key = key_id(username, server);
    log::debug!("keyring SET: service={SERVICE:?} key={key:?}");
    entry(&key)?.set_password(password).map_err(|e| {
        log::error!("keyring set_password failed for key={key:?}: {e}");
        Error::Keyring(format!("set: {e}"))
    })
}

pub fn delete_password(username: &str, server: &str) -> Result<()> {
    let key = key_id(username, server);
    log::debug!("keyring DELETE: service={SERVICE:?} key={key:?}");
    entry(&key)?.delete_credential().map_err(|e| {
        log::warn!("keyring delete failed for key={key:?}: {e}");
        Error::Keyring(format!("delete: {e}"))
    })
}
