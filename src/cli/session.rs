//! Session token storage and login flow

use anyhow::{Context, Result};
use dialoguer::Password;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::netease::auth::{is_md5_digest, resolve_digest};
use crate::netease::{NeteaseClient, Session};

const SESSION_FILE: &str = "cookie.txt";

/// Raw session cookie kept in a text file in the data directory
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session, creating an empty file if there is none
    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            debug!("Creating empty session file {}", self.path.display());
            std::fs::write(&self.path, "").context("Failed to create session file")?;
            return Ok(None);
        }

        let cookie = std::fs::read_to_string(&self.path).context("Failed to read session file")?;
        let cookie = cookie.trim();
        if cookie.is_empty() {
            return Ok(None);
        }
        Ok(Some(Session::new(cookie)))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        std::fs::write(&self.path, session.cookie()).context("Failed to write session file")?;
        debug!("Session stored in {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::write(&self.path, "").context("Failed to clear session file")?;
        }
        Ok(())
    }
}

/// Reuse a stored session if it still works, otherwise log in
pub async fn establish(
    client: &NeteaseClient,
    store: &SessionStore,
    config: &Config,
) -> Result<Session> {
    if config.sync.save_session {
        if let Some(session) = store.load()? {
            match client.account(&session).await {
                Ok(Some(account)) => {
                    info!("Signed in as {} ({})", account.nickname, account.user_id);
                    return Ok(session);
                }
                Ok(None) => info!("Stored session has expired, logging in again"),
                Err(e) => warn!("Could not verify stored session: {:#}", e),
            }
        }
    }

    let digest = password_digest(config)?;
    let session = client
        .login(&config.account.phone, &digest)
        .await
        .context("Login failed")?;

    if let Some(account) = client.account(&session).await? {
        info!("Signed in as {} ({})", account.nickname, account.user_id);
    }

    if config.sync.save_session {
        store.save(&session)?;
    }
    Ok(session)
}

fn password_digest(config: &Config) -> Result<String> {
    let account = &config.account;
    if let Some(digest) = resolve_digest(account.md5_password.as_deref(), account.password.as_deref())
    {
        if !is_md5_digest(&digest) {
            warn!("account.md5_password does not look like an MD5 hex digest");
        }
        return Ok(digest);
    }

    let password = Password::new()
        .with_prompt(format!("Password for {}", account.phone))
        .interact()
        .context("Failed to read password")?;
    resolve_digest(None, Some(password.as_str())).context("Empty password")
}
