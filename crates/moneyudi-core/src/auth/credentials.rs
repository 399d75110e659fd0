use anyhow::{Context, Result};
use keyring::Entry;

use crate::config::APP_NAME;

/// Refresh tokens kept in the OS keychain, keyed by email
pub struct CredentialStore;

impl CredentialStore {
    pub fn store_refresh_token(email: &str, token: &str) -> Result<()> {
        let entry = Entry::new(APP_NAME, email).context("Failed to create keyring entry")?;
        entry
            .set_password(token)
            .context("Failed to store refresh token in keychain")?;
        Ok(())
    }

    pub fn refresh_token(email: &str) -> Result<String> {
        let entry = Entry::new(APP_NAME, email).context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve refresh token from keychain")
    }

    pub fn delete(email: &str) -> Result<()> {
        let entry = Entry::new(APP_NAME, email).context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }
}
