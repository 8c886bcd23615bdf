use std::sync::Arc;

use beacon_client::store::{ACCESS_TOKEN_KEY, StoreError};
use beacon_client::{AccessToken, ClientSlot, TokenSource};

/// An error returned when changing the access token.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The entered token is empty after trimming.
    #[error("access token must not be empty")]
    EmptyToken,
    /// The token could not be persisted.
    #[error("failed to persist access token")]
    Store(#[from] StoreError),
}

/// Saves and clears the access token.
///
/// Every change reinitializes the monitoring client, so the next action uses the new token.
#[derive(Debug)]
pub struct TokenSettings {
    slot: Arc<ClientSlot>,
}

impl TokenSettings {
    /// Creates settings operating on the given slot.
    pub fn new(slot: Arc<ClientSlot>) -> Self {
        Self { slot }
    }

    /// Persists a token entered by the user.
    ///
    /// Surrounding whitespace is removed. Empty input is rejected and nothing is stored.
    pub fn save_token(&self, input: &str) -> Result<AccessToken, SettingsError> {
        let token = AccessToken::new(input.trim()).ok_or(SettingsError::EmptyToken)?;
        self.slot.store().set(ACCESS_TOKEN_KEY, token.as_str())?;
        beacon_log::info!(token = %token.masked(), "access token saved");
        self.slot.reinitialize();
        Ok(token)
    }

    /// Removes the persisted token.
    ///
    /// A fallback token, if configured, becomes active again.
    pub fn clear_token(&self) -> Result<(), SettingsError> {
        self.slot.store().remove(ACCESS_TOKEN_KEY)?;
        beacon_log::info!("access token cleared");
        self.slot.reinitialize();
        Ok(())
    }

    /// Returns the active token and where it came from.
    pub fn current(&self) -> Option<(AccessToken, TokenSource)> {
        self.slot.resolver().resolve_with_source()
    }

    /// Returns `true` if the user should be asked to configure a token.
    pub fn token_banner(&self) -> bool {
        !self.slot.resolver().has_token()
    }
}
