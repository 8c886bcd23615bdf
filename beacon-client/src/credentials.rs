use std::fmt;
use std::sync::Arc;

use crate::store::{ACCESS_TOKEN_KEY, LocalStore};

/// A token authorizing event submission to the monitoring service.
///
/// The token format is not validated. The `Debug` representation never shows the value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AccessToken(String);

impl AccessToken {
    /// Creates a token, returning `None` for an empty string.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        (!token.is_empty()).then_some(Self(token))
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the token with everything but the last four characters masked.
    pub fn masked(&self) -> String {
        let chars = self.0.chars().count();
        let visible = if chars > 8 { 4 } else { 0 };
        let tail: String = self.0.chars().skip(chars - visible).collect();
        format!("{}{tail}", "*".repeat(chars - visible))
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"<redacted>").finish()
    }
}

/// Where a resolved [`AccessToken`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenSource {
    /// The token was saved into local storage.
    Stored,
    /// The token was configured or compiled into the binary.
    Fallback,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored => write!(f, "local storage"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Determines the active access token.
///
/// The stored token takes precedence over the fallback. Resolution reads local storage on every
/// call, so callers should resolve again instead of holding on to a token: the operator may save
/// or clear a token at any time.
#[derive(Clone, Debug)]
pub struct CredentialResolver {
    store: Arc<dyn LocalStore>,
    fallback: Option<String>,
}

impl CredentialResolver {
    /// Creates a resolver over the given store and fallback token.
    pub fn new(store: Arc<dyn LocalStore>, fallback: Option<String>) -> Self {
        Self { store, fallback }
    }

    /// Resolves the active access token.
    pub fn resolve(&self) -> Option<AccessToken> {
        self.resolve_with_source().map(|(token, _)| token)
    }

    /// Resolves the active access token along with where it came from.
    pub fn resolve_with_source(&self) -> Option<(AccessToken, TokenSource)> {
        if let Some(token) = self.store.get(ACCESS_TOKEN_KEY).and_then(AccessToken::new) {
            return Some((token, TokenSource::Stored));
        }

        self.fallback
            .clone()
            .and_then(AccessToken::new)
            .map(|token| (token, TokenSource::Fallback))
    }

    /// Returns `true` if a token can be resolved.
    pub fn has_token(&self) -> bool {
        self.resolve().is_some()
    }
}

#[cfg(test)]
mod tests {
    use crate::store::MemoryStore;

    use super::*;

    fn resolver(stored: Option<&str>, fallback: Option<&str>) -> CredentialResolver {
        let store = Arc::new(MemoryStore::new());
        if let Some(token) = stored {
            store.set(ACCESS_TOKEN_KEY, token).unwrap();
        }
        CredentialResolver::new(store, fallback.map(str::to_owned))
    }

    #[test]
    fn test_stored_token_wins() {
        let resolver = resolver(Some("stored"), Some("fallback"));
        let (token, source) = resolver.resolve_with_source().unwrap();
        assert_eq!(token.as_str(), "stored");
        assert_eq!(source, TokenSource::Stored);
    }

    #[test]
    fn test_fallback_token() {
        let resolver = resolver(None, Some("fallback"));
        let (token, source) = resolver.resolve_with_source().unwrap();
        assert_eq!(token.as_str(), "fallback");
        assert_eq!(source, TokenSource::Fallback);
    }

    #[test]
    fn test_empty_values_are_absent() {
        let resolver = resolver(Some(""), Some(""));
        assert!(resolver.resolve().is_none());
        assert!(!resolver.has_token());
    }

    #[test]
    fn test_resolve_sees_later_changes() {
        let store = Arc::new(MemoryStore::new());
        let resolver = CredentialResolver::new(store.clone(), None);
        assert!(!resolver.has_token());

        store.set(ACCESS_TOKEN_KEY, "saved-later").unwrap();
        assert_eq!(resolver.resolve().unwrap().as_str(), "saved-later");
    }

    #[test]
    fn test_token_redacted() {
        let token = AccessToken::new("0123456789abcdef").unwrap();
        assert_eq!(format!("{token:?}"), r#"AccessToken("<redacted>")"#);
        assert_eq!(token.masked(), "************cdef");
        assert_eq!(AccessToken::new("short").unwrap().masked(), "*****");
    }
}
