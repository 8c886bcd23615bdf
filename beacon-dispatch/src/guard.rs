use std::sync::Arc;

use beacon_client::CredentialResolver;

use crate::notice::NoticeBoard;

/// Notice posted when an action requires an access token but none is configured.
pub const MISSING_TOKEN_NOTICE: &str = "Please configure your access token in settings first";

/// Blocks actions that would reach the monitoring service without an access token.
#[derive(Clone, Debug)]
pub struct TokenGuard {
    resolver: CredentialResolver,
    notices: Arc<NoticeBoard>,
}

impl TokenGuard {
    /// Creates a guard posting to the given board.
    pub fn new(resolver: CredentialResolver, notices: Arc<NoticeBoard>) -> Self {
        Self { resolver, notices }
    }

    /// Returns `true` if the action may proceed.
    ///
    /// Otherwise, posts [`MISSING_TOKEN_NOTICE`].
    pub fn check(&self, action: &str) -> bool {
        if self.resolver.has_token() {
            return true;
        }

        beacon_log::warn!(action, "no access token configured");
        self.notices.post(MISSING_TOKEN_NOTICE);
        false
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use beacon_client::store::{ACCESS_TOKEN_KEY, LocalStore, MemoryStore};

    use super::*;

    #[test]
    fn test_guard() {
        let store = Arc::new(MemoryStore::new());
        let notices = Arc::new(NoticeBoard::new(Duration::from_secs(3)));
        let guard = TokenGuard::new(CredentialResolver::new(store.clone(), None), notices.clone());

        assert!(!guard.check("send"));
        assert_eq!(notices.current().unwrap().message(), MISSING_TOKEN_NOTICE);

        notices.dismiss();
        store.set(ACCESS_TOKEN_KEY, "token").unwrap();
        assert!(guard.check("send"));
        assert_eq!(notices.current(), None);
    }

    #[test]
    fn test_guard_fallback() {
        let store = Arc::new(MemoryStore::new());
        let notices = Arc::new(NoticeBoard::new(Duration::from_secs(3)));
        let resolver = CredentialResolver::new(store, Some("build-token".to_owned()));
        let guard = TokenGuard::new(resolver, notices.clone());

        assert!(guard.check("toggle"));
        assert_eq!(notices.current(), None);
    }
}
