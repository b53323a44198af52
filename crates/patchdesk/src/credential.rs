//! Expiring access token cache with an injected fetcher.

use parking_lot::Mutex;
use tracing::debug;

use crate::config::CredentialSection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    /// Unix seconds.
    pub expires_at: u64,
}

impl Credential {
    fn is_fresh(&self, now_secs: u64, refresh_buffer: u64) -> bool {
        self.expires_at.saturating_sub(refresh_buffer) > now_secs
    }
}

/// Holds at most one credential. Shared by reference; the lock is held
/// across a fetch so concurrent callers never refresh twice.
#[derive(Debug, Default)]
pub struct CredentialCache {
    refresh_buffer: u64,
    slot: Mutex<Option<Credential>>,
}

impl CredentialCache {
    /// `refresh_buffer` is how many seconds before expiry a token counts as
    /// stale.
    pub fn new(refresh_buffer: u64) -> Self {
        Self { refresh_buffer, slot: Mutex::new(None) }
    }

    pub fn from_config(section: &CredentialSection) -> Self {
        Self::new(section.refresh_buffer_secs)
    }

    pub fn refresh_buffer(&self) -> u64 {
        self.refresh_buffer
    }

    /// Return the cached token if still fresh at `now_secs`, otherwise fetch
    /// and store a new one. A failed fetch leaves the cache unchanged.
    pub fn get_or_refresh<F, E>(&self, now_secs: u64, fetch: F) -> Result<String, E>
    where
        F: FnOnce() -> Result<Credential, E>,
    {
        let mut slot = self.slot.lock();
        if let Some(cred) = slot.as_ref().filter(|c| c.is_fresh(now_secs, self.refresh_buffer)) {
            return Ok(cred.token.clone());
        }
        let cred = fetch()?;
        debug!(expires_at = cred.expires_at, "credential refreshed");
        let token = cred.token.clone();
        *slot = Some(cred);
        Ok(token)
    }

    pub fn current(&self) -> Option<Credential> {
        self.slot.lock().clone()
    }

    pub fn invalidate(&self) {
        self.slot.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn cred(token: &str, expires_at: u64) -> Credential {
        Credential { token: token.into(), expires_at }
    }

    #[test]
    fn serves_cached_until_buffer() {
        let cache = CredentialCache::new(300);
        let calls = Cell::new(0);
        let fetch = |t: &'static str| {
            calls.set(calls.get() + 1);
            Ok::<_, String>(cred(t, 1_000))
        };

        assert_eq!(cache.get_or_refresh(0, || fetch("a")).unwrap(), "a");
        assert_eq!(cache.get_or_refresh(699, || fetch("b")).unwrap(), "a");
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.get_or_refresh(700, || fetch("c")).unwrap(), "c");
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn failed_fetch_keeps_previous() {
        let cache = CredentialCache::new(0);
        cache.get_or_refresh(0, || Ok::<_, String>(cred("a", 10))).unwrap();
        let err = cache.get_or_refresh(20, || Err::<Credential, _>("offline".to_string())).unwrap_err();
        assert_eq!(err, "offline");
        assert_eq!(cache.current(), Some(cred("a", 10)));
    }

    #[test]
    fn invalidate_forces_fetch() {
        let cache = CredentialCache::new(0);
        cache.get_or_refresh(0, || Ok::<_, String>(cred("a", 100))).unwrap();
        cache.invalidate();
        assert!(cache.current().is_none());
        assert_eq!(cache.get_or_refresh(1, || Ok::<_, String>(cred("b", 100))).unwrap(), "b");
    }

    #[test]
    fn buffer_larger_than_lifetime_is_always_stale() {
        let cache = CredentialCache::new(600);
        cache.get_or_refresh(0, || Ok::<_, String>(cred("a", 100))).unwrap();
        assert_eq!(cache.get_or_refresh(0, || Ok::<_, String>(cred("b", 100))).unwrap(), "b");
    }

    #[test]
    fn buffer_comes_from_config() {
        let config = crate::config::Config::from_toml_str("[credential]\nrefresh_buffer_secs = 30").unwrap();
        let cache = config.credential_cache();
        assert_eq!(cache.refresh_buffer(), 30);
        cache.get_or_refresh(0, || Ok::<_, String>(cred("a", 100))).unwrap();
        assert_eq!(cache.get_or_refresh(69, || Ok::<_, String>(cred("b", 200))).unwrap(), "a");
        assert_eq!(cache.get_or_refresh(70, || Ok::<_, String>(cred("c", 200))).unwrap(), "c");

        assert_eq!(CredentialCache::from_config(&Default::default()).refresh_buffer(), 300);
    }

    #[test]
    fn shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CredentialCache>();
    }
}
