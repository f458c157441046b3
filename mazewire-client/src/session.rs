//! Session state shared by concurrent requests.

use crate::site::ActiveSite;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// State shared by every request of one operator session.
///
/// Holds the authentication-in-progress flag, the active site, the number of
/// in-flight requests (which drives the loading indicator), and the gate that
/// keeps concurrent re-authentication demands down to a single prompt.
pub struct SessionContext {
    /// Set by a login request or a 403; cleared by every terminal branch.
    auth_in_progress: AtomicBool,
    /// Open login prompts; the flag reads true while any is open.
    prompts_open: AtomicUsize,
    /// Bumped after every successful login.
    auth_generation: AtomicU64,
    /// Requests currently between send and terminal branch.
    in_flight: AtomicUsize,
    reauth_gate: Mutex<()>,
    active_site: RwLock<ActiveSite>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::with_site(ActiveSite::default())
    }

    pub fn with_site(site: ActiveSite) -> Self {
        Self {
            auth_in_progress: AtomicBool::new(false),
            prompts_open: AtomicUsize::new(0),
            auth_generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            reauth_gate: Mutex::new(()),
            active_site: RwLock::new(site),
        }
    }

    /// Returns whether a re-authentication flow is under way.
    pub fn is_authenticating(&self) -> bool {
        self.auth_in_progress.load(Ordering::SeqCst) || self.prompts_open.load(Ordering::SeqCst) > 0
    }

    pub(crate) fn set_authenticating(&self, value: bool) {
        self.auth_in_progress.store(value, Ordering::SeqCst);
    }

    pub(crate) fn prompt_opened(&self) {
        self.prompts_open.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn prompt_closed(&self) {
        self.prompts_open.fetch_sub(1, Ordering::SeqCst);
    }

    /// Number of successful logins in this session.
    pub fn auth_generation(&self) -> u64 {
        self.auth_generation.load(Ordering::SeqCst)
    }

    pub(crate) fn bump_auth_generation(&self) {
        self.auth_generation.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn reauth_gate(&self) -> &Mutex<()> {
        &self.reauth_gate
    }

    /// Registers a request; returns true if it is the only one in flight.
    pub(crate) fn begin_request(&self) -> bool {
        self.in_flight.fetch_add(1, Ordering::SeqCst) == 0
    }

    /// Unregisters a request; returns true if none remain in flight.
    pub(crate) fn end_request(&self) -> bool {
        self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Returns a copy of the active site.
    pub fn active_site(&self) -> ActiveSite {
        self.active_site.read().clone()
    }

    /// Id attached to payloads, or `None` for the default site.
    pub fn site_id(&self) -> Option<i64> {
        let site = self.active_site.read();
        (!site.is_default()).then_some(site.id)
    }

    /// Switches the site subsequent requests act on.
    pub fn set_active_site(&self, site: ActiveSite) {
        tracing::debug!(site_id = site.id, domain = %site.domain, "active site changed");
        *self.active_site.write() = site;
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::SiteRole;

    #[test]
    fn test_flag_reads_true_while_prompt_open() {
        let session = SessionContext::new();
        assert!(!session.is_authenticating());

        session.prompt_opened();
        session.set_authenticating(false);
        assert!(session.is_authenticating());

        session.prompt_closed();
        assert!(!session.is_authenticating());

        session.set_authenticating(true);
        assert!(session.is_authenticating());
    }

    #[test]
    fn test_in_flight_transitions() {
        let session = SessionContext::new();
        assert!(session.begin_request());
        assert!(!session.begin_request());
        assert_eq!(session.in_flight(), 2);
        assert!(!session.end_request());
        assert!(session.end_request());
        assert_eq!(session.in_flight(), 0);
    }

    #[test]
    fn test_site_id_only_when_not_default() {
        let session = SessionContext::new();
        assert_eq!(session.site_id(), None);

        session.set_active_site(
            ActiveSite::for_host("other.example")
                .with_id(12)
                .with_role(SiteRole::Admin),
        );
        assert_eq!(session.site_id(), Some(12));
        assert_eq!(session.active_site().role, SiteRole::Admin);
    }

    #[test]
    fn test_generation_bumps() {
        let session = SessionContext::new();
        assert_eq!(session.auth_generation(), 0);
        session.bump_auth_generation();
        assert_eq!(session.auth_generation(), 1);
    }
}
