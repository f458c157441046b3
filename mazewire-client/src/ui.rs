//! Collaborators provided by the front-end: notifications, the loading
//! indicator, and the login prompt.

use crate::request::Credentials;
use crate::session::SessionContext;
use async_trait::async_trait;
use std::fmt;

/// Severity of a transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Info,
    Error,
}

impl fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyKind::Info => write!(f, "info"),
            NotifyKind::Error => write!(f, "error"),
        }
    }
}

/// Fire-and-forget transient notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, kind: NotifyKind);
}

/// Global loading indicator. Calls are idempotent.
pub trait LoadingIndicator: Send + Sync {
    fn set_loading(&self, visible: bool);
}

/// Modal login prompt shown when the server answers 403.
#[async_trait]
pub trait AuthPrompt: Send + Sync {
    /// Shows the prompt and resolves with the entered credentials, or `None`
    /// if the operator dismissed it. `last_error` carries the failure of the
    /// previous login attempt while the prompt stays open.
    async fn credentials(
        &self,
        prompt: &PromptConfig,
        last_error: Option<&str>,
    ) -> Option<Credentials>;
}

/// What the login prompt looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    pub title: String,
    pub accept_text: String,
    pub component: String,
    /// Keep the prompt open when a login attempt fails.
    pub no_hide: bool,
}

impl PromptConfig {
    /// The "Log in to continue" dialog.
    pub fn login() -> Self {
        Self {
            title: "Log in to continue".to_string(),
            accept_text: "LOGIN".to_string(),
            component: "login-dialog".to_string(),
            no_hide: true,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self::login()
    }
}

/// Routes notifications into the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, kind: NotifyKind) {
        match kind {
            NotifyKind::Info => tracing::info!("{}", message),
            NotifyKind::Error => tracing::error!("{}", message),
        }
    }
}

/// Loading indicator that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLoader;

impl LoadingIndicator for NoLoader {
    fn set_loading(&self, _visible: bool) {}
}

/// Prompt that always declines, for non-interactive use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

#[async_trait]
impl AuthPrompt for NoPrompt {
    async fn credentials(&self, _: &PromptConfig, _: Option<&str>) -> Option<Credentials> {
        tracing::warn!("login required but no prompt is available");
        None
    }
}

/// Keeps the loading indicator visible for its lifetime.
///
/// The indicator is shown when the first concurrent request starts and hidden
/// when the last one ends, on every exit path including cancellation.
pub(crate) struct LoadingGuard<'a> {
    session: &'a SessionContext,
    indicator: &'a dyn LoadingIndicator,
}

impl<'a> LoadingGuard<'a> {
    pub(crate) fn show(session: &'a SessionContext, indicator: &'a dyn LoadingIndicator) -> Self {
        if session.begin_request() {
            indicator.set_loading(true);
        }
        Self { session, indicator }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.session.end_request() {
            self.indicator.set_loading(false);
        }
    }
}

/// Marks a login prompt as open for its lifetime.
pub(crate) struct PromptGuard<'a> {
    session: &'a SessionContext,
}

impl<'a> PromptGuard<'a> {
    pub(crate) fn open(session: &'a SessionContext) -> Self {
        session.prompt_opened();
        Self { session }
    }
}

impl Drop for PromptGuard<'_> {
    fn drop(&mut self) {
        self.session.prompt_closed();
    }
}

/// Clears the authentication-in-progress flag if the owning dispatch is
/// dropped while it holds the flag.
pub(crate) struct AuthFlagGuard<'a> {
    session: &'a SessionContext,
    armed: bool,
}

impl<'a> AuthFlagGuard<'a> {
    pub(crate) fn new(session: &'a SessionContext) -> Self {
        Self {
            session,
            armed: false,
        }
    }

    /// Sets the flag; it is cleared on drop unless [`Self::finish`] runs first.
    pub(crate) fn arm(&mut self) {
        self.session.set_authenticating(true);
        self.armed = true;
    }

    /// The dispatch reached a terminal branch, which cleared the flag itself.
    pub(crate) fn finish(mut self) {
        self.armed = false;
    }
}

impl Drop for AuthFlagGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("request dropped during login, clearing flag");
            self.session.set_authenticating(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<bool>>);

    impl LoadingIndicator for Recorder {
        fn set_loading(&self, visible: bool) {
            self.0.lock().push(visible);
        }
    }

    #[test]
    fn test_loading_guard_nesting() {
        let session = SessionContext::new();
        let rec = Recorder::default();
        {
            let _a = LoadingGuard::show(&session, &rec);
            {
                let _b = LoadingGuard::show(&session, &rec);
            }
            assert_eq!(*rec.0.lock(), vec![true]);
        }
        assert_eq!(*rec.0.lock(), vec![true, false]);
        assert_eq!(session.in_flight(), 0);
    }

    #[test]
    fn test_prompt_guard_sets_flag() {
        let session = SessionContext::new();
        {
            let _g = PromptGuard::open(&session);
            assert!(session.is_authenticating());
        }
        assert!(!session.is_authenticating());
    }

    #[test]
    fn test_auth_flag_guard_clears_when_dropped_armed() {
        let session = SessionContext::new();
        {
            let mut flag = AuthFlagGuard::new(&session);
            flag.arm();
            assert!(session.is_authenticating());
        }
        assert!(!session.is_authenticating());
    }

    #[test]
    fn test_auth_flag_guard_finish_leaves_flag_alone() {
        let session = SessionContext::new();
        let mut flag = AuthFlagGuard::new(&session);
        flag.arm();
        flag.finish();
        // Another request may own the flag by now.
        assert!(session.is_authenticating());

        let idle = AuthFlagGuard::new(&session);
        drop(idle);
        assert!(session.is_authenticating());
    }

    #[test]
    fn test_login_prompt_config() {
        let p = PromptConfig::default();
        assert_eq!(p.title, "Log in to continue");
        assert_eq!(p.accept_text, "LOGIN");
        assert!(p.no_hide);
    }

    #[test]
    fn test_no_prompt_declines() {
        let prompt = PromptConfig::login();
        assert!(tokio_test::block_on(NoPrompt.credentials(&prompt, None)).is_none());
    }
}
