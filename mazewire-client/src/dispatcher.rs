//! Request dispatcher.
//!
//! Serializes a [`RequestDescriptor`], sends it, classifies the response and,
//! when the server answers 403, runs the interactive login flow before
//! retrying the same request.

use crate::config::ApiConfig;
use crate::error::{ClientError, TransportError};
use crate::request::{Credentials, RequestDescriptor};
use crate::session::SessionContext;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::ui::{
    AuthFlagGuard, AuthPrompt, LoadingGuard, LoadingIndicator, LogNotifier, NoLoader, NoPrompt, Notifier,
    NotifyKind, PromptConfig, PromptGuard,
};
use mazewire_wire::{MsgpackCodec, QueryEncoding, Value, CONTENT_TYPE_MSGPACK};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Shown in the prompt when the login endpoint itself answers 403.
const LOGIN_DENIED: &str = "Access denied.";

/// Outcome of a single send.
enum Attempt {
    /// A terminal branch was reached.
    Done(Result<Value, ClientError>),
    /// The server answered 403.
    Unauthenticated,
}

/// Sends API requests and drives re-authentication.
///
/// Cheap to share: wrap in an [`Arc`] and call [`Dispatcher::dispatch`] from
/// as many tasks as needed. All of them share one [`SessionContext`].
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    loader: Arc<dyn LoadingIndicator>,
    prompt: Arc<dyn AuthPrompt>,
    session: Arc<SessionContext>,
    codec: MsgpackCodec,
    base_url: String,
    auth_endpoint: String,
    query_encoding: QueryEncoding,
}

impl Dispatcher {
    /// Creates a dispatcher that logs notifications, shows no loading
    /// indicator and cannot prompt for a login.
    pub fn new(api: &ApiConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            notifier: Arc::new(LogNotifier),
            loader: Arc::new(NoLoader),
            prompt: Arc::new(NoPrompt),
            session: Arc::new(SessionContext::new()),
            codec: MsgpackCodec::new(),
            base_url: api.normalized_base_url(),
            auth_endpoint: api.auth_endpoint.clone(),
            query_encoding: api.query_encoding,
        }
    }

    /// Sets where errors and warnings are shown.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Sets the loading indicator.
    pub fn with_loader(mut self, loader: Arc<dyn LoadingIndicator>) -> Self {
        self.loader = loader;
        self
    }

    /// Sets the login prompt opened on 403.
    pub fn with_prompt(mut self, prompt: Arc<dyn AuthPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Shares an existing session, e.g. between dispatchers with different
    /// front-ends.
    pub fn with_session(mut self, session: Arc<SessionContext>) -> Self {
        self.session = session;
        self
    }

    /// The session shared by every request of this dispatcher.
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// The codec payloads and responses go through.
    pub fn codec(&self) -> &MsgpackCodec {
        &self.codec
    }

    /// Sends `request` and returns the envelope body.
    ///
    /// A 403 opens the login prompt; after a successful login the identical
    /// request is sent again. Every error except [`ClientError::Encode`] and
    /// [`ClientError::AuthAbandoned`] has already been reported through the
    /// notifier when this returns (application errors only while no
    /// re-authentication is under way).
    pub async fn dispatch(&self, request: &RequestDescriptor) -> Result<Value, ClientError> {
        let _loading = LoadingGuard::show(&self.session, self.loader.as_ref());
        let mut flag = AuthFlagGuard::new(&self.session);
        if request.endpoint() == self.auth_endpoint {
            flag.arm();
        }

        loop {
            let generation = self.session.auth_generation();
            match self.attempt(request).await {
                Attempt::Done(result) => {
                    flag.finish();
                    return result;
                }
                Attempt::Unauthenticated => {
                    debug!(endpoint = request.endpoint(), "server requires login");
                    flag.arm();
                    if !self.reauthenticate(generation).await {
                        self.session.set_authenticating(false);
                        flag.finish();
                        return Err(ClientError::AuthAbandoned);
                    }
                    flag.arm();
                    debug!(endpoint = request.endpoint(), "retrying after login");
                }
            }
        }
    }

    /// Callback form of [`Dispatcher::dispatch`]: `on_success` receives the
    /// body; failures are reported through the notifier only.
    pub async fn req<S>(&self, request: &RequestDescriptor, on_success: S)
    where
        S: FnOnce(Value),
    {
        self.req_with_error(request, on_success, |_, _| {}).await
    }

    /// Like [`Dispatcher::req`], additionally handing application errors
    /// (status and server text) to `on_failure`. Transport and decoding
    /// failures never reach `on_failure`.
    pub async fn req_with_error<S, F>(&self, request: &RequestDescriptor, on_success: S, on_failure: F)
    where
        S: FnOnce(Value),
        F: FnOnce(u16, &str),
    {
        match self.dispatch(request).await {
            Ok(body) => on_success(body),
            Err(ClientError::Application { status, message }) => on_failure(status, &message),
            Err(e) => debug!(error = %e, "request ended without callback"),
        }
    }

    /// Logs in directly, outside of a 403 flow.
    pub async fn login(&self, credentials: &Credentials) -> Result<Value, ClientError> {
        let request = RequestDescriptor::post(self.auth_endpoint.clone(), credentials.to_payload());
        let result = self.dispatch(&request).await;
        if result.is_ok() {
            self.session.bump_auth_generation();
        }
        result
    }

    async fn attempt(&self, request: &RequestDescriptor) -> Attempt {
        let http = match self.build(request) {
            Ok(http) => http,
            Err(e) => {
                self.session.set_authenticating(false);
                return Attempt::Done(Err(e));
            }
        };

        if request.endpoint() == self.auth_endpoint {
            self.session.set_authenticating(true);
        }

        let request_id = Uuid::new_v4();
        debug!(%request_id, method = %request.method(), url = %http.url, "sending request");

        match self.transport.send(http).await {
            Ok(response) => {
                debug!(%request_id, status = response.status, len = response.body.len(), "response");
                self.classify(response)
            }
            Err(e) => {
                let err = match e {
                    TransportError::BodyRead(detail) => ClientError::Body(detail),
                    e => ClientError::Transport(e),
                };
                self.notifier.notify(&err.to_string(), NotifyKind::Error);
                self.session.set_authenticating(false);
                Attempt::Done(Err(err))
            }
        }
    }

    fn build(&self, request: &RequestDescriptor) -> Result<HttpRequest, ClientError> {
        let mut url = format!("{}{}", self.base_url, request.endpoint());
        let mut body = None;

        if let Some(payload) = request.payload() {
            let mut payload = payload.clone();
            if let Some(site) = self.session.site_id() {
                payload.insert("site", site);
            }
            if request.endpoint() != self.auth_endpoint {
                debug!(endpoint = request.endpoint(), ?payload, "outgoing payload");
            }

            let bytes = self.codec.encode(&payload).map_err(ClientError::Encode)?;
            if request.method().is_read_style() {
                if !request.endpoint().contains('?') {
                    url.push_str("?data=");
                    url.push_str(&self.query_encoding.encode(&bytes));
                }
            } else {
                body = Some(bytes);
            }
        }

        let mut http = HttpRequest::new(request.method(), url).with_header("Cache-Control", "no-store");
        if let Some(bytes) = body {
            http = http
                .with_header("Content-Type", CONTENT_TYPE_MSGPACK)
                .with_body(bytes);
        }
        Ok(http)
    }

    fn classify(&self, response: HttpResponse) -> Attempt {
        let result = match response.status {
            200 => match self.codec.decode_envelope(&response.body) {
                Ok(envelope) => {
                    for warning in &envelope.warn {
                        self.notifier.notify(warning, NotifyKind::Info);
                    }
                    Ok(envelope.body)
                }
                Err(e) => {
                    let err = ClientError::Decode(e);
                    self.notifier.notify(&err.to_string(), NotifyKind::Error);
                    Err(err)
                }
            },
            403 => return Attempt::Unauthenticated,
            status => {
                let message = String::from_utf8_lossy(&response.body).into_owned();
                if self.session.is_authenticating() {
                    warn!(status, %message, "error notification suppressed during login");
                } else {
                    self.notifier.notify(&message, NotifyKind::Error);
                }
                Err(ClientError::Application { status, message })
            }
        };

        self.session.set_authenticating(false);
        Attempt::Done(result)
    }

    /// Runs the login prompt unless another request already logged in since
    /// `seen` was read. Returns false if the operator gave up.
    async fn reauthenticate(&self, seen: u64) -> bool {
        let _gate = self.session.reauth_gate().lock().await;
        if self.session.auth_generation() != seen {
            debug!("already logged in by a concurrent request");
            return true;
        }

        let _open = PromptGuard::open(&self.session);
        let prompt = PromptConfig::login();
        let mut last_error: Option<String> = None;

        loop {
            let Some(credentials) = self.prompt.credentials(&prompt, last_error.as_deref()).await
            else {
                debug!("login prompt dismissed");
                return false;
            };

            let login =
                RequestDescriptor::post(self.auth_endpoint.clone(), credentials.to_payload());
            match self.attempt(&login).await {
                Attempt::Done(Ok(_)) => {
                    self.session.bump_auth_generation();
                    debug!(user = %credentials.user, "logged in");
                    return true;
                }
                Attempt::Done(Err(e)) => last_error = Some(e.to_string()),
                Attempt::Unauthenticated => last_error = Some(LOGIN_DENIED.to_string()),
            }

            if !prompt.no_hide {
                return false;
            }
        }
    }
}
