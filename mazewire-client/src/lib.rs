//! # mazewire-client
//!
//! Client library for the mazewire admin API.
//!
//! This crate provides:
//! - [`Dispatcher`]: encode, send, classify, and retry after interactive re-authentication
//! - [`SessionContext`]: the authentication-in-progress flag and the active site
//! - Collaborator traits for notifications, the loading indicator, and the login prompt
//! - An HTTP/1.1 [`Transport`] over hyper with a cookie jar and optional TLS

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod request;
pub mod session;
pub mod site;
pub mod stream;
pub mod tls;
pub mod transport;
pub mod ui;

pub use config::{ApiConfig, ClientConfig, ConfigError, HttpConfig, TlsConfig};
pub use dispatcher::Dispatcher;
pub use error::{ClientError, TransportError};
pub use http::HttpTransport;
pub use request::{Credentials, Method, RequestDescriptor};
pub use session::SessionContext;
pub use site::{ActiveSite, SiteRole};
pub use transport::{HttpRequest, HttpResponse, Transport};
pub use ui::{AuthPrompt, LoadingIndicator, NotifyKind, Notifier, PromptConfig};
pub use mazewire_wire::Value;
