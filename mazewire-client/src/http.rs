//! HTTP/1.1 transport over hyper.
//!
//! Each request opens its own connection. The session cookie set by the
//! login endpoint is kept in an in-memory jar and replayed on every request.

use crate::config::{ClientConfig, HttpConfig, TlsConfig};
use crate::error::TransportError;
use crate::request::Method;
use crate::stream::ApiStream;
use crate::tls;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper::header::{COOKIE, HOST, SET_COOKIE, USER_AGENT};
use hyper::Uri;
use hyper_util::rt::TokioIo;
use cookie_store::CookieStore;
use parking_lot::Mutex;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use url::Url;

/// Cookies received from the API host.
///
/// Follows the usual cookie rules: expiry by `Max-Age` or `Expires`,
/// host-only cookies unless `Domain` is set, and `Path`/`Secure` matching.
#[derive(Debug, Default)]
pub struct CookieJar {
    store: Mutex<CookieStore>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one `Set-Cookie` header value received from `url`.
    pub fn store(&self, set_cookie: &str, url: &Url) {
        if let Err(e) = self.store.lock().parse(set_cookie, url) {
            tracing::debug!(error = %e, "ignoring Set-Cookie");
        }
    }

    /// Value for the `Cookie` header of a request to `url`, if any apply.
    pub fn header(&self, url: &Url) -> Option<String> {
        let store = self.store.lock();
        let pairs: Vec<String> = store
            .get_request_values(url)
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    /// Value of an unexpired cookie, whatever host set it.
    pub fn get(&self, name: &str) -> Option<String> {
        self.store
            .lock()
            .iter_unexpired()
            .find(|c| c.name() == name)
            .map(|c| c.value().to_string())
    }

    pub fn clear(&self) {
        self.store.lock().clear();
    }
}

/// Transport that speaks HTTP/1.1 to the API host.
pub struct HttpTransport {
    http: HttpConfig,
    tls_config: TlsConfig,
    tls: Option<TlsConnector>,
    cookies: CookieJar,
}

impl HttpTransport {
    /// Creates a transport; builds a TLS connector when the base URL is https.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let tls = if config.api.base_url.starts_with("https://") {
            Some(tls::connector_for(&config.tls)?)
        } else {
            None
        };

        Ok(Self {
            http: config.http.clone(),
            tls_config: config.tls.clone(),
            tls,
            cookies: CookieJar::new(),
        })
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    async fn connect(&self, uri: &Uri) -> Result<ApiStream, TransportError> {
        let host = uri
            .host()
            .ok_or_else(|| TransportError::InvalidUrl(format!("missing host: {}", uri)))?;
        let https = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            other => {
                return Err(TransportError::InvalidUrl(format!(
                    "unsupported scheme: {:?}",
                    other
                )))
            }
        };
        let port = uri.port_u16().unwrap_or(if https { 443 } else { 80 });
        let addr = format!("{}:{}", host, port);

        let connecting = async {
            if https {
                let connector = self.tls.as_ref().ok_or_else(|| {
                    TransportError::TlsConfig("https URL without TLS connector".to_string())
                })?;
                let name = tls::server_name(&self.tls_config, host)?;
                ApiStream::tls(&addr, connector, name).await
            } else {
                ApiStream::plain(&addr).await
            }
        };

        timeout(self.http.connect_timeout(), connecting)
            .await
            .map_err(|_| TransportError::Timeout)?
    }

    async fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let uri: Uri = request
            .url
            .parse()
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", request.url, e)))?;
        let url = Url::parse(&request.url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", request.url, e)))?;

        let stream = self.connect(&uri).await?;
        let (mut sender, conn) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "connection task ended");
            }
        });

        let host = match uri.port_u16() {
            Some(port) => format!("{}:{}", uri.host().unwrap_or_default(), port),
            None => uri.host().unwrap_or_default().to_string(),
        };
        let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

        let mut builder = hyper::Request::builder()
            .method(hyper_method(request.method))
            .uri(path)
            .header(HOST, host)
            .header(USER_AGENT, self.http.user_agent.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }
        if let Some(cookie) = self.cookies.header(&url) {
            builder = builder.header(COOKIE, cookie);
        }
        let req = builder
            .body(Full::new(request.body.unwrap_or_default()))
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        for value in resp.headers().get_all(SET_COOKIE) {
            if let Ok(v) = value.to_str() {
                self.cookies.store(v, &url);
            }
        }

        let status = resp.status().as_u16();
        let body: Bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| TransportError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(HttpResponse::new(status, body))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        timeout(self.http.request_timeout(), self.round_trip(request))
            .await
            .map_err(|_| TransportError::Timeout)?
    }
}

fn hyper_method(method: Method) -> hyper::Method {
    match method {
        Method::Get => hyper::Method::GET,
        Method::Post => hyper::Method::POST,
        Method::Put => hyper::Method::PUT,
        Method::Patch => hyper::Method::PATCH,
        Method::Delete => hyper::Method::DELETE,
    }
}
