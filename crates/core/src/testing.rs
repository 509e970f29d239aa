//! Scripted transport and authenticator doubles for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderValue, Method, StatusCode};
use url::Url;

use crate::auth::{Authenticator, Credentials, Session};
use crate::error::{Error, Result, TransportError};
use crate::model::md5_hex;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

pub(crate) const STORAGE_URL: &str = "https://api.example.com/v1/SEL_1";

#[derive(Clone)]
enum Reply {
    Status(u16, Option<String>),
    /// 201 with the MD5 of the request body as ETag
    EchoMd5,
    Connect,
}

struct Route {
    method: Method,
    target: String,
    token: Option<String>,
    reply: Reply,
}

/// Transport answering from a table of routes keyed by method and object
///
/// Unrouted requests fall back to the default reply, or a transport failure.
pub(crate) struct FakeTransport {
    routes: Mutex<Vec<Route>>,
    fallback: Mutex<Option<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub(crate) fn new() -> Arc<Self> {
        Self::build(None)
    }

    /// Every request takes `delay`, so concurrency becomes observable
    pub(crate) fn with_delay(delay: Duration) -> Arc<Self> {
        Self::build(Some(delay))
    }

    fn build(delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(Vec::new()),
            fallback: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    fn route(&self, method: Method, target: &str, token: Option<&str>, reply: Reply) {
        self.routes.lock().unwrap().push(Route {
            method,
            target: target.to_string(),
            token: token.map(str::to_string),
            reply,
        });
    }

    pub(crate) fn respond(&self, method: Method, target: &str, status: u16) {
        self.route(method, target, None, Reply::Status(status, None));
    }

    pub(crate) fn respond_with_etag(&self, method: Method, target: &str, status: u16, etag: &str) {
        self.route(
            method,
            target,
            None,
            Reply::Status(status, Some(etag.to_string())),
        );
    }

    pub(crate) fn respond_for_token(&self, method: Method, target: &str, token: &str, status: u16) {
        self.route(method, target, Some(token), Reply::Status(status, None));
    }

    pub(crate) fn fail_connect(&self, method: Method, target: &str) {
        self.route(method, target, None, Reply::Connect);
    }

    /// Reply to unrouted requests with `status`
    pub(crate) fn default_status(&self, status: u16) {
        *self.fallback.lock().unwrap() = Some(Reply::Status(status, None));
    }

    /// Reply to unrouted requests with 201 and a correct ETag
    pub(crate) fn default_echo_md5(&self) {
        *self.fallback.lock().unwrap() = Some(Reply::EchoMd5);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lookup(&self, request: &HttpRequest) -> Option<Reply> {
        let token = request
            .headers
            .get("x-auth-token")
            .and_then(|v| v.to_str().ok());
        let routes = self.routes.lock().unwrap();
        routes
            .iter()
            .find(|route| {
                route.method == request.method
                    && request.url.path().ends_with(&format!("/{}", route.target))
                    && route.token.as_deref().is_none_or(|t| Some(t) == token)
            })
            .map(|route| route.reply.clone())
            .or_else(|| self.fallback.lock().unwrap().clone())
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let reply = self.lookup(&request);
        let body_md5 = md5_hex(&request.body);
        self.requests.lock().unwrap().push(request);

        match reply {
            Some(Reply::Status(status, etag)) => {
                let mut response = HttpResponse::new(StatusCode::from_u16(status).unwrap());
                if let Some(etag) = etag {
                    response
                        .headers
                        .insert("etag", HeaderValue::from_str(&etag).unwrap());
                }
                Ok(response)
            }
            Some(Reply::EchoMd5) => {
                let mut response = HttpResponse::new(StatusCode::CREATED);
                response
                    .headers
                    .insert("etag", HeaderValue::from_str(&body_md5).unwrap());
                Ok(response)
            }
            Some(Reply::Connect) => Err(TransportError::connect("connection refused")),
            None => Err(TransportError::other("no route")),
        }
    }
}

/// Hands out the queued tokens in order, then fails
pub(crate) struct SequenceAuthenticator {
    tokens: Mutex<VecDeque<String>>,
}

#[async_trait]
impl Authenticator for SequenceAuthenticator {
    async fn authenticate(&self) -> Result<Credentials> {
        let token = self.tokens.lock().unwrap().pop_front();
        match token {
            Some(token) => Ok(credentials(&token)),
            None => Err(Error::AuthenticationFailed("no more tokens".into())),
        }
    }
}

pub(crate) fn credentials(token: &str) -> Credentials {
    Credentials::new(token, Url::parse(STORAGE_URL).unwrap())
}

/// Session already holding `token`; any refresh fails
pub(crate) async fn session_with_token(token: &str) -> Arc<Session> {
    session_with_tokens(&[token]).await
}

/// Session holding `tokens[0]`; refreshes hand out the rest in order
pub(crate) async fn session_with_tokens(tokens: &[&str]) -> Arc<Session> {
    let authenticator = SequenceAuthenticator {
        tokens: Mutex::new(tokens.iter().map(|t| t.to_string()).collect()),
    };
    let session = Arc::new(Session::new(Arc::new(authenticator)));
    session.credentials().await.unwrap();
    session
}
