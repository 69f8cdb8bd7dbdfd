//! HTTP client for the ADT REST endpoints.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rac_core::{
    ActivationRequest, ActivationResult, ConfigError, ConnectionConfig, LockHandle, LockMode,
    NewObject, RemoteError, RemoteObjectClient, SessionType,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use tracing::debug;

use crate::xml;

const CSRF_HEADER: &str = "x-csrf-token";
const SESSION_HEADER: &str = "X-sap-adt-sessiontype";

const DISCOVERY_PATH: &str = "/sap/bc/adt/discovery";
const CLASSES_PATH: &str = "/sap/bc/adt/oo/classes";
const ACTIVATION_PATH: &str = "/sap/bc/adt/activation";
const CLASSRUN_PATH: &str = "/sap/bc/adt/oo/classrun";
const LOGOFF_PATH: &str = "/sap/public/bc/icf/logoff";

const LOCK_ACCEPT: &str =
    "application/*,application/vnd.sap.as+xml;charset=UTF-8;dataname=com.sap.adt.lock.result";

/// Errors while setting up an [`AdtClient`].
#[derive(Debug, thiserror::Error)]
pub enum AdtError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// One request, kept around so it can be replayed after a token refresh.
struct AdtRequest<'a> {
    method: Method,
    path: &'a str,
    query: Vec<(&'static str, String)>,
    body: Option<(&'static str, String)>,
    accept: Option<&'static str>,
}

impl<'a> AdtRequest<'a> {
    fn new(method: Method, path: &'a str) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
            accept: None,
        }
    }

    fn query(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.query.push((name, value.into()));
        self
    }

    fn transport(self, transport: Option<&str>) -> Self {
        match transport {
            Some(corr_nr) => self.query("corrNr", corr_nr),
            None => self,
        }
    }

    fn body(mut self, content_type: &'static str, body: String) -> Self {
        self.body = Some((content_type, body));
        self
    }

    fn accept(mut self, accept: &'static str) -> Self {
        self.accept = Some(accept);
        self
    }
}

/// ADT client for one user session.
///
/// Holds its own cookie jar and CSRF token, so concurrent compile calls
/// should each use their own client.
pub struct AdtClient {
    client: Client,
    base_url: String,
    user: String,
    password: String,
    sap_client: String,
    language: String,
    csrf_token: Mutex<Option<String>>,
    stateful: AtomicBool,
}

impl AdtClient {
    /// Creates a client from connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are incomplete or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &ConnectionConfig) -> Result<Self, AdtError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .cookie_store(true)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            user: config.user.clone(),
            password: config.password.clone(),
            sap_client: config.client.clone(),
            language: config.language.clone(),
            csrf_token: Mutex::new(None),
            stateful: AtomicBool::new(false),
        })
    }

    /// Whether requests are currently sent in a stateful session.
    #[must_use]
    pub fn is_stateful(&self) -> bool {
        self.stateful.load(Ordering::SeqCst)
    }

    fn session(&self) -> SessionType {
        if self.is_stateful() {
            SessionType::Stateful
        } else {
            SessionType::Stateless
        }
    }

    fn cached_token(&self) -> Option<String> {
        self.csrf_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_token(&self, token: Option<String>) {
        *self.csrf_token.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn builder(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .basic_auth(&self.user, Some(&self.password))
            .query(&[
                ("sap-client", self.sap_client.as_str()),
                ("sap-language", self.language.as_str()),
            ])
            .header(SESSION_HEADER, self.session().as_str())
    }

    /// Fetch a CSRF token, or reuse the one already held.
    async fn csrf(&self) -> Result<String, RemoteError> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let response = self
            .builder(Method::GET, DISCOVERY_PATH)
            .header(CSRF_HEADER, "fetch")
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;

        let token = response
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| RemoteError::Protocol("Server sent no CSRF token".to_string()))?;
        debug!("Fetched CSRF token");
        self.store_token(Some(token.clone()));
        Ok(token)
    }

    async fn send_once(&self, request: &AdtRequest<'_>) -> Result<reqwest::Response, RemoteError> {
        let token = self.csrf().await?;
        let mut builder = self
            .builder(request.method.clone(), request.path)
            .query(&request.query)
            .header(CSRF_HEADER, token);
        if let Some(accept) = request.accept {
            builder = builder.header(ACCEPT, accept);
        }
        if let Some((content_type, body)) = &request.body {
            builder = builder.header(CONTENT_TYPE, *content_type).body(body.clone());
        }
        builder.send().await.map_err(transport)
    }

    /// Send a modifying request; a rejected CSRF token is refreshed once.
    async fn send(&self, request: AdtRequest<'_>) -> Result<String, RemoteError> {
        let mut response = self.send_once(&request).await?;
        if response.status() == StatusCode::FORBIDDEN && token_required(&response) {
            debug!(path = request.path, "CSRF token rejected, fetching a new one");
            self.store_token(None);
            response = self.send_once(&request).await?;
        }
        debug!(
            method = %request.method,
            path = request.path,
            status = response.status().as_u16(),
            "ADT request"
        );

        let response = check_status(response).await?;
        response.text().await.map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}

fn token_required(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("required"))
}

/// Turn a non-2xx response into [`RemoteError::Status`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = xml::parse_exception_message(&body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("").to_string()
        } else {
            body.trim().to_string()
        }
    });
    Err(RemoteError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RemoteObjectClient for AdtClient {
    async fn create_object(&self, object: &NewObject) -> Result<(), RemoteError> {
        let request = AdtRequest::new(Method::POST, CLASSES_PATH)
            .transport(object.transport.as_deref())
            .body("application/*", xml::create_class_body(object, &self.user));
        self.send(request).await.map(drop)
    }

    async fn lock(&self, object_url: &str, mode: LockMode) -> Result<LockHandle, RemoteError> {
        let request = AdtRequest::new(Method::POST, object_url)
            .query("_action", "LOCK")
            .query("accessMode", mode.as_str())
            .accept(LOCK_ACCEPT);
        let body = self.send(request).await?;
        xml::parse_lock_handle(&body).map(LockHandle::new)
    }

    async fn unlock(&self, object_url: &str, handle: &LockHandle) -> Result<(), RemoteError> {
        let request = AdtRequest::new(Method::POST, object_url)
            .query("_action", "UNLOCK")
            .query("lockHandle", handle.as_str());
        self.send(request).await.map(drop)
    }

    async fn set_source(
        &self,
        source_url: &str,
        source: &str,
        handle: &LockHandle,
        transport: Option<&str>,
    ) -> Result<(), RemoteError> {
        let request = AdtRequest::new(Method::PUT, source_url)
            .query("lockHandle", handle.as_str())
            .transport(transport)
            .body("text/plain; charset=utf-8", source.to_string());
        self.send(request).await.map(drop)
    }

    async fn activate(
        &self,
        request: &ActivationRequest,
    ) -> Result<ActivationResult, RemoteError> {
        let (preaudit, body) = match request {
            ActivationRequest::Object {
                name,
                uri,
                preaudit,
            } => (*preaudit, xml::activate_object_body(name, uri)),
            ActivationRequest::Inactive(objects) => (false, xml::activate_inactive_body(objects)),
        };
        let request = AdtRequest::new(Method::POST, ACTIVATION_PATH)
            .query("method", "activate")
            .query("preauditRequested", preaudit.to_string())
            .accept("application/xml")
            .body("application/xml", body);
        let response = self.send(request).await?;
        xml::parse_activation_result(&response)
    }

    async fn run_class(&self, class_name: &str) -> Result<String, RemoteError> {
        let path = format!("{}/{}", CLASSRUN_PATH, class_name.to_uppercase());
        let request = AdtRequest::new(Method::POST, &path).accept("text/plain");
        self.send(request).await
    }

    async fn delete_object(
        &self,
        object_url: &str,
        handle: &LockHandle,
        transport: Option<&str>,
    ) -> Result<(), RemoteError> {
        let request = AdtRequest::new(Method::DELETE, object_url)
            .query("lockHandle", handle.as_str())
            .transport(transport);
        self.send(request).await.map(drop)
    }

    fn set_session(&self, session: SessionType) {
        self.stateful
            .store(session == SessionType::Stateful, Ordering::SeqCst);
    }

    /// Log off; the server drops the session and every lock it held.
    async fn drop_session(&self) -> Result<(), RemoteError> {
        self.set_session(SessionType::Stateless);
        let result = self
            .builder(Method::POST, LOGOFF_PATH)
            .send()
            .await
            .map_err(transport);
        self.store_token(None);
        check_status(result?).await.map(drop)
    }
}
