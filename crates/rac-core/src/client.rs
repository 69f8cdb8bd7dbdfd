//! Remote object client contract.
//!
//! The orchestrator drives the server exclusively through this trait. The
//! ADT HTTP client and the simulated server both implement it.

use std::fmt;

use async_trait::async_trait;

use crate::activation::{ActivationResult, InactiveObject};

/// Errors raised by a remote object client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Protocol(String),

    #[error("Object {0} is locked by another session")]
    Locked(String),
}

/// Session handling mode for subsequent requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    /// Server keeps per-session state (required to hold locks)
    Stateful,
    Stateless,
}

impl SessionType {
    /// Header value used by ADT.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Stateful => "stateful",
            SessionType::Stateless => "stateless",
        }
    }
}

/// Lock access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Modify,
}

impl LockMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LockMode::Modify => "MODIFY",
        }
    }
}

/// Handle returned by a successful lock, required for writes and deletion.
#[derive(Clone, PartialEq, Eq)]
pub struct LockHandle(String);

impl LockHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LockHandle({})", self.0)
    }
}

/// Parameters for creating a repository object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObject {
    /// Object type, e.g. `CLAS/OC`
    pub kind: String,
    pub name: String,
    pub package: String,
    pub description: String,
    /// Package URI, e.g. `/sap/bc/adt/packages/$TMP`
    pub package_path: String,
    pub transport: Option<String>,
}

/// What to activate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationRequest {
    /// A single object by name and URI, optionally asking for a pre-audit
    /// report of dependent inactive objects.
    Object {
        name: String,
        uri: String,
        preaudit: bool,
    },
    /// Exactly the objects a previous pass reported as inactive.
    Inactive(Vec<InactiveObject>),
}

/// Operations the compiler needs from the remote system.
///
/// Every method may fail with a [`RemoteError`]; the caller decides whether
/// to abort or to continue best-effort. Implementations do not retry.
#[async_trait]
pub trait RemoteObjectClient: Send + Sync {
    /// Create a new repository object.
    async fn create_object(&self, object: &NewObject) -> Result<(), RemoteError>;

    /// Acquire an exclusive lock. Only valid in a stateful session.
    async fn lock(&self, object_url: &str, mode: LockMode) -> Result<LockHandle, RemoteError>;

    /// Release a lock acquired with [`RemoteObjectClient::lock`].
    async fn unlock(&self, object_url: &str, handle: &LockHandle) -> Result<(), RemoteError>;

    /// Replace the text of a source slot.
    async fn set_source(
        &self,
        source_url: &str,
        source: &str,
        handle: &LockHandle,
        transport: Option<&str>,
    ) -> Result<(), RemoteError>;

    /// Run the remote build.
    async fn activate(&self, request: &ActivationRequest)
        -> Result<ActivationResult, RemoteError>;

    /// Execute a class implementing the console-run interface and return its output.
    async fn run_class(&self, class_name: &str) -> Result<String, RemoteError>;

    /// Delete a locked object.
    async fn delete_object(
        &self,
        object_url: &str,
        handle: &LockHandle,
        transport: Option<&str>,
    ) -> Result<(), RemoteError>;

    /// Select the session mode used by subsequent requests.
    fn set_session(&self, session: SessionType);

    /// End the server-side session, releasing whatever it still holds.
    async fn drop_session(&self) -> Result<(), RemoteError>;
}
