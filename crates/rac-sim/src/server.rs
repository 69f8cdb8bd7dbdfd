//! In-memory simulation of the remote repository.
//!
//! [`SimServer`] holds the shared repository state; each [`SimConnection`]
//! is one client with its own session. The server enforces the rules the
//! compiler has to live with:
//! - locks are exclusive, owned by a connection, and only granted in a
//!   stateful session;
//! - writes and deletion need the lock handle;
//! - dropping a session releases every lock it still holds.
//!
//! Every call is journaled, so tests can check ordering, lock pairing, and
//! that nothing is left behind.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rac_core::{
    ActivationRequest, ActivationResult, InactiveObject, LockHandle, LockMode, NewObject,
    RemoteError, RemoteObjectClient, SessionType,
};

use crate::activator::ContractActivator;
use crate::fault::{FaultConfig, FaultInjector, RemoteStep};
use crate::random::DeterministicRng;

/// A repository object held by the simulated server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimObject {
    pub name: String,
    pub kind: String,
    pub package: String,
    pub transport: Option<String>,
    /// Main source slot
    pub main: String,
    /// Implementations include slot
    pub includes: String,
    pub active: bool,
    lock: Option<(u64, LockHandle)>,
    deferred: bool,
}

impl SimObject {
    /// Connection currently holding the lock.
    #[must_use]
    pub fn locked_by(&self) -> Option<u64> {
        self.lock.as_ref().map(|(connection, _)| *connection)
    }
}

/// One journaled remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub connection: u64,
    pub step: RemoteStep,
    /// Object URL, source slot URL, or class name
    pub target: String,
    pub transport: Option<String>,
    pub ok: bool,
}

struct ServerState {
    /// Keyed by lowercase object URL
    objects: BTreeMap<String, SimObject>,
    journal: Vec<RemoteCall>,
    fault: FaultInjector,
    scripted: VecDeque<ActivationResult>,
    defer_activation: bool,
    activator: ContractActivator,
    locks_issued: u64,
}

/// Shared simulated server. Cheap to clone.
#[derive(Clone)]
pub struct SimServer {
    state: Arc<Mutex<ServerState>>,
    connections: Arc<AtomicU64>,
}

impl Default for SimServer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimServer {
    /// Server without random faults.
    #[must_use]
    pub fn new() -> Self {
        Self::with_faults(FaultInjector::new(
            DeterministicRng::new(1),
            FaultConfig::none(),
        ))
    }

    /// Server using the given fault injector.
    #[must_use]
    pub fn with_faults(fault: FaultInjector) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState {
                objects: BTreeMap::new(),
                journal: Vec::new(),
                fault,
                scripted: VecDeque::new(),
                defer_activation: false,
                activator: ContractActivator,
                locks_issued: 0,
            })),
            connections: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Open a new client connection with its own session.
    #[must_use]
    pub fn connect(&self) -> SimConnection {
        let id = self.connections.fetch_add(1, Ordering::SeqCst) + 1;
        SimConnection {
            id,
            server: self.clone(),
            stateful: AtomicBool::new(false),
        }
    }

    /// Fail the `nth` (1-based) call of `step`, counted across connections.
    pub fn fail_nth(&self, step: RemoteStep, nth: u64) {
        self.state().fault.schedule(step, nth);
    }

    /// Answer the next object activation with `result` instead of running
    /// the contract check. Results are consumed in order.
    pub fn script_activation(&self, result: ActivationResult) {
        self.state().scripted.push_back(result);
    }

    /// Make the first activation of every object report it as inactive,
    /// so that a second pass is required.
    pub fn set_defer_activation(&self, defer: bool) {
        self.state().defer_activation = defer;
    }

    /// Objects whose name starts with `prefix` (reconciliation sweep).
    #[must_use]
    pub fn leftover_units(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_uppercase();
        self.state()
            .objects
            .values()
            .filter(|o| o.name.starts_with(&prefix))
            .map(|o| o.name.clone())
            .collect()
    }

    /// Snapshot of an object by name.
    #[must_use]
    pub fn object(&self, name: &str) -> Option<SimObject> {
        let name = name.to_uppercase();
        self.state().objects.values().find(|o| o.name == name).cloned()
    }

    /// All calls so far, in order.
    #[must_use]
    pub fn journal(&self) -> Vec<RemoteCall> {
        self.state().journal.clone()
    }

    /// Steps of all calls so far, in order.
    #[must_use]
    pub fn steps(&self) -> Vec<RemoteStep> {
        self.state().journal.iter().map(|c| c.step).collect()
    }

    /// Number of faults injected so far.
    #[must_use]
    pub fn faults_count(&self) -> u64 {
        self.state().fault.faults_count()
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One client connection to a [`SimServer`].
pub struct SimConnection {
    id: u64,
    server: SimServer,
    stateful: AtomicBool,
}

impl SimConnection {
    /// Connection id, as recorded in the journal.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the connection is in a stateful session.
    #[must_use]
    pub fn is_stateful(&self) -> bool {
        self.stateful.load(Ordering::SeqCst)
    }

    /// Journal the call, consult the fault injector, then run `op`.
    fn call<T>(
        &self,
        step: RemoteStep,
        target: &str,
        transport: Option<&str>,
        op: impl FnOnce(&mut ServerState) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let mut state = self.server.state();
        let result = match state.fault.check(step, target) {
            Some(fault) => Err(fault),
            None => op(&mut state),
        };
        state.journal.push(RemoteCall {
            connection: self.id,
            step,
            target: target.to_string(),
            transport: transport.map(str::to_string),
            ok: result.is_ok(),
        });
        result
    }
}

fn not_found(target: &str) -> RemoteError {
    RemoteError::Status {
        status: 404,
        message: format!("Resource {} does not exist", target),
    }
}

/// Split `<object url>/source/main` or `<object url>/includes/<name>`.
fn split_slot(source_url: &str) -> Option<(String, &str)> {
    for marker in ["/source/", "/includes/"] {
        if let Some(index) = source_url.find(marker) {
            return Some((source_url[..index].to_lowercase(), &source_url[index + 1..]));
        }
    }
    None
}

fn check_lock(object: &SimObject, connection: u64, handle: &LockHandle) -> Result<(), RemoteError> {
    match &object.lock {
        Some((owner, held)) if *owner == connection && held == handle => Ok(()),
        Some((owner, _)) if *owner != connection => Err(RemoteError::Locked(object.name.clone())),
        _ => Err(RemoteError::Status {
            status: 423,
            message: format!("Invalid lock handle for {}", object.name),
        }),
    }
}

#[async_trait]
impl RemoteObjectClient for SimConnection {
    async fn create_object(&self, object: &NewObject) -> Result<(), RemoteError> {
        let url = format!("/sap/bc/adt/oo/classes/{}", object.name.to_lowercase());
        self.call(RemoteStep::Create, &url, object.transport.as_deref(), |state| {
            if state.objects.contains_key(&url) {
                return Err(RemoteError::Status {
                    status: 400,
                    message: format!("{} already exists", object.name),
                });
            }
            state.objects.insert(
                url.clone(),
                SimObject {
                    name: object.name.to_uppercase(),
                    kind: object.kind.clone(),
                    package: object.package.clone(),
                    transport: object.transport.clone(),
                    main: String::new(),
                    includes: String::new(),
                    active: false,
                    lock: None,
                    deferred: false,
                },
            );
            Ok(())
        })
    }

    async fn lock(&self, object_url: &str, _mode: LockMode) -> Result<LockHandle, RemoteError> {
        let stateful = self.is_stateful();
        let key = object_url.to_lowercase();
        self.call(RemoteStep::Lock, object_url, None, |state| {
            if !stateful {
                return Err(RemoteError::Protocol(
                    "Locking requires a stateful session".to_string(),
                ));
            }
            state.locks_issued += 1;
            let issued = state.locks_issued;
            let object = state.objects.get_mut(&key).ok_or_else(|| not_found(object_url))?;
            if let Some((owner, handle)) = &object.lock {
                return if *owner == self.id {
                    Ok(handle.clone())
                } else {
                    Err(RemoteError::Locked(object.name.clone()))
                };
            }
            let handle = LockHandle::new(format!("LOCK{:08}", issued));
            object.lock = Some((self.id, handle.clone()));
            Ok(handle)
        })
    }

    async fn unlock(&self, object_url: &str, handle: &LockHandle) -> Result<(), RemoteError> {
        let key = object_url.to_lowercase();
        self.call(RemoteStep::Unlock, object_url, None, |state| {
            // A deleted object takes its lock with it.
            let Some(object) = state.objects.get_mut(&key) else {
                return Ok(());
            };
            let owned = match &object.lock {
                None => return Ok(()),
                Some((owner, held)) => *owner == self.id && held == handle,
            };
            if !owned {
                return Err(RemoteError::Locked(object.name.clone()));
            }
            object.lock = None;
            Ok(())
        })
    }

    async fn set_source(
        &self,
        source_url: &str,
        source: &str,
        handle: &LockHandle,
        transport: Option<&str>,
    ) -> Result<(), RemoteError> {
        self.call(RemoteStep::SetSource, source_url, transport, |state| {
            let (key, slot) = split_slot(source_url)
                .ok_or_else(|| RemoteError::Protocol(format!("Not a source URL: {}", source_url)))?;
            let object = state.objects.get_mut(&key).ok_or_else(|| not_found(source_url))?;
            check_lock(object, self.id, handle)?;
            match slot {
                "source/main" => object.main = source.to_string(),
                "includes/implementations" => object.includes = source.to_string(),
                other => {
                    return Err(RemoteError::Status {
                        status: 404,
                        message: format!("Unknown source slot {}", other),
                    })
                }
            }
            object.active = false;
            Ok(())
        })
    }

    async fn activate(
        &self,
        request: &ActivationRequest,
    ) -> Result<ActivationResult, RemoteError> {
        match request {
            ActivationRequest::Object { name, uri, .. } => {
                let key = uri.to_lowercase();
                self.call(RemoteStep::Activate, name, None, |state| {
                    let defer = state.defer_activation;
                    let activator = state.activator.clone();
                    let object = state.objects.get_mut(&key).ok_or_else(|| not_found(uri))?;

                    if defer && !object.deferred {
                        object.deferred = true;
                        return Ok(ActivationResult::from_parts(
                            Vec::new(),
                            vec![InactiveObject {
                                uri: key.clone(),
                                object_type: object.kind.clone(),
                                name: object.name.clone(),
                                parent_uri: String::new(),
                            }],
                        ));
                    }

                    let result = match state.scripted.pop_front() {
                        Some(scripted) => scripted,
                        None => activator.activate(&object.name, &key, &object.includes),
                    };
                    object.active = result.success;
                    Ok(result)
                })
            }
            ActivationRequest::Inactive(objects) => {
                let target = objects
                    .iter()
                    .map(|o| o.uri.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                self.call(RemoteStep::ActivateInactive, &target, None, |state| {
                    let mut scripted = state.scripted.pop_front();
                    let activator = state.activator.clone();
                    let mut outcome: Option<ActivationResult> = None;
                    for inactive in objects {
                        let key = inactive.uri.to_lowercase();
                        let object = state
                            .objects
                            .get_mut(&key)
                            .ok_or_else(|| not_found(&inactive.uri))?;
                        let result = scripted.take().unwrap_or_else(|| {
                            activator.activate(&object.name, &key, &object.includes)
                        });
                        object.active = result.success;
                        outcome = Some(match outcome {
                            None => result,
                            Some(mut merged) => {
                                merged.success &= result.success;
                                merged.messages.extend(result.messages);
                                merged
                            }
                        });
                    }
                    outcome.ok_or_else(|| {
                        RemoteError::Protocol("Nothing to activate".to_string())
                    })
                })
            }
        }
    }

    async fn run_class(&self, class_name: &str) -> Result<String, RemoteError> {
        let key = format!("/sap/bc/adt/oo/classes/{}", class_name.to_lowercase());
        self.call(RemoteStep::Run, class_name, None, |state| {
            let activator = state.activator.clone();
            let object = state.objects.get(&key).ok_or_else(|| not_found(class_name))?;
            if !object.active {
                return Err(RemoteError::Status {
                    status: 500,
                    message: format!("Class {} is not active", object.name),
                });
            }
            Ok(activator.run(&object.includes))
        })
    }

    async fn delete_object(
        &self,
        object_url: &str,
        handle: &LockHandle,
        transport: Option<&str>,
    ) -> Result<(), RemoteError> {
        let key = object_url.to_lowercase();
        self.call(RemoteStep::Delete, object_url, transport, |state| {
            let object = state.objects.get(&key).ok_or_else(|| not_found(object_url))?;
            check_lock(object, self.id, handle)?;
            state.objects.remove(&key);
            Ok(())
        })
    }

    fn set_session(&self, session: SessionType) {
        self.stateful
            .store(session == SessionType::Stateful, Ordering::SeqCst);
    }

    async fn drop_session(&self) -> Result<(), RemoteError> {
        let result = self.call(RemoteStep::DropSession, "", None, |state| {
            for object in state.objects.values_mut() {
                if object.locked_by() == Some(self.id) {
                    object.lock = None;
                }
            }
            Ok(())
        });
        self.stateful.store(false, Ordering::SeqCst);
        result
    }
}
