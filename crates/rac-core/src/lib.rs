//! # rac-core
//!
//! Core types shared by the remote ABAP compiler crates.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`result`] | What a compile call hands back to the caller |
//! | [`activation`] | What the remote build step reports |
//! | [`client`] | The contract a remote object client must satisfy |
//! | [`config`] | Endpoint and credential settings |
//! | [`property`], [`invariants`] | Checks that a compile outcome is well-formed |
//!
//! Nothing in this crate talks to a network. The ADT client lives in
//! `rac-adt`, the simulated server in `rac-sim`, and the orchestration in
//! `rac-compiler`.

pub mod activation;
pub mod client;
pub mod config;
pub mod invariants;
pub mod property;
pub mod result;

pub use activation::{ActivationMessage, ActivationResult, InactiveObject, MessageSeverity};
pub use client::{
    ActivationRequest, LockHandle, LockMode, NewObject, RemoteError, RemoteObjectClient,
    SessionType,
};
pub use config::{ConfigError, ConnectionConfig};
pub use property::PropertyResult;
pub use result::{CompilationError, CompilationResult};
