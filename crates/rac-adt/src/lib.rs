//! # rac-adt
//!
//! [`RemoteObjectClient`](rac_core::RemoteObjectClient) over the ABAP
//! Development Tools REST API.
//!
//! Covers what the compiler needs: class creation, lock and unlock, source
//! upload, activation, class run, deletion, and session handling. Modifying
//! requests carry a CSRF token, fetched on first use and refreshed once
//! when the server rejects it.

pub mod client;
pub mod xml;

pub use client::{AdtClient, AdtError};
