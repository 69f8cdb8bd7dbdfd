//! Invariants a compilation outcome must satisfy.

pub mod result;

pub use result::ResultPropertyChecker;
