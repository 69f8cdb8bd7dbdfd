//! # rac-sim
//!
//! Deterministic simulation of the remote ABAP repository, for testing the
//! compiler without a server.
//!
//! The simulated server keeps objects, locks, and sessions in memory,
//! journals every call, and injects faults from a seed. The same seed and
//! the same calls give the same run.
//!
//! ## Usage
//!
//! ```rust
//! use rac_sim::{FaultConfig, SimEnv};
//!
//! let env = SimEnv::with_fault_config(12345, FaultConfig::body_only(0.3));
//! let connection = env.connect();
//! assert_eq!(connection.id(), 1);
//! assert!(env.server().leftover_units("RAC_").is_empty());
//! ```
//!
//! ## Reproducibility
//!
//! To reproduce a failing test:
//! ```bash
//! RAC_SIM_SEED=12345 cargo test
//! ```

pub mod activator;
pub mod env;
pub mod fault;
pub mod random;
pub mod server;

pub use activator::ContractActivator;
pub use env::{SimEnv, SimStats};
pub use fault::{FaultConfig, FaultInjector, RemoteStep};
pub use random::DeterministicRng;
pub use server::{RemoteCall, SimConnection, SimObject, SimServer};

/// Get the simulation seed from the environment or generate a random one.
///
/// Prints the seed for reproduction. Use `RAC_SIM_SEED=<seed>` to reproduce.
#[must_use]
pub fn get_or_generate_seed() -> u64 {
    match std::env::var("RAC_SIM_SEED") {
        Ok(s) => {
            let seed: u64 = s.parse().expect("RAC_SIM_SEED must be a valid u64");
            println!("RAC_SIM_SEED={} (from environment)", seed);
            seed
        }
        Err(_) => {
            let seed = rand::random::<u64>().max(1);
            println!("RAC_SIM_SEED={} (randomly generated)", seed);
            seed
        }
    }
}
