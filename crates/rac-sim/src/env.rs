//! Simulation environment: one seed for the server's faults and the
//! caller's randomness.

use std::fmt;

use crate::fault::{FaultConfig, FaultInjector};
use crate::random::DeterministicRng;
use crate::server::{SimConnection, SimServer};

/// Complete simulation environment.
///
/// Given the same seed and the same calls, the faults hit the same steps
/// and the generated class names repeat.
pub struct SimEnv {
    seed: u64,
    rng: DeterministicRng,
    server: SimServer,
}

impl SimEnv {
    /// Environment with the default fault configuration.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_fault_config(seed, FaultConfig::default())
    }

    /// Environment with a custom fault configuration.
    #[must_use]
    pub fn with_fault_config(seed: u64, fault_config: FaultConfig) -> Self {
        debug_assert!(seed != 0, "Seed should not be zero");

        let mut master_rng = DeterministicRng::new(seed);
        let rng = master_rng.fork();
        let fault_rng = master_rng.fork();

        Self {
            seed,
            rng,
            server: SimServer::with_faults(FaultInjector::new(fault_rng, fault_config)),
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The shared simulated server.
    #[must_use]
    pub fn server(&self) -> &SimServer {
        &self.server
    }

    /// Open a new connection to the server.
    #[must_use]
    pub fn connect(&self) -> SimConnection {
        self.server.connect()
    }

    /// Caller-side randomness, e.g. for class names.
    pub fn rng(&mut self) -> &mut DeterministicRng {
        &mut self.rng
    }

    /// Fork a new RNG for one compile call.
    pub fn fork_rng(&mut self) -> DeterministicRng {
        self.rng.fork()
    }

    /// Format seed for assertion messages.
    #[must_use]
    pub fn format_seed(&self) -> String {
        format!("RAC_SIM_SEED={}", self.seed)
    }

    #[must_use]
    pub fn stats(&self) -> SimStats {
        SimStats {
            seed: self.seed,
            rng_calls: self.rng.calls_count(),
            remote_calls: self.server.journal().len() as u64,
            faults_injected: self.server.faults_count(),
        }
    }
}

/// Statistics about a simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimStats {
    pub seed: u64,
    pub rng_calls: u64,
    pub remote_calls: u64,
    pub faults_injected: u64,
}

impl fmt::Display for SimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sim Stats: seed={}, rng_calls={}, remote_calls={}, faults={}",
            self.seed, self.rng_calls, self.remote_calls, self.faults_injected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rac_core::{NewObject, RemoteObjectClient};

    fn new_class(name: &str) -> NewObject {
        NewObject {
            kind: "CLAS/OC".into(),
            name: name.into(),
            package: "$TMP".into(),
            description: "test".into(),
            package_path: "/sap/bc/adt/packages/$TMP".into(),
            transport: None,
        }
    }

    #[test]
    fn test_same_seed_same_rng() {
        let mut a = SimEnv::new(42);
        let mut b = SimEnv::new(42);
        assert_eq!(a.rng().gen::<u64>(), b.rng().gen::<u64>());
        assert_eq!(a.fork_rng().seed(), b.fork_rng().seed());
        assert_eq!(a.format_seed(), "RAC_SIM_SEED=42");
    }

    #[tokio::test]
    async fn test_same_seed_same_faults() {
        let run = |seed| async move {
            let env = SimEnv::with_fault_config(seed, FaultConfig::body_only(0.5));
            let conn = env.connect();
            let mut outcomes = Vec::new();
            for i in 0..20 {
                let created = conn.create_object(&new_class(&format!("RAC_{}", i))).await;
                outcomes.push(created.is_ok());
            }
            (outcomes, env.stats())
        };

        let (first, stats) = run(7).await;
        let (second, _) = run(7).await;
        assert_eq!(first, second);
        assert_eq!(stats.remote_calls, 20);
        assert_eq!(
            stats.faults_injected,
            first.iter().filter(|ok| !**ok).count() as u64
        );
        assert!(stats.to_string().starts_with("Sim Stats: seed=7"));
    }
}
