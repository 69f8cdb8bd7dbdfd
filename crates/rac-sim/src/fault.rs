//! Deterministic fault injection for remote calls.
//!
//! Two kinds of faults:
//! - random failures, with a configurable probability, on an eligible set
//!   of steps;
//! - scheduled failures ("fail the 2nd lock"), for pinning a scenario down
//!   exactly.

use std::collections::HashMap;
use std::fmt;

use rac_core::RemoteError;

use crate::random::DeterministicRng;

/// A remote operation, as seen by the simulated server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RemoteStep {
    Create,
    Lock,
    Unlock,
    SetSource,
    Activate,
    ActivateInactive,
    Run,
    Delete,
    DropSession,
}

impl RemoteStep {
    /// Steps that belong to building and running, as opposed to cleanup.
    pub const BODY: [RemoteStep; 5] = [
        RemoteStep::Create,
        RemoteStep::SetSource,
        RemoteStep::Activate,
        RemoteStep::ActivateInactive,
        RemoteStep::Run,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            RemoteStep::Create => "create",
            RemoteStep::Lock => "lock",
            RemoteStep::Unlock => "unlock",
            RemoteStep::SetSource => "set_source",
            RemoteStep::Activate => "activate",
            RemoteStep::ActivateInactive => "activate_inactive",
            RemoteStep::Run => "run",
            RemoteStep::Delete => "delete",
            RemoteStep::DropSession => "drop_session",
        }
    }
}

impl fmt::Display for RemoteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for random fault injection.
#[derive(Debug, Clone)]
pub struct FaultConfig {
    /// Probability of failing an eligible call (0.0 to 1.0)
    pub failure_probability: f64,
    /// Steps random faults may hit
    pub steps: Vec<RemoteStep>,
    /// Whether random fault injection is enabled
    pub enabled: bool,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            failure_probability: 0.05,
            steps: RemoteStep::BODY.to_vec(),
            enabled: true,
        }
    }
}

impl FaultConfig {
    /// No random faults. Scheduled faults still fire.
    #[must_use]
    pub fn none() -> Self {
        Self {
            failure_probability: 0.0,
            steps: Vec::new(),
            enabled: false,
        }
    }

    /// Frequent faults while building and running; cleanup is left alone.
    #[must_use]
    pub fn body_only(failure_probability: f64) -> Self {
        Self {
            failure_probability,
            ..Self::default()
        }
    }

    /// Frequent faults on every step, cleanup included.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            failure_probability: 0.2,
            steps: vec![
                RemoteStep::Create,
                RemoteStep::Lock,
                RemoteStep::Unlock,
                RemoteStep::SetSource,
                RemoteStep::Activate,
                RemoteStep::ActivateInactive,
                RemoteStep::Run,
                RemoteStep::Delete,
                RemoteStep::DropSession,
            ],
            enabled: true,
        }
    }
}

/// Deterministic fault injector.
///
/// The same seed, config and call sequence produce the same faults.
pub struct FaultInjector {
    rng: DeterministicRng,
    config: FaultConfig,
    scheduled: Vec<(RemoteStep, u64)>,
    calls: HashMap<RemoteStep, u64>,
    faults_injected_count: u64,
}

impl FaultInjector {
    pub fn new(rng: DeterministicRng, config: FaultConfig) -> Self {
        debug_assert!(
            config.failure_probability >= 0.0 && config.failure_probability <= 1.0,
            "Failure probability must be in [0.0, 1.0]"
        );

        Self {
            rng,
            config,
            scheduled: Vec::new(),
            calls: HashMap::new(),
            faults_injected_count: 0,
        }
    }

    /// Fail the `nth` (1-based) call of `step`.
    pub fn schedule(&mut self, step: RemoteStep, nth: u64) {
        debug_assert!(nth > 0, "Calls are counted from 1");
        self.scheduled.push((step, nth));
    }

    /// Count a call of `step` and decide whether it fails.
    pub fn check(&mut self, step: RemoteStep, target: &str) -> Option<RemoteError> {
        let count = self.calls.entry(step).or_insert(0);
        *count += 1;
        let nth = *count;

        let scheduled = self.scheduled.iter().any(|&(s, n)| s == step && n == nth);
        let random = self.config.enabled
            && self.config.steps.contains(&step)
            && self.rng.gen_bool(self.config.failure_probability);

        if !(scheduled || random) {
            return None;
        }

        self.faults_injected_count += 1;
        Some(match step {
            RemoteStep::Lock => RemoteError::Locked(target.to_string()),
            _ => RemoteError::Transport(format!("injected fault at {} #{}", step, nth)),
        })
    }

    /// Number of calls of `step` seen so far.
    #[must_use]
    pub fn calls_count(&self, step: RemoteStep) -> u64 {
        self.calls.get(&step).copied().unwrap_or(0)
    }

    /// Number of faults injected so far.
    #[must_use]
    pub fn faults_count(&self) -> u64 {
        self.faults_injected_count
    }

    #[must_use]
    pub fn config(&self) -> &FaultConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: FaultConfig) {
        self.config = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_faults_when_disabled() {
        let mut injector = FaultInjector::new(DeterministicRng::new(12345), FaultConfig::none());
        for _ in 0..1000 {
            assert!(injector.check(RemoteStep::Create, "X").is_none());
        }
        assert_eq!(injector.calls_count(RemoteStep::Create), 1000);
        assert_eq!(injector.faults_count(), 0);
    }

    #[test]
    fn test_scheduled_fault_hits_exact_call() {
        let mut injector = FaultInjector::new(DeterministicRng::new(1), FaultConfig::none());
        injector.schedule(RemoteStep::Lock, 2);

        assert!(injector.check(RemoteStep::Lock, "/x").is_none());
        assert_eq!(
            injector.check(RemoteStep::Lock, "/x"),
            Some(RemoteError::Locked("/x".into()))
        );
        assert!(injector.check(RemoteStep::Lock, "/x").is_none());
        assert_eq!(injector.faults_count(), 1);
    }

    #[test]
    fn test_ineligible_steps_never_fail() {
        let config = FaultConfig::body_only(1.0);
        let mut injector = FaultInjector::new(DeterministicRng::new(9), config);

        assert!(injector.check(RemoteStep::Delete, "/x").is_none());
        assert!(injector.check(RemoteStep::Lock, "/x").is_none());
        assert!(matches!(
            injector.check(RemoteStep::Run, "X"),
            Some(RemoteError::Transport(_))
        ));
    }

    #[test]
    fn test_deterministic_faults() {
        let config = FaultConfig::body_only(0.5);
        let mut inj1 = FaultInjector::new(DeterministicRng::new(42), config.clone());
        let mut inj2 = FaultInjector::new(DeterministicRng::new(42), config);

        for _ in 0..100 {
            assert_eq!(
                inj1.check(RemoteStep::Activate, "X"),
                inj2.check(RemoteStep::Activate, "X")
            );
        }
    }
}
