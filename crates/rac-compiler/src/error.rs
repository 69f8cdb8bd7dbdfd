//! Compile errors.
//!
//! A build that finishes with diagnostics is not an error; it comes back
//! as an unsuccessful [`rac_core::CompilationResult`]. These variants cover
//! everything that stops a call from producing a trustworthy result.

use std::fmt;

use rac_core::{ConfigError, RemoteError};

/// Orchestration stage, used to say where a remote call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CreateUnit,
    UploadSource,
    Activate,
    ActivateInactive,
    RunUnit,
    Cleanup,
}

impl Stage {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Stage::CreateUnit => "create unit",
            Stage::UploadSource => "upload source",
            Stage::Activate => "activate",
            Stage::ActivateInactive => "activate inactive objects",
            Stage::RunUnit => "run unit",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from a compile call.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Remote call failed during {stage}: {source}")]
    Remote {
        stage: Stage,
        #[source]
        source: RemoteError,
    },

    #[error("Activation of {class_name} failed without any diagnostics")]
    UnmappedBuildFailure { class_name: String },

    #[error("Could not delete {class_name}, it is left behind on the server: {source}")]
    Cleanup {
        class_name: String,
        #[source]
        source: RemoteError,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl CompileError {
    /// Wrap a remote error with the stage it happened in.
    pub(crate) fn remote(stage: Stage) -> impl FnOnce(RemoteError) -> Self {
        move |source| CompileError::Remote { stage, source }
    }

    /// Stage of a failed remote call, if this error came from one.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            CompileError::Remote { stage, .. } => Some(*stage),
            CompileError::Cleanup { .. } => Some(Stage::Cleanup),
            _ => None,
        }
    }
}
