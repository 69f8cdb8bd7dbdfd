//! Compilation orchestration.
//!
//! One [`CompilationRequest`] drives one throwaway class through its whole
//! life:
//!
//! ```text
//! create → upload (lock, main, includes, unlock) → activate
//!        → [failed with inactive objects] activate those
//!        → map → [success] run → cleanup (lock, delete, unlock)
//! ```
//!
//! Cleanup runs exactly once on every exit path. A request owns its client
//! and is consumed by [`CompilationRequest::compile`], so the generated name
//! is never reused.

use rac_core::invariants::ResultPropertyChecker;
use rac_core::{
    ActivationRequest, ActivationResult, CompilationResult, LockHandle, LockMode, NewObject,
    RemoteError, RemoteObjectClient, SessionType,
};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::diagnostics::DiagnosticMapper;
use crate::error::{CompileError, Stage};
use crate::harness;
use crate::naming;
use crate::settings::UnitSettings;

/// Object type of a global class.
pub const CLASS_OBJECT_TYPE: &str = "CLAS/OC";

/// Description given to every throwaway class.
pub const CLASS_DESCRIPTION: &str = "remote ABAP compiler";

/// A single compile call against one remote system.
pub struct CompilationRequest<C> {
    client: C,
    settings: UnitSettings,
    class_name: String,
    class_url: String,
}

impl<C: RemoteObjectClient> CompilationRequest<C> {
    /// Prepare a call with a freshly generated class name.
    pub fn new(client: C, settings: &UnitSettings) -> Result<Self, CompileError> {
        Self::with_rng(client, settings, &mut rand::thread_rng())
    }

    /// Prepare a call, drawing the class name from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(
        client: C,
        settings: &UnitSettings,
        rng: &mut R,
    ) -> Result<Self, CompileError> {
        settings.validate()?;
        let class_name = naming::generate_with(rng, &settings.class_prefix);
        let class_url = naming::class_url(&class_name);

        Ok(Self {
            client,
            settings: settings.clone(),
            class_name,
            class_url,
        })
    }

    /// Name of the throwaway class.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// ADT URI of the throwaway class.
    #[must_use]
    pub fn class_url(&self) -> &str {
        &self.class_url
    }

    /// Compile and, if the build succeeds, run `code`.
    ///
    /// A build with diagnostics is an `Ok` result with `success == false`.
    /// `Err` means the call could not produce a trustworthy result.
    pub async fn compile(self, code: &str) -> Result<CompilationResult, CompileError> {
        info!(class = %self.class_name, package = %self.settings.package, "Compiling");

        let body = self.build_and_run(code).await;
        let cleanup = self.cleanup().await;

        let outcome = match (body, cleanup) {
            (Ok(result), Ok(())) => Ok(result),
            (Ok(_), Err(source)) => Err(CompileError::Cleanup {
                class_name: self.class_name.clone(),
                source,
            }),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup_err)) => {
                warn!(
                    class = %self.class_name,
                    error = %cleanup_err,
                    "Cleanup failed after an earlier failure, class may be left behind"
                );
                Err(err)
            }
        };

        match &outcome {
            Ok(result) => info!(class = %self.class_name, success = result.success, "Compiled"),
            Err(err) => info!(class = %self.class_name, error = %err, "Compile failed"),
        }
        outcome
    }

    async fn build_and_run(&self, code: &str) -> Result<CompilationResult, CompileError> {
        self.create_unit().await?;
        self.upload_source(code).await?;
        let activation = self.activate().await?;

        let result = DiagnosticMapper::new(&self.class_name).map(&activation)?;
        for property in ResultPropertyChecker::new(&result).check_all() {
            if !property.holds {
                warn!(class = %self.class_name, "{}", property.format_status());
            }
        }
        if !result.success {
            debug!(class = %self.class_name, errors = result.errors().len(), "Build failed");
            return Ok(result);
        }

        debug!(class = %self.class_name, "Running");
        let output = self
            .client
            .run_class(&self.class_name)
            .await
            .map_err(CompileError::remote(Stage::RunUnit))?;
        Ok(result.with_output(output))
    }

    async fn create_unit(&self) -> Result<(), CompileError> {
        debug!(class = %self.class_name, "Creating class");
        self.client.set_session(SessionType::Stateless);
        let object = NewObject {
            kind: CLASS_OBJECT_TYPE.to_string(),
            name: self.class_name.clone(),
            package: self.settings.package.clone(),
            description: CLASS_DESCRIPTION.to_string(),
            package_path: self.settings.package_path(),
            transport: self.settings.transport.clone(),
        };
        self.client
            .create_object(&object)
            .await
            .map_err(CompileError::remote(Stage::CreateUnit))
    }

    /// Write the harness and the caller's code under one lock. The lock is
    /// released and the session dropped whatever happens to the writes.
    async fn upload_source(&self, code: &str) -> Result<(), CompileError> {
        debug!(class = %self.class_name, "Uploading source");
        self.client.set_session(SessionType::Stateful);

        let uploaded = match self.client.lock(&self.class_url, LockMode::Modify).await {
            Ok(handle) => {
                let written = self.write_sources(code, &handle).await;
                let unlocked = self.client.unlock(&self.class_url, &handle).await;
                match (written, unlocked) {
                    (Ok(()), unlocked) => unlocked,
                    (Err(err), Ok(())) => Err(err),
                    (Err(err), Err(unlock_err)) => {
                        warn!(class = %self.class_name, error = %unlock_err, "Unlock failed after a failed write");
                        Err(err)
                    }
                }
            }
            Err(err) => Err(err),
        };

        self.client.set_session(SessionType::Stateless);
        let dropped = self.client.drop_session().await;

        uploaded
            .and(dropped)
            .map_err(CompileError::remote(Stage::UploadSource))
    }

    async fn write_sources(&self, code: &str, handle: &LockHandle) -> Result<(), RemoteError> {
        let transport = self.settings.transport.as_deref();
        self.client
            .set_source(
                &format!("{}/source/main", self.class_url),
                &harness::render(&self.class_name),
                handle,
                transport,
            )
            .await?;
        self.client
            .set_source(
                &format!("{}/includes/implementations", self.class_url),
                code,
                handle,
                transport,
            )
            .await
    }

    /// Activate the class; if the server defers dependent objects, activate
    /// exactly those once more. The last outcome wins.
    async fn activate(&self) -> Result<ActivationResult, CompileError> {
        debug!(class = %self.class_name, "Activating");
        let first = self
            .client
            .activate(&ActivationRequest::Object {
                name: self.class_name.clone(),
                uri: self.class_url.clone(),
                preaudit: true,
            })
            .await
            .map_err(CompileError::remote(Stage::Activate))?;

        if !first.needs_second_pass() {
            return Ok(first);
        }

        debug!(
            class = %self.class_name,
            inactive = first.inactive.len(),
            "Activating inactive objects"
        );
        self.client
            .activate(&ActivationRequest::Inactive(first.inactive))
            .await
            .map_err(CompileError::remote(Stage::ActivateInactive))
    }

    /// Delete the class under a stateful lock, then end the session.
    async fn cleanup(&self) -> Result<(), RemoteError> {
        debug!(class = %self.class_name, "Deleting class");
        self.client.set_session(SessionType::Stateful);

        let deleted = match self.client.lock(&self.class_url, LockMode::Modify).await {
            Ok(handle) => {
                let deleted = self
                    .client
                    .delete_object(&self.class_url, &handle, self.settings.transport.as_deref())
                    .await;
                // After a successful delete the lock went with the object.
                if let Err(err) = self.client.unlock(&self.class_url, &handle).await {
                    if deleted.is_err() {
                        warn!(class = %self.class_name, error = %err, "Unlock failed after a failed delete");
                    }
                }
                deleted
            }
            Err(err) => Err(err),
        };

        self.client.set_session(SessionType::Stateless);
        let dropped = self.client.drop_session().await;
        match (deleted, dropped) {
            (Ok(()), dropped) => dropped,
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(drop_err)) => {
                warn!(class = %self.class_name, error = %drop_err, "Could not end the session");
                Err(err)
            }
        }
    }
}
