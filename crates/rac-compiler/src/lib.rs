//! # rac-compiler
//!
//! Compiles and runs ABAP code on a remote system through a throwaway
//! global class.
//!
//! | Step | Module |
//! |------|--------|
//! | Pick a fresh class name | [`naming`] |
//! | Wrap the caller's code in a runnable class | [`harness`] |
//! | Create, upload, activate, run, delete | [`orchestrator`] |
//! | Turn activation messages into compile errors | [`diagnostics`] |
//!
//! ```rust,no_run
//! # async fn demo(client: impl rac_core::RemoteObjectClient) -> Result<(), rac_compiler::CompileError> {
//! use rac_compiler::{CompilationRequest, UnitSettings};
//!
//! let request = CompilationRequest::new(client, &UnitSettings::default())?;
//! let result = request.compile("class main definition. ... endclass.").await?;
//! print!("{}", result.format_report());
//! # Ok(())
//! # }
//! ```

pub mod diagnostics;
pub mod error;
pub mod harness;
pub mod naming;
pub mod orchestrator;
pub mod settings;

pub use diagnostics::{DiagnosticMapper, Origin, MISSING_MAIN_RUN, WRONG_RUN_SIGNATURE};
pub use error::{CompileError, Stage};
pub use orchestrator::CompilationRequest;
pub use settings::UnitSettings;
