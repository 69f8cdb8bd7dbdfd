//! Compilation result model.
//!
//! Serialises to the same JSON shape callers of the compiler have always
//! seen: camelCase keys, with `errors` and `output` omitted when absent.

use serde::{Deserialize, Serialize};

/// Position reported when a diagnostic has no real source location.
pub const NO_POSITION: i64 = -1;

/// A single compile error, free of any harness internals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationError {
    /// Message shown to the caller
    pub error_message: String,
    /// 1-based line in the submitted code, or -1
    pub line: i64,
    /// Column in the submitted code, or -1
    pub offset: i64,
}

impl CompilationError {
    /// Error anchored at a position in the submitted code.
    pub fn at(error_message: impl Into<String>, line: i64, offset: i64) -> Self {
        Self {
            error_message: error_message.into(),
            line,
            offset,
        }
    }

    /// Error without a source position.
    pub fn unpositioned(error_message: impl Into<String>) -> Self {
        Self::at(error_message, NO_POSITION, NO_POSITION)
    }

    /// Whether this error points at a real source position.
    #[must_use]
    pub fn has_position(&self) -> bool {
        self.line != NO_POSITION && self.offset != NO_POSITION
    }
}

/// Outcome of one compile call.
///
/// `errors` is only present on failed builds and `output` only on
/// successful runs; use [`CompilationResult::succeeded`] and
/// [`CompilationResult::failed`] to keep that true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationResult {
    pub success: bool,
    /// Name of the throwaway class the code was compiled in
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<CompilationError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl CompilationResult {
    /// Clean build; output is attached once the unit has run.
    pub fn succeeded(class_name: impl Into<String>) -> Self {
        Self {
            success: true,
            class_name: class_name.into(),
            errors: None,
            output: None,
        }
    }

    /// Failed build with mapped errors, in remote order.
    pub fn failed(class_name: impl Into<String>, errors: Vec<CompilationError>) -> Self {
        Self {
            success: false,
            class_name: class_name.into(),
            errors: Some(errors),
            output: None,
        }
    }

    /// Attach captured program output to a successful result.
    #[must_use]
    pub fn with_output(mut self, output: String) -> Self {
        debug_assert!(self.success, "Output only belongs on successful results");
        self.output = Some(output);
        self
    }

    /// Errors as a slice (empty on success).
    #[must_use]
    pub fn errors(&self) -> &[CompilationError] {
        self.errors.as_deref().unwrap_or(&[])
    }

    /// Format as a report, one line per error.
    #[must_use]
    pub fn format_report(&self) -> String {
        if self.success {
            let mut report = String::from("Ok\n");
            if let Some(ref output) = self.output {
                report.push_str(output);
            }
            return report;
        }

        let mut report = String::new();
        for error in self.errors() {
            report.push_str(&format!(
                "Line: {} Offset: {} Error: \"{}\".\n",
                error.line, error.offset, error.error_message
            ));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_json_omits_errors() {
        let result = CompilationResult::succeeded("RAC_ABC").with_output("Hello World\n".into());
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["className"], "RAC_ABC");
        assert_eq!(json["output"], "Hello World\n");
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn test_failure_json_shape() {
        let result = CompilationResult::failed(
            "RAC_ABC",
            vec![CompilationError::at("The statement \"X\" is invalid.", 8, 25)],
        );
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], false);
        assert!(json.get("output").is_none());
        assert_eq!(json["errors"][0]["errorMessage"], "The statement \"X\" is invalid.");
        assert_eq!(json["errors"][0]["line"], 8);
        assert_eq!(json["errors"][0]["offset"], 25);
    }

    #[test]
    fn test_unpositioned() {
        let error = CompilationError::unpositioned("Missing class");
        assert_eq!(error.line, -1);
        assert_eq!(error.offset, -1);
        assert!(!error.has_position());
        assert!(CompilationError::at("x", 1, 0).has_position());
    }

    #[test]
    fn test_format_report() {
        let ok = CompilationResult::succeeded("RAC_A").with_output("hi\n".into());
        assert_eq!(ok.format_report(), "Ok\nhi\n");

        let failed = CompilationResult::failed(
            "RAC_A",
            vec![
                CompilationError::at("first", 3, 4),
                CompilationError::unpositioned("second"),
            ],
        );
        let report = failed.format_report();
        assert_eq!(report.lines().count(), 2);
        assert!(report.starts_with("Line: 3 Offset: 4 Error: \"first\"."));
        assert!(report.contains("Line: -1 Offset: -1 Error: \"second\"."));
    }
}
