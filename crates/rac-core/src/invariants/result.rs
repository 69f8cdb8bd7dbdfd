//! Compilation result invariants.
//!
//! | Property | Description |
//! |----------|-------------|
//! | ResultShape | Success carries no errors; failure carries errors and no output |
//! | NoHarnessLeak | No error message mentions the throwaway class name |

use crate::property::PropertyResult;
use crate::result::CompilationResult;

/// Property checker for a single [`CompilationResult`].
pub struct ResultPropertyChecker<'a> {
    result: &'a CompilationResult,
}

impl<'a> ResultPropertyChecker<'a> {
    #[must_use]
    pub fn new(result: &'a CompilationResult) -> Self {
        Self { result }
    }

    /// `success` implies `errors` is absent; failure implies `output` is
    /// absent and at least one error is reported.
    fn check_result_shape(&self) -> PropertyResult {
        let result = self.result;
        if result.success && result.errors.is_some() {
            return PropertyResult::fail(
                "ResultShape",
                "successful result carries an error list".to_string(),
            );
        }
        if !result.success {
            if result.output.is_some() {
                return PropertyResult::fail(
                    "ResultShape",
                    "failed result carries program output".to_string(),
                );
            }
            if result.errors().is_empty() {
                return PropertyResult::fail(
                    "ResultShape",
                    "failed result carries no errors".to_string(),
                );
            }
        }
        PropertyResult::pass("ResultShape")
    }

    /// Error messages never reveal the generated class name.
    fn check_no_harness_leak(&self) -> PropertyResult {
        let class_name = self.result.class_name.to_uppercase();
        if class_name.is_empty() {
            return PropertyResult::pass("NoHarnessLeak");
        }

        for (index, error) in self.result.errors().iter().enumerate() {
            if error.error_message.to_uppercase().contains(&class_name) {
                return PropertyResult::fail(
                    "NoHarnessLeak",
                    format!("error {} mentions {}: {}", index, class_name, error.error_message),
                );
            }
        }
        PropertyResult::pass("NoHarnessLeak")
    }

    /// Run every check.
    #[must_use]
    pub fn check_all(&self) -> Vec<PropertyResult> {
        vec![self.check_result_shape(), self.check_no_harness_leak()]
    }

    /// Whether every property holds.
    #[must_use]
    pub fn all_hold(&self) -> bool {
        self.check_all().iter().all(|p| p.holds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::CompilationError;

    #[test]
    fn test_well_formed_results_pass() {
        let ok = CompilationResult::succeeded("RAC_ABC").with_output("x\n".into());
        assert!(ResultPropertyChecker::new(&ok).all_hold());

        let failed =
            CompilationResult::failed("RAC_ABC", vec![CompilationError::at("bad", 1, 2)]);
        assert!(ResultPropertyChecker::new(&failed).all_hold());
    }

    #[test]
    fn test_shape_violations() {
        let mut success_with_errors = CompilationResult::succeeded("RAC_ABC");
        success_with_errors.errors = Some(vec![]);
        let checks = ResultPropertyChecker::new(&success_with_errors).check_all();
        assert!(!checks[0].holds);

        let empty_failure = CompilationResult::failed("RAC_ABC", vec![]);
        assert!(!ResultPropertyChecker::new(&empty_failure).all_hold());

        let mut failure_with_output =
            CompilationResult::failed("RAC_ABC", vec![CompilationError::unpositioned("x")]);
        failure_with_output.output = Some("leaked".into());
        assert!(!ResultPropertyChecker::new(&failure_with_output).all_hold());
    }

    #[test]
    fn test_harness_leak_detected() {
        let leaked = CompilationResult::failed(
            "RAC_ABC",
            vec![CompilationError::unpositioned(
                "Class rac_abc, Method IF_OO_ADT_CLASSRUN~MAIN: Type \"MAIN\" is unknown.",
            )],
        );
        let checks = ResultPropertyChecker::new(&leaked).check_all();
        assert!(checks[0].holds);
        assert!(!checks[1].holds);
        assert!(checks[1].format_status().starts_with("[FAIL] NoHarnessLeak"));
    }
}
