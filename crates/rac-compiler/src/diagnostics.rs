//! Activation diagnostics to compile errors.
//!
//! Messages raised inside the harness describe a broken `MAIN`/`RUN`
//! contract, not a position in the caller's code. Their raw text names the
//! harness's own types, so they are rewritten into one of two fixed
//! sentences and reported without a position. Everything else keeps its
//! text and gets its position from the `#start=<line>,<column>` fragment of
//! the message's source locator.

use std::sync::OnceLock;

use rac_core::{ActivationMessage, ActivationResult, CompilationError, CompilationResult};
use regex::Regex;

use crate::error::CompileError;
use crate::harness::harness_method_tag;

/// Reported when `MAIN` or its public `RUN` method cannot be found.
pub const MISSING_MAIN_RUN: &str = "Missing class named \"MAIN\" with public method \"RUN\".";

/// Reported when `RUN` exists but has the wrong signature.
pub const WRONG_RUN_SIGNATURE: &str = "The method \"RUN\" of class \"MAIN\" must have exactly \
one importing parameter of type \"REF TO IF_OO_ADT_CLASSRUN_OUT\".";

const MISSING_EXACT: [&str; 2] = [
    "Type \"MAIN\" is unknown.",
    "Method \"RUN\" is unknown or PROTECTED or PRIVATE.",
];

const MISSING_PREFIXES: [&str; 2] = ["The type \"MAIN\" is unknown", "Method \"RUN\" does not exist"];

fn start_position() -> &'static Regex {
    static START: OnceLock<Regex> = OnceLock::new();
    START.get_or_init(|| Regex::new(r"#start=(\d+),(\d+)").expect("static regex is valid"))
}

/// Where a diagnostic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Raised inside the harness: the caller broke the `MAIN`/`RUN` contract
    Harness,
    /// Raised inside the caller's code
    User,
}

/// Maps activation results of one throwaway class.
#[derive(Debug, Clone)]
pub struct DiagnosticMapper {
    class_name: String,
    harness_tag: String,
}

impl DiagnosticMapper {
    pub fn new(class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        let harness_tag = harness_method_tag(&class_name);
        Self {
            class_name,
            harness_tag,
        }
    }

    /// Map the final activation outcome.
    ///
    /// An unsuccessful activation without any diagnostics cannot be turned
    /// into a meaningful error list and is reported as
    /// [`CompileError::UnmappedBuildFailure`].
    pub fn map(&self, activation: &ActivationResult) -> Result<CompilationResult, CompileError> {
        if activation.success {
            return Ok(CompilationResult::succeeded(&self.class_name));
        }

        if activation.messages.is_empty() {
            return Err(CompileError::UnmappedBuildFailure {
                class_name: self.class_name.clone(),
            });
        }

        let errors = activation
            .messages
            .iter()
            .map(|message| self.map_message(message))
            .collect();
        Ok(CompilationResult::failed(&self.class_name, errors))
    }

    /// Classify a single message.
    #[must_use]
    pub fn origin(&self, message: &ActivationMessage) -> Origin {
        if message.obj_descr.eq_ignore_ascii_case(&self.harness_tag) {
            Origin::Harness
        } else {
            Origin::User
        }
    }

    /// Map a single message.
    #[must_use]
    pub fn map_message(&self, message: &ActivationMessage) -> CompilationError {
        match self.origin(message) {
            Origin::Harness => map_contract_violation(&message.short_text),
            Origin::User => map_user_error(message),
        }
    }
}

fn map_user_error(message: &ActivationMessage) -> CompilationError {
    match parse_start(&message.href) {
        Some((line, offset)) => CompilationError::at(message.short_text.clone(), line, offset),
        None => CompilationError::unpositioned(message.short_text.clone()),
    }
}

fn map_contract_violation(short_text: &str) -> CompilationError {
    let missing = MISSING_EXACT.contains(&short_text)
        || MISSING_PREFIXES.iter().any(|p| short_text.starts_with(p));
    if missing {
        CompilationError::unpositioned(MISSING_MAIN_RUN)
    } else {
        CompilationError::unpositioned(WRONG_RUN_SIGNATURE)
    }
}

/// Extract `(line, column)` from a `#start=<line>,<column>` fragment.
fn parse_start(href: &str) -> Option<(i64, i64)> {
    let captures = start_position().captures(href)?;
    let line = captures.get(1)?.as_str().parse().ok()?;
    let offset = captures.get(2)?.as_str().parse().ok()?;
    Some((line, offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rac_core::invariants::ResultPropertyChecker;
    use rac_core::MessageSeverity;

    const CLASS: &str = "RAC_0123456789ABCDEFGHIJKLMN";

    fn harness_message(text: &str) -> ActivationMessage {
        ActivationMessage::error(
            harness_method_tag(CLASS),
            "/sap/bc/adt/oo/classes/rac_0123456789abcdefghijklmn/source/main#start=8,5",
            text,
        )
    }

    fn user_message(text: &str, href: &str) -> ActivationMessage {
        ActivationMessage::error(
            "Class RAC_0123456789ABCDEFGHIJKLMN, Class-relevant local types",
            href,
            text,
        )
    }

    #[test]
    fn test_success() {
        let mapper = DiagnosticMapper::new(CLASS);
        let result = mapper.map(&ActivationResult::activated()).unwrap();
        assert!(result.success);
        assert_eq!(result.class_name, CLASS);
        assert!(result.errors.is_none());
    }

    #[test]
    fn test_success_with_warnings_drops_them() {
        let mapper = DiagnosticMapper::new(CLASS);
        let warning = ActivationMessage {
            severity: MessageSeverity::Warning,
            ..user_message("Variable is never used", "#start=3,4")
        };
        let result = mapper
            .map(&ActivationResult::from_parts(vec![warning], vec![]))
            .unwrap();
        assert!(result.success);
        assert!(result.errors.is_none());
    }

    #[test]
    fn test_missing_main_class() {
        let mapper = DiagnosticMapper::new(CLASS);
        let activation =
            ActivationResult::rejected(vec![harness_message("Type \"MAIN\" is unknown.")]);
        let result = mapper.map(&activation).unwrap();

        assert!(!result.success);
        assert_eq!(
            result.errors(),
            &[CompilationError::unpositioned(MISSING_MAIN_RUN)]
        );
        assert_eq!(
            MISSING_MAIN_RUN,
            "Missing class named \"MAIN\" with public method \"RUN\"."
        );
    }

    #[test]
    fn test_harness_tag_ignores_case() {
        let mapper = DiagnosticMapper::new(&CLASS.to_ascii_lowercase());
        let message = harness_message("Type \"MAIN\" is unknown.");
        assert_eq!(mapper.origin(&message), Origin::Harness);
        assert_eq!(
            mapper.map_message(&message),
            CompilationError::unpositioned(MISSING_MAIN_RUN)
        );
    }

    #[test]
    fn test_missing_variants() {
        let mapper = DiagnosticMapper::new(CLASS);
        for text in [
            "Method \"RUN\" is unknown or PROTECTED or PRIVATE.",
            "The type \"MAIN\" is unknown or not a class.",
            "Method \"RUN\" does not exist in class \"MAIN\".",
        ] {
            let error = mapper.map_message(&harness_message(text));
            assert_eq!(error.error_message, MISSING_MAIN_RUN, "text: {}", text);
            assert!(!error.has_position());
        }
    }

    #[test]
    fn test_wrong_signature() {
        let mapper = DiagnosticMapper::new(CLASS);
        let error = mapper.map_message(&harness_message(
            "Formal parameter \"OUT\" does not exist. However, there is the formal parameter.",
        ));
        assert_eq!(error.error_message, WRONG_RUN_SIGNATURE);
        assert_eq!(error.line, -1);
        assert_eq!(error.offset, -1);
        assert_eq!(
            WRONG_RUN_SIGNATURE,
            "The method \"RUN\" of class \"MAIN\" must have exactly one importing parameter of type \"REF TO IF_OO_ADT_CLASSRUN_OUT\"."
        );
    }

    #[test]
    fn test_user_error_position() {
        let mapper = DiagnosticMapper::new(CLASS);
        let message = user_message(
            "The statement \"NOT_EXIST\" is invalid. Check the spelling.",
            "/sap/bc/adt/oo/classes/rac_x/includes/implementations#start=8,25",
        );
        let result = mapper.map(&ActivationResult::rejected(vec![message])).unwrap();
        assert_eq!(
            result.errors(),
            &[CompilationError::at(
                "The statement \"NOT_EXIST\" is invalid. Check the spelling.",
                8,
                25
            )]
        );
    }

    #[test]
    fn test_user_error_without_position() {
        let mapper = DiagnosticMapper::new(CLASS);
        let error = mapper.map_message(&user_message("Something odd", "/sap/bc/adt/oo/classes/x"));
        assert_eq!(error, CompilationError::unpositioned("Something odd"));
    }

    #[test]
    fn test_order_preserved_and_mixed_origins() {
        let mapper = DiagnosticMapper::new(CLASS);
        let activation = ActivationResult::rejected(vec![
            user_message("first", "#start=1,2"),
            harness_message("Type \"MAIN\" is unknown."),
            user_message("third", "#start=5,6"),
        ]);
        let result = mapper.map(&activation).unwrap();
        let messages: Vec<&str> = result
            .errors()
            .iter()
            .map(|e| e.error_message.as_str())
            .collect();
        assert_eq!(messages, vec!["first", MISSING_MAIN_RUN, "third"]);
        assert!(ResultPropertyChecker::new(&result).all_hold());
    }

    #[test]
    fn test_origin_is_exclusive() {
        let mapper = DiagnosticMapper::new(CLASS);
        assert_eq!(mapper.origin(&harness_message("x")), Origin::Harness);
        assert_eq!(mapper.origin(&user_message("x", "")), Origin::User);

        // Same method of a different throwaway class is user code from our
        // point of view.
        let other = ActivationMessage::error(
            harness_method_tag("RAC_SOMEONE_ELSE"),
            "",
            "Type \"MAIN\" is unknown.",
        );
        assert_eq!(mapper.origin(&other), Origin::User);
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let mapper = DiagnosticMapper::new(CLASS);
        let activation = ActivationResult::rejected(vec![
            harness_message("Too many parameters"),
            user_message("bad", "#start=2,3"),
        ]);
        assert_eq!(
            mapper.map(&activation).unwrap(),
            mapper.map(&activation).unwrap()
        );
    }

    #[test]
    fn test_unsuccessful_without_messages_is_unmapped() {
        let mapper = DiagnosticMapper::new(CLASS);
        let err = mapper.map(&ActivationResult::rejected(vec![])).unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnmappedBuildFailure { ref class_name } if class_name == CLASS
        ));
    }

    #[test]
    fn test_harness_text_never_leaks() {
        let mapper = DiagnosticMapper::new(CLASS);
        let activation = ActivationResult::rejected(vec![harness_message(&format!(
            "Method \"RUN\" of {} has the wrong parameters",
            CLASS
        ))]);
        let result = mapper.map(&activation).unwrap();
        assert!(ResultPropertyChecker::new(&result).all_hold());
    }

    #[test]
    fn test_parse_start() {
        assert_eq!(parse_start("x#start=12,0"), Some((12, 0)));
        assert_eq!(parse_start("x#start=12"), None);
        assert_eq!(parse_start(""), None);
    }
}
