//! A stand-in for the server's activation and class-run machinery.
//!
//! It understands just enough ABAP to check the `MAIN`/`RUN` contract the
//! harness relies on, and reports violations the way the real server does:
//! as errors attributed to the harness's `if_oo_adt_classrun~main` method.
//! Running a class collects the literals passed to `out->write( ... )`.

use rac_core::{ActivationMessage, ActivationResult};

const MISSING_MAIN_TEXT: &str = "Type \"MAIN\" is unknown.";

/// Checks the caller's code against the harness contract.
#[derive(Debug, Clone, Default)]
pub struct ContractActivator;

impl ContractActivator {
    /// Activate a class whose main slot delegates to `MAIN->RUN`.
    #[must_use]
    pub fn activate(&self, class_name: &str, class_url: &str, includes: &str) -> ActivationResult {
        match contract_violation(includes) {
            None => ActivationResult::activated(),
            Some(short_text) => ActivationResult::rejected(vec![ActivationMessage::error(
                format!("Class {}, Method IF_OO_ADT_CLASSRUN~MAIN", class_name),
                format!("{}/source/main#start=8,4", class_url),
                short_text,
            )]),
        }
    }

    /// Whether the contract check would pass for this code.
    #[must_use]
    pub fn accepts(&self, includes: &str) -> bool {
        contract_violation(includes).is_none()
    }

    /// Output of running an activated class: one line per `out->write`.
    #[must_use]
    pub fn run(&self, includes: &str) -> String {
        let mut output = String::new();
        let mut rest = includes;
        while let Some(index) = find_ignore_case(rest, "out->write(") {
            rest = &rest[index + "out->write(".len()..];
            let trimmed = rest.trim_start();
            let Some(quote) = trimmed.chars().next().filter(|c| *c == '\'' || *c == '`') else {
                continue;
            };
            let literal = &trimmed[quote.len_utf8()..];
            if let Some(end) = literal.find(quote) {
                output.push_str(&literal[..end]);
                output.push('\n');
                rest = &literal[end + quote.len_utf8()..];
            }
        }
        output
    }
}

fn contract_violation(includes: &str) -> Option<&'static str> {
    let normalized = includes
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let definition_start = match normalized.find("class main definition") {
        Some(start) => start,
        None => return Some(MISSING_MAIN_TEXT),
    };
    let definition = &normalized[definition_start..];
    let definition = match definition.find("endclass") {
        Some(end) => &definition[..end],
        None => definition,
    };

    let public = match definition.find("public section.") {
        Some(start) => &definition[start..],
        None => return Some("Method \"RUN\" is unknown or PROTECTED or PRIVATE."),
    };
    let public = match public.find("protected section.").or_else(|| public.find("private section.")) {
        Some(end) => &public[..end],
        None => public,
    };

    let methods = public
        .match_indices("methods run")
        .map(|(i, _)| &public[i + "methods run".len()..])
        .find(|rest| rest.starts_with(' ') || rest.starts_with('.'));
    let signature = match methods {
        Some(signature) => signature,
        None => return Some("Method \"RUN\" is unknown or PROTECTED or PRIVATE."),
    };

    let signature = match signature.find('.') {
        Some(end) => &signature[..end],
        None => signature,
    };
    if signature.trim() == "importing out type ref to if_oo_adt_classrun_out" {
        None
    } else {
        Some("The method \"RUN\" does not have exactly one IMPORTING parameter \"OUT\".")
    }
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = "class main definition.
                           public section.
                             methods run importing out type ref to if_oo_adt_classrun_out.
                         endclass.

                         class main implementation.
                           method run.
                             out->write( 'Hello World' ).
                           endmethod.
                         endclass.";

    #[test]
    fn test_valid_contract() {
        let activator = ContractActivator;
        let result = activator.activate("RAC_X", "/sap/bc/adt/oo/classes/rac_x", HELLO);
        assert!(result.success);
        assert_eq!(activator.run(HELLO), "Hello World\n");
    }

    #[test]
    fn test_violations() {
        let activator = ContractActivator;
        let no_run = HELLO.replace("methods run importing", "methods run2 importing");
        assert!(!activator.accepts(&no_run));

        let no_param = HELLO.replace(
            "methods run importing out type ref to if_oo_adt_classrun_out.",
            "methods run.",
        );
        let result = activator.activate("RAC_X", "/x", &no_param);
        assert_eq!(
            result.messages[0].short_text,
            "The method \"RUN\" does not have exactly one IMPORTING parameter \"OUT\"."
        );
        assert_eq!(
            result.messages[0].obj_descr,
            "Class RAC_X, Method IF_OO_ADT_CLASSRUN~MAIN"
        );

        let private = HELLO.replace("public section.", "private section.");
        assert!(!activator.accepts(&private));

        let renamed = HELLO.replace("class main", "class main2");
        let result = activator.activate("RAC_X", "/x", &renamed);
        assert_eq!(result.messages[0].short_text, "Type \"MAIN\" is unknown.");
    }

    #[test]
    fn test_run_collects_writes() {
        let activator = ContractActivator;
        let code = "out->write( 'a' ). OUT->WRITE( `b` ). out->write( lv_x ).";
        assert_eq!(activator.run(code), "a\nb\n");
    }
}
