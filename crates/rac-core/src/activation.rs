//! Activation (remote build) outcome as reported by the server.

/// Severity of an activation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Error,
    Abort,
    Exception,
    Warning,
    Info,
    Success,
}

impl MessageSeverity {
    /// Parse the one-letter type code the server sends.
    ///
    /// Unknown codes are treated as errors so they are never silently dropped.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "W" => MessageSeverity::Warning,
            "I" => MessageSeverity::Info,
            "S" => MessageSeverity::Success,
            "A" => MessageSeverity::Abort,
            "X" => MessageSeverity::Exception,
            _ => MessageSeverity::Error,
        }
    }

    /// The one-letter type code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            MessageSeverity::Error => "E",
            MessageSeverity::Abort => "A",
            MessageSeverity::Exception => "X",
            MessageSeverity::Warning => "W",
            MessageSeverity::Info => "I",
            MessageSeverity::Success => "S",
        }
    }

    /// Whether a message of this severity prevents activation.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            MessageSeverity::Error | MessageSeverity::Abort | MessageSeverity::Exception
        )
    }
}

/// One diagnostic from an activation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationMessage {
    /// Which object/method the message is about, e.g.
    /// `Class RAC_X, Method IF_OO_ADT_CLASSRUN~MAIN`
    pub obj_descr: String,
    pub severity: MessageSeverity,
    pub force_supported: bool,
    /// Source locator, carrying a `#start=<line>,<column>` fragment when known
    pub href: String,
    pub short_text: String,
}

impl ActivationMessage {
    /// Build an error message; mostly useful for tests and simulations.
    pub fn error(
        obj_descr: impl Into<String>,
        href: impl Into<String>,
        short_text: impl Into<String>,
    ) -> Self {
        Self {
            obj_descr: obj_descr.into(),
            severity: MessageSeverity::Error,
            force_supported: false,
            href: href.into(),
            short_text: short_text.into(),
        }
    }
}

/// An object the server left inactive and wants activated in a follow-up pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InactiveObject {
    pub uri: String,
    pub object_type: String,
    pub name: String,
    pub parent_uri: String,
}

/// Result of one activation request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivationResult {
    pub success: bool,
    /// Diagnostics in server order
    pub messages: Vec<ActivationMessage>,
    /// Objects requiring a second activation pass
    pub inactive: Vec<InactiveObject>,
}

impl ActivationResult {
    /// Clean activation.
    #[must_use]
    pub fn activated() -> Self {
        Self {
            success: true,
            messages: Vec::new(),
            inactive: Vec::new(),
        }
    }

    /// Failed activation with diagnostics.
    #[must_use]
    pub fn rejected(messages: Vec<ActivationMessage>) -> Self {
        Self {
            success: false,
            messages,
            inactive: Vec::new(),
        }
    }

    /// Build a result the way the server decides success: no blocking
    /// message and nothing left inactive.
    #[must_use]
    pub fn from_parts(messages: Vec<ActivationMessage>, inactive: Vec<InactiveObject>) -> Self {
        let success = inactive.is_empty() && !messages.iter().any(|m| m.severity.is_blocking());
        Self {
            success,
            messages,
            inactive,
        }
    }

    /// Whether a second pass over the inactive objects is called for.
    #[must_use]
    pub fn needs_second_pass(&self) -> bool {
        !self.success && !self.inactive.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_codes() {
        assert_eq!(MessageSeverity::from_code("E"), MessageSeverity::Error);
        assert_eq!(MessageSeverity::from_code("W"), MessageSeverity::Warning);
        assert_eq!(MessageSeverity::from_code("?"), MessageSeverity::Error);
        assert!(MessageSeverity::Abort.is_blocking());
        assert!(!MessageSeverity::Warning.is_blocking());
        assert_eq!(MessageSeverity::Exception.code(), "X");
    }

    #[test]
    fn test_from_parts_success_rules() {
        let warning = ActivationMessage {
            severity: MessageSeverity::Warning,
            ..ActivationMessage::error("Class X", "", "unused variable")
        };
        assert!(ActivationResult::from_parts(vec![warning.clone()], vec![]).success);

        let error = ActivationMessage::error("Class X", "", "broken");
        assert!(!ActivationResult::from_parts(vec![warning, error], vec![]).success);

        let inactive = InactiveObject {
            uri: "/sap/bc/adt/oo/classes/x".into(),
            object_type: "CLAS/OC".into(),
            name: "X".into(),
            parent_uri: String::new(),
        };
        let deferred = ActivationResult::from_parts(vec![], vec![inactive]);
        assert!(!deferred.success);
        assert!(deferred.needs_second_pass());
    }
}
