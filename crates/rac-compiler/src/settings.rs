//! Where throwaway classes are created and how they are named.

use rac_core::ConfigError;

/// Longest prefix that still leaves eight random name characters.
pub const CLASS_PREFIX_LENGTH_MAX: usize = 22;

/// Settings for the throwaway class of each compile call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSettings {
    /// Class name prefix; the rest of the name is random
    pub class_prefix: String,
    /// Package the class is created in
    pub package: String,
    /// Transport request recording the changes, if the package needs one
    pub transport: Option<String>,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            class_prefix: "RAC_".to_string(),
            package: "$TMP".to_string(),
            transport: None,
        }
    }
}

impl UnitSettings {
    /// Create settings; an empty transport means none.
    pub fn new(
        class_prefix: impl Into<String>,
        package: impl Into<String>,
        transport: Option<String>,
    ) -> Self {
        Self {
            class_prefix: class_prefix.into(),
            package: package.into(),
            transport: normalize_transport(transport),
        }
    }

    /// Read `ADT_CLASS_PREFIX`, `ADT_PACKAGE` and `ADT_TRANSPORT`, falling
    /// back to the defaults for unset values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = Self::new(
            non_empty_env("ADT_CLASS_PREFIX").unwrap_or(defaults.class_prefix),
            non_empty_env("ADT_PACKAGE").unwrap_or(defaults.package),
            non_empty_env("ADT_TRANSPORT"),
        );
        settings.validate()?;
        Ok(settings)
    }

    /// Check the prefix and package.
    ///
    /// Namespaced prefixes such as `/NS/` are rejected: the slashes would
    /// end up unescaped in the class URI.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.class_prefix.is_empty() {
            return Err(ConfigError::Missing("class_prefix"));
        }
        if self.class_prefix.chars().count() > CLASS_PREFIX_LENGTH_MAX {
            return Err(ConfigError::Invalid {
                name: "class_prefix",
                reason: format!(
                    "{} is longer than {} characters",
                    self.class_prefix, CLASS_PREFIX_LENGTH_MAX
                ),
            });
        }
        if !self
            .class_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::Invalid {
                name: "class_prefix",
                reason: format!("{} contains characters not allowed in class names", self.class_prefix),
            });
        }
        if self.package.is_empty() {
            return Err(ConfigError::Missing("package"));
        }
        Ok(())
    }

    /// ADT URI of the target package.
    #[must_use]
    pub fn package_path(&self) -> String {
        format!("/sap/bc/adt/packages/{}", self.package)
    }
}

/// Treat an empty transport as no transport.
#[must_use]
pub fn normalize_transport(transport: Option<String>) -> Option<String> {
    transport.filter(|t| !t.trim().is_empty())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
