//! Connection settings for the remote system.

use std::fmt;
use std::time::Duration;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Endpoint and credentials for one remote system.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Base URL, e.g. `https://host:44300`
    pub url: String,
    pub user: String,
    pub password: String,
    /// Logon client (`sap-client`)
    pub client: String,
    /// Logon language
    pub language: String,
    /// Skip TLS certificate verification (self-signed development systems)
    pub accept_invalid_certs: bool,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: String::new(),
            client: String::new(),
            language: "EN".to_string(),
            accept_invalid_certs: true,
            timeout: Duration::from_secs(120),
        }
    }
}

impl ConnectionConfig {
    /// Create from explicit values, keeping the remaining defaults.
    pub fn new(
        url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        client: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            password: password.into(),
            client: client.into(),
            ..Default::default()
        }
    }

    /// Read `ADT_URL`, `ADT_USER`, `ADT_PASS` and `ADT_CLIENT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::new(
            require_env("ADT_URL")?,
            require_env("ADT_USER")?,
            require_env("ADT_PASS")?,
            require_env("ADT_CLIENT")?,
        );
        config.validate()?;
        Ok(config)
    }

    /// Check that all required values are present and the URL is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::Missing("url"));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: "url",
                reason: format!("expected an http(s) URL, got {}", self.url),
            });
        }
        if self.user.is_empty() {
            return Err(ConfigError::Missing("user"));
        }
        if self.client.is_empty() {
            return Err(ConfigError::Missing("client"));
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("client", &self.client)
            .field("language", &self.language)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let config = ConnectionConfig::new("https://host:44300/", "DEVELOPER", "secret", "001");
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url(), "https://host:44300");

        let missing = ConnectionConfig {
            user: String::new(),
            ..config.clone()
        };
        assert_eq!(missing.validate(), Err(ConfigError::Missing("user")));

        let bad_url = ConnectionConfig {
            url: "host:44300".into(),
            ..config
        };
        assert!(matches!(
            bad_url.validate(),
            Err(ConfigError::Invalid { name: "url", .. })
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ConnectionConfig::new("https://host", "DEVELOPER", "hunter2", "001");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    // The only test in this crate touching these variables.
    #[test]
    fn test_from_env() {
        for name in ["ADT_URL", "ADT_USER", "ADT_PASS", "ADT_CLIENT"] {
            std::env::remove_var(name);
        }
        assert_eq!(ConnectionConfig::from_env(), Err(ConfigError::Missing("ADT_URL")));

        std::env::set_var("ADT_URL", "https://host:44300");
        std::env::set_var("ADT_USER", "DEVELOPER");
        std::env::set_var("ADT_PASS", "");
        std::env::set_var("ADT_CLIENT", "001");
        assert_eq!(ConnectionConfig::from_env(), Err(ConfigError::Missing("ADT_PASS")));

        std::env::set_var("ADT_PASS", "secret");
        let config = ConnectionConfig::from_env().unwrap();
        assert_eq!(config.base_url(), "https://host:44300");
        assert_eq!(config.user, "DEVELOPER");
        assert_eq!(config.password, "secret");
        assert_eq!(config.client, "001");

        std::env::set_var("ADT_URL", "host:44300");
        assert!(matches!(
            ConnectionConfig::from_env(),
            Err(ConfigError::Invalid { name: "url", .. })
        ));

        for name in ["ADT_URL", "ADT_USER", "ADT_PASS", "ADT_CLIENT"] {
            std::env::remove_var(name);
        }
    }
}
