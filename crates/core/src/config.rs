//! TOML-based configuration system for Warden.

use crate::error::{Result, WardenError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level Warden configuration, deserialized from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    pub console: ConsoleSection,
    #[serde(default)]
    pub directory: DirectoryConfig,
}

/// Console instance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleSection {
    pub instance_name: String,
    /// How many results a user search may return at most.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

fn default_search_limit() -> usize {
    50
}

/// Connection defaults for the directory the console manages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Domain to bind against, e.g. `example.com` or `EXAMPLE`.
    #[serde(default)]
    pub domain: String,
    /// Optional explicit server host; when empty the domain name is dialed.
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    /// Verify the server certificate on TLS connections.
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,
    /// Connection timeout in seconds, passed through to the LDAP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    636
}

fn default_use_tls() -> bool {
    true
}

fn default_tls_verify() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            server: None,
            port: default_port(),
            use_tls: default_use_tls(),
            tls_verify: default_tls_verify(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WardenConfig {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| WardenError::Config(format!("failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Validate the configuration, returning an error for invalid combinations.
    pub fn validate(&self) -> Result<()> {
        if self.console.instance_name.is_empty() {
            return Err(WardenError::Config(
                "console.instance_name must not be empty".into(),
            ));
        }

        if self.directory.domain.is_empty() {
            return Err(WardenError::Config(
                "directory.domain must not be empty".into(),
            ));
        }

        if self.directory.port == 0 {
            return Err(WardenError::Config("directory.port must be nonzero".into()));
        }

        if self.directory.timeout_secs == 0 {
            return Err(WardenError::Config(
                "directory.timeout_secs must be nonzero".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> WardenConfig {
        WardenConfig {
            console: ConsoleSection {
                instance_name: "corp".into(),
                search_limit: default_search_limit(),
            },
            directory: DirectoryConfig {
                domain: "example.com".into(),
                ..DirectoryConfig::default()
            },
        }
    }

    #[test]
    fn directory_defaults() {
        let dir = DirectoryConfig::default();
        assert_eq!(dir.port, 636);
        assert!(dir.use_tls);
        assert!(dir.tls_verify);
        assert_eq!(dir.timeout_secs, 15);
        assert!(dir.server.is_none());
    }

    #[test]
    fn parse_minimal_toml() {
        let toml_str = r#"
            [console]
            instance_name = "corp"

            [directory]
            domain = "example.com"
        "#;
        let config: WardenConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.console.instance_name, "corp");
        assert_eq!(config.console.search_limit, 50);
        assert_eq!(config.directory.domain, "example.com");
        assert_eq!(config.directory.port, 636);
        config.validate().unwrap();
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
            [console]
            instance_name = "corp"
            search_limit = 25

            [directory]
            domain = "example.com"
            server = "dc01.example.com"
            port = 389
            use_tls = false
            tls_verify = false
            timeout_secs = 30
        "#;
        let config: WardenConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.console.search_limit, 25);
        assert_eq!(config.directory.server.as_deref(), Some("dc01.example.com"));
        assert_eq!(config.directory.port, 389);
        assert!(!config.directory.use_tls);
        assert!(!config.directory.tls_verify);
        assert_eq!(config.directory.timeout_secs, 30);
    }

    #[test]
    fn validate_requires_instance_name() {
        let mut config = valid_config();
        config.console.instance_name = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("instance_name"));
    }

    #[test]
    fn validate_requires_domain() {
        let mut config = valid_config();
        config.directory.domain = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("domain"));
    }

    #[test]
    fn validate_requires_nonzero_port() {
        let mut config = valid_config();
        config.directory.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_requires_nonzero_timeout() {
        let mut config = valid_config();
        config.directory.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = WardenConfig::load(Path::new("/nonexistent/warden.toml")).unwrap_err();
        assert!(matches!(err, WardenError::Io(_)));
    }

    #[test]
    fn round_trip_serialization() {
        let config = valid_config();
        let toml_str = toml::to_string(&config).unwrap();
        let back: WardenConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.console.instance_name, config.console.instance_name);
        assert_eq!(back.directory.domain, config.directory.domain);
    }
}
