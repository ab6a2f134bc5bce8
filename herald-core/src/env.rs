// Environment variable loading for bus configuration

use crate::{ConfigError, Result};
use std::env;

/// Prefix used for every Herald environment variable
pub const ENV_PREFIX: &str = "HERALD";

/// Environment variable loader
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Loader for `HERALD_*` variables
    pub fn herald() -> Self {
        Self::new(Some(ENV_PREFIX.to_string()))
    }

    /// Full variable name for `key`, e.g. `events_logging` -> `HERALD_EVENTS_LOGGING`
    pub fn var_name(&self, key: &str) -> String {
        match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    /// Load a specific environment variable, `None` when unset
    pub fn load_var(&self, key: &str) -> Option<String> {
        env::var(self.var_name(key)).ok()
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|| default.to_string())
    }

    /// Load a boolean flag.
    ///
    /// Accepts `1/0`, `true/false`, `yes/no`, `on/off` in any case. Unset
    /// variables yield `default`; anything else is an error.
    pub fn load_flag(&self, key: &str, default: bool) -> Result<bool> {
        match self.load_var(key) {
            Some(value) => parse_flag(&value).ok_or_else(|| ConfigError::InvalidValue {
                key: self.var_name(key),
                value,
            }),
            None => Ok(default),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::herald()
    }
}

/// Parse a boolean flag value
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // std::env::set_var is unsafe in edition 2024, so these tests only rely on
    // variables that are certainly unset.

    #[test]
    fn test_var_name_uses_prefix() {
        let loader = EnvLoader::herald();
        assert_eq!(loader.var_name("events_logging"), "HERALD_EVENTS_LOGGING");

        let bare = EnvLoader::new(None);
        assert_eq!(bare.var_name("path"), "PATH");
    }

    #[test]
    fn test_missing_flag_uses_default() {
        let loader = EnvLoader::herald();
        assert!(loader.load_flag("NONEXISTENT_FLAG_12345", true).unwrap());
        assert!(!loader.load_flag("NONEXISTENT_FLAG_12345", false).unwrap());
    }

    #[test]
    fn test_missing_var_uses_default() {
        let loader = EnvLoader::herald();
        assert_eq!(loader.load_var("NONEXISTENT_VAR_67890"), None);
        assert_eq!(loader.load_var_or("NONEXISTENT_VAR_67890", "fallback"), "fallback");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" on "), Some(true));
        assert_eq!(parse_flag("no"), Some(false));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
