//! # Inspector Configuration
//!
//! Knobs for a variable-inspection session.
//!
//! ## Environment Variables
//!
//! - `FERROS_CLEAR_VARS_ON_RESUME`: drop every variable handle when the
//!   process resumes (`1`/`true`/`yes`, default: off)
//! - `FERROS_PRINT_ELEMENTS`: characters read from a C string before the
//!   display is cut short (default: 200)
//! - `FERROS_ARRAY_ELEMENTS`: elements shown in an inline array display
//!   (default: 200)
//!
//! Unparseable values are ignored with a warning and the default is used.

use std::env;
use std::str::FromStr;

use tracing::warn;

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectorConfig
{
    /// Clear the whole handle registry on resume, not only group values.
    pub clear_handles_on_resume: bool,
    /// Characters read from a C string for display.
    pub string_limit: usize,
    /// Elements shown in an inline array display.
    pub array_limit: usize,
    /// Consult the built-in array and pointer renderers after user renderers.
    pub default_renderers: bool,
}

impl Default for InspectorConfig
{
    fn default() -> Self
    {
        Self {
            clear_handles_on_resume: false,
            string_limit: 200,
            array_limit: 200,
            default_renderers: true,
        }
    }
}

impl InspectorConfig
{
    /// Defaults overridden by `FERROS_*` environment variables.
    pub fn from_env() -> Self
    {
        let defaults = Self::default();
        Self {
            clear_handles_on_resume: env_flag("FERROS_CLEAR_VARS_ON_RESUME").unwrap_or(defaults.clear_handles_on_resume),
            string_limit: env_parse("FERROS_PRINT_ELEMENTS").unwrap_or(defaults.string_limit),
            array_limit: env_parse("FERROS_ARRAY_ELEMENTS").unwrap_or(defaults.array_limit),
            default_renderers: defaults.default_renderers,
        }
    }

    #[must_use]
    pub fn with_string_limit(mut self, limit: usize) -> Self
    {
        self.string_limit = limit;
        self
    }

    #[must_use]
    pub fn with_array_limit(mut self, limit: usize) -> Self
    {
        self.array_limit = limit;
        self
    }

    #[must_use]
    pub fn with_clear_handles_on_resume(mut self, clear: bool) -> Self
    {
        self.clear_handles_on_resume = clear;
        self
    }

    #[must_use]
    pub fn without_default_renderers(mut self) -> Self
    {
        self.default_renderers = false;
        self
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T>
{
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparseable setting");
            None
        }
    }
}

fn env_flag(name: &str) -> Option<bool>
{
    let raw = env::var(name).ok()?;
    parse_flag(&raw).or_else(|| {
        warn!(variable = name, value = %raw, "Ignoring unparseable flag");
        None
    })
}

fn parse_flag(raw: &str) -> Option<bool>
{
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_defaults()
    {
        let config = InspectorConfig::default();
        assert!(!config.clear_handles_on_resume);
        assert_eq!(config.string_limit, 200);
        assert!(config.default_renderers);
    }

    #[test]
    fn test_parse_flag()
    {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_builders()
    {
        let config = InspectorConfig::default()
            .with_string_limit(10)
            .with_array_limit(3)
            .with_clear_handles_on_resume(true)
            .without_default_renderers();
        assert_eq!(config.string_limit, 10);
        assert_eq!(config.array_limit, 3);
        assert!(config.clear_handles_on_resume);
        assert!(!config.default_renderers);
    }
}
