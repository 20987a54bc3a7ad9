//! `${VAR}` expansion in configuration values.
//!
//! `${VAR}` must be set; `${VAR:-default}` falls back to the default. A bare
//! `$VAR` is left as written.

use crate::ConfigError;

/// Expand `${...}` references in `value`, naming `field` in errors.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |name| match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(UnsetVar(name.to_owned())),
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

struct UnsetVar(String);
