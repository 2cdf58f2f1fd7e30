//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic checks on the service file (serde handles syntax)
//! - Typed validation of config store values with default substitution
//!
//! # Design Decisions
//! - Service file validation returns all errors, not just the first
//! - Store value validation never fails: it reports a [`Correction`] instead,
//!   and the caller decides how to record it

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;

/// A semantic problem in the service file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is not a valid socket address: '{value}'")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate a parsed service configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.storage.database_url.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "storage.database_url" });
    }
    if config.service.heartbeat_interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "service.heartbeat_interval_secs" });
    }
    if config.service.sync_enabled && config.service.sync_interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "service.sync_interval_secs" });
    }
    if config.admin.enabled {
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field: "admin.bind_address",
                value: config.admin.bind_address.clone(),
            });
        }
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::Empty { field: "admin.api_key" });
        }
        if config.admin.request_timeout_secs == 0 {
            errors.push(ValidationError::Zero { field: "admin.request_timeout_secs" });
        }
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A stored value that failed validation and was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub key: String,
    pub value: String,
    pub using_default: String,
}

/// Outcome of validating one store value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checked<T> {
    pub value: T,
    pub correction: Option<Correction>,
}

impl<T> Checked<T> {
    pub fn corrected(&self) -> bool {
        self.correction.is_some()
    }
}

/// Validate `raw` with `parse`, substituting `default` when it does not parse.
///
/// A missing value (`None`) takes the default without counting as a correction.
pub fn validate<T, F>(key: &str, raw: Option<&str>, default: T, parse: F) -> Checked<T>
where
    T: ToString,
    F: Fn(&str) -> Option<T>,
{
    let Some(raw) = raw else {
        return Checked { value: default, correction: None };
    };

    match parse(raw) {
        Some(value) => Checked { value, correction: None },
        None => Checked {
            correction: Some(Correction {
                key: key.to_string(),
                value: raw.to_string(),
                using_default: default.to_string(),
            }),
            value: default,
        },
    }
}

/// Integer strictly greater than zero.
pub fn positive_int(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|v| *v > 0)
}

/// Integer greater than or equal to zero.
pub fn non_negative_int(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok()
}

/// Absolute `http`/`https` URL with a host.
pub fn absolute_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Some(url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_good_value() {
        let checked = validate("api.client.timeoutMs", Some("2500"), 10_000, positive_int);
        assert_eq!(checked.value, 2500);
        assert!(!checked.corrected());
    }

    #[test]
    fn test_validate_substitutes_default() {
        let checked = validate("api.client.timeoutMs", Some("soon"), 10_000, positive_int);
        assert_eq!(checked.value, 10_000);
        let correction = checked.correction.unwrap();
        assert_eq!(correction.key, "api.client.timeoutMs");
        assert_eq!(correction.value, "soon");
        assert_eq!(correction.using_default, "10000");
    }

    #[test]
    fn test_missing_value_is_not_a_correction() {
        let checked = validate("api.retry.maxAttempts", None, 3, non_negative_int);
        assert_eq!(checked.value, 3);
        assert!(!checked.corrected());
    }

    #[test]
    fn test_integer_rules() {
        assert_eq!(positive_int(" 42 "), Some(42));
        assert_eq!(positive_int("0"), None);
        assert_eq!(positive_int("-5"), None);
        assert_eq!(positive_int("12abc"), None);
        assert_eq!(non_negative_int("0"), Some(0));
        assert_eq!(non_negative_int("-1"), None);
    }

    #[test]
    fn test_url_rule() {
        assert!(absolute_url("http://localhost:3001/api/orderwise").is_some());
        assert!(absolute_url("https://erp.example.com").is_some());
        assert!(absolute_url("localhost:3001").is_none());
        assert!(absolute_url("/relative/path").is_none());
        assert!(absolute_url("mailto:ops@example.com").is_none());
        assert!(absolute_url("not a url").is_none());
    }

    #[test]
    fn test_default_service_config_is_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.storage.database_url = " ".into();
        config.service.heartbeat_interval_secs = 0;
        config.admin.bind_address = "nowhere".into();
        config.admin.api_key = String::new();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Empty { field: "admin.api_key" }));
    }

    #[test]
    fn test_disabled_admin_is_not_checked() {
        let mut config = ServiceConfig::default();
        config.admin.enabled = false;
        config.admin.bind_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());
    }
}
