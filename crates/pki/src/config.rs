//! Mount-level configuration for the CA lifecycle core.
//!
//! # Example
//!
//! ```
//! use keyward_pki::PkiConfig;
//!
//! let config = PkiConfig::builder().max_pem_bundle_size(64 * 1024).build().unwrap();
//! assert_eq!(config.max_pem_bundle_size(), 64 * 1024);
//!
//! let from_json: PkiConfig = serde_json::from_str(r#"{"max_pem_bundle_size": 4096}"#).unwrap();
//! assert_eq!(from_json.max_pem_bundle_size(), 4096);
//! ```

use keyward_storage::ConfigError;
use serde::{Deserialize, Serialize};

/// Default upper bound on a submitted PEM bundle (256 KiB).
///
/// Half the in-memory backend's default value limit, so an accepted bundle
/// still fits once it is re-encoded as the JSON storage form.
pub const DEFAULT_MAX_PEM_BUNDLE_SIZE: usize = 256 * 1024;

/// Validated PKI mount configuration.
///
/// Deserialization applies the same validation as the builder, so an
/// instance always holds usable values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPkiConfig")]
pub struct PkiConfig {
    max_pem_bundle_size: usize,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPkiConfig {
    #[serde(default = "default_max_pem_bundle_size")]
    max_pem_bundle_size: usize,
}

fn default_max_pem_bundle_size() -> usize {
    DEFAULT_MAX_PEM_BUNDLE_SIZE
}

impl TryFrom<RawPkiConfig> for PkiConfig {
    type Error = ConfigError;

    fn try_from(raw: RawPkiConfig) -> Result<Self, Self::Error> {
        Self::builder().max_pem_bundle_size(raw.max_pem_bundle_size).build()
    }
}

#[bon::bon]
impl PkiConfig {
    /// Creates a configuration.
    ///
    /// # Optional Fields
    ///
    /// * `max_pem_bundle_size` - Largest accepted `pem_bundle`, in bytes
    ///   (default: 256 KiB).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if `max_pem_bundle_size` is zero.
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_MAX_PEM_BUNDLE_SIZE)] max_pem_bundle_size: usize,
    ) -> Result<Self, ConfigError> {
        if max_pem_bundle_size == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "max_pem_bundle_size",
                min: "1".into(),
                value: max_pem_bundle_size.to_string(),
            });
        }
        Ok(Self { max_pem_bundle_size })
    }

    /// Largest accepted PEM bundle, in bytes.
    #[must_use]
    pub fn max_pem_bundle_size(&self) -> usize {
        self.max_pem_bundle_size
    }
}

impl Default for PkiConfig {
    fn default() -> Self {
        Self { max_pem_bundle_size: DEFAULT_MAX_PEM_BUNDLE_SIZE }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default() {
        assert_eq!(PkiConfig::builder().build().unwrap(), PkiConfig::default());
    }

    #[test]
    fn zero_size_is_rejected() {
        let err = PkiConfig::builder().max_pem_bundle_size(0).build().unwrap_err();
        assert_eq!(err.to_string(), "max_pem_bundle_size must be at least 1, got 0");
    }

    #[test]
    fn empty_json_uses_defaults() {
        let config: PkiConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_pem_bundle_size(), DEFAULT_MAX_PEM_BUNDLE_SIZE);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_str::<PkiConfig>(r#"{"max_bundle": 10}"#);
        assert!(result.is_err());
    }

    #[test]
    fn deserialization_validates() {
        let result = serde_json::from_str::<PkiConfig>(r#"{"max_pem_bundle_size": 0}"#);
        assert!(result.unwrap_err().to_string().contains("must be at least 1"));
    }

    #[test]
    fn serializes_field_name() {
        let json = serde_json::to_string(&PkiConfig::default()).unwrap();
        assert_eq!(json, r#"{"max_pem_bundle_size":262144}"#);
    }

    #[test]
    fn json_round_trip_goes_through_validation() {
        let config = PkiConfig::builder().max_pem_bundle_size(4096).build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<PkiConfig>(&json).unwrap(), config);
    }

    #[test]
    fn default_limit_leaves_room_for_the_storage_form() {
        assert!(DEFAULT_MAX_PEM_BUNDLE_SIZE * 2 <= keyward_storage::DEFAULT_MAX_VALUE_SIZE);
    }
}
