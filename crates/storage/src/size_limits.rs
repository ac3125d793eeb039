//! Key and value size bounds for storage backends.
//!
//! A backend built with [`SizeLimits`] checks every write with
//! [`validate_sizes`] before touching its data. CA bundles are small, so the
//! defaults leave plenty of headroom while still rejecting runaway payloads.
//!
//! | Limit | Default |
//! |-------|---------|
//! | `max_key_size` | 512 bytes |
//! | `max_value_size` | 524 288 bytes (512 KiB) |

use crate::{ConfigError, StorageError};

/// Default maximum key size in bytes.
pub const DEFAULT_MAX_KEY_SIZE: usize = 512;

/// Default maximum value size in bytes.
pub const DEFAULT_MAX_VALUE_SIZE: usize = 512 * 1024;

/// Upper bounds for keys and values accepted by a backend.
///
/// ```
/// use keyward_storage::SizeLimits;
///
/// let limits = SizeLimits::new(128, 64 * 1024).unwrap();
/// assert_eq!(limits.max_key_size(), 128);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    max_key_size: usize,
    max_value_size: usize,
}

impl SizeLimits {
    /// Creates size limits with the given bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if either bound is zero.
    pub fn new(max_key_size: usize, max_value_size: usize) -> Result<Self, ConfigError> {
        for (field, value) in [("max_key_size", max_key_size), ("max_value_size", max_value_size)] {
            if value == 0 {
                return Err(ConfigError::BelowMinimum {
                    field,
                    min: "1".into(),
                    value: value.to_string(),
                });
            }
        }
        Ok(Self { max_key_size, max_value_size })
    }

    /// Maximum key size in bytes.
    #[must_use]
    pub fn max_key_size(&self) -> usize {
        self.max_key_size
    }

    /// Maximum value size in bytes.
    #[must_use]
    pub fn max_value_size(&self) -> usize {
        self.max_value_size
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self { max_key_size: DEFAULT_MAX_KEY_SIZE, max_value_size: DEFAULT_MAX_VALUE_SIZE }
    }
}

/// Checks a key/value pair against `limits`.
///
/// # Errors
///
/// Returns [`StorageError::SizeLimitExceeded`] naming the part that is too large.
pub fn validate_sizes(key: &[u8], value: &[u8], limits: &SizeLimits) -> Result<(), StorageError> {
    validate_key_size(key, limits)?;
    if value.len() > limits.max_value_size {
        return Err(StorageError::size_limit_exceeded("value", value.len(), limits.max_value_size));
    }
    Ok(())
}

/// Checks only the key against `limits`.
///
/// # Errors
///
/// Returns [`StorageError::SizeLimitExceeded`] when the key is too large.
pub fn validate_key_size(key: &[u8], limits: &SizeLimits) -> Result<(), StorageError> {
    if key.len() > limits.max_key_size {
        return Err(StorageError::size_limit_exceeded("key", key.len(), limits.max_key_size));
    }
    Ok(())
}
