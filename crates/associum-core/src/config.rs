//! Configuration for associum containers
//!
//! Provides size presets for different workloads and validation for
//! custom configurations.

use crate::error::{AssocError, AssocResult};

/// Hard ceiling for a finite `max_key_arity`.
const ARITY_CEILING: usize = 4096;

/// Container configuration with workload presets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssocConfig {
    /// Maximum number of components in one key (tuple length or field count).
    /// `usize::MAX` means no limit.
    pub max_key_arity: usize,
    /// Maximum number of elements in one array or set value
    pub max_collection_len: usize,
    /// Entries to reserve up front in the entry table
    pub initial_capacity: usize,
}

impl AssocConfig {
    /// General purpose: no limit on key arity or collection length
    pub fn standard() -> Self {
        Self {
            max_key_arity: usize::MAX,
            max_collection_len: usize::MAX,
            initial_capacity: 0,
        }
    }

    /// Small keys and short collections, for many small maps
    pub fn compact() -> Self {
        Self {
            max_key_arity: 16,
            max_collection_len: 4096,
            initial_capacity: 0,
        }
    }

    /// Set `initial_capacity`, keeping the other parameters.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> AssocResult<()> {
        if self.max_key_arity == 0 {
            return Err(invalid("max_key_arity must be > 0"));
        }
        if self.max_key_arity > ARITY_CEILING && self.max_key_arity != usize::MAX {
            return Err(invalid("max_key_arity must be <= 4096 or usize::MAX"));
        }
        if self.max_collection_len == 0 {
            return Err(invalid("max_collection_len must be > 0"));
        }
        if self.initial_capacity > u32::MAX as usize {
            return Err(invalid("initial_capacity must fit the keylet space (u32)"));
        }
        Ok(())
    }

    pub(crate) fn check_arity(&self, arity: usize) -> AssocResult<()> {
        if arity > self.max_key_arity {
            return Err(AssocError::KeyTooWide { arity, limit: self.max_key_arity });
        }
        Ok(())
    }

    pub(crate) fn check_collection_len(&self, len: usize) -> AssocResult<()> {
        if len > self.max_collection_len {
            return Err(AssocError::CollectionTooLong { len, limit: self.max_collection_len });
        }
        Ok(())
    }
}

impl Default for AssocConfig {
    fn default() -> Self { Self::standard() }
}

fn invalid(reason: &str) -> AssocError {
    AssocError::InvalidConfig { reason: reason.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_valid() {
        assert!(AssocConfig::standard().validate().is_ok());
        assert!(AssocConfig::compact().validate().is_ok());
    }

    #[test]
    fn test_default_has_no_limits() {
        let config = AssocConfig::default();
        assert_eq!(config, AssocConfig::standard());
        assert!(config.check_arity(100_000).is_ok());
        assert!(config.check_collection_len(1 << 30).is_ok());
    }

    #[test]
    fn test_preset_ordering() {
        let s = AssocConfig::standard();
        let c = AssocConfig::compact();
        assert!(s.max_key_arity > c.max_key_arity);
        assert!(s.max_collection_len > c.max_collection_len);
    }

    #[test]
    fn test_rejects_zero_limits() {
        let mut config = AssocConfig::standard();
        config.max_key_arity = 0;
        assert!(matches!(config.validate(), Err(AssocError::InvalidConfig { .. })));

        let mut config = AssocConfig::standard();
        config.max_collection_len = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_arity_above_ceiling() {
        let mut config = AssocConfig::standard();
        config.max_key_arity = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_limit_checks() {
        let config = AssocConfig::compact();
        assert!(config.check_arity(16).is_ok());
        assert_eq!(
            config.check_arity(17),
            Err(AssocError::KeyTooWide { arity: 17, limit: 16 })
        );
        assert!(config.check_collection_len(4097).is_err());
    }
}
