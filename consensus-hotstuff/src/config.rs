//! Vote aggregation configuration.
//!
//! Defines the quorum ratio applied by validator sets and the size of the
//! verifier's cache of already-checked certificates.

/// Configuration for vote aggregation and certificate verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteConfig {
    /// Numerator of the fraction of total power that a quorum must strictly
    /// exceed.
    /// Default: 2.
    pub quorum_numerator: u64,

    /// Denominator of the quorum fraction.
    /// Default: 3.
    pub quorum_denominator: u64,

    /// Number of verified certificate hashes remembered by a
    /// [`CertificateVerifier`](crate::verifier::CertificateVerifier).
    /// The least recently used entry is evicted first.
    /// Default: 1024.
    pub verified_certificates_cache_size: usize,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            quorum_numerator: 2,
            quorum_denominator: 3,
            verified_certificates_cache_size: 1024,
        }
    }
}

impl VoteConfig {
    /// Minimum power required for a quorum out of `total_power`.
    ///
    /// This is the smallest integer strictly greater than
    /// `total_power * numerator / denominator`. With the default 2/3 ratio
    /// any two quorums share at least one validator as long as fewer than a
    /// third of the power is faulty.
    pub fn quorum_power(&self, total_power: u64) -> u64 {
        let denominator = u128::from(self.quorum_denominator.max(1));
        let bound = u128::from(total_power)
            .saturating_mul(u128::from(self.quorum_numerator))
            / denominator;
        u64::try_from(bound.saturating_add(1)).unwrap_or(u64::MAX)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let numerator = self.quorum_numerator;
        let denominator = self.quorum_denominator;
        // Ratio must lie in [1/2, 1).
        if denominator == 0
            || numerator >= denominator
            || u128::from(numerator) * 2 < u128::from(denominator)
        {
            return Err(ConfigError::InvalidQuorumRatio {
                numerator,
                denominator,
            });
        }
        if self.verified_certificates_cache_size == 0 {
            return Err(ConfigError::InvalidCacheSize);
        }
        Ok(())
    }
}

/// Errors in vote configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("quorum ratio must be in [1/2, 1), got {numerator}/{denominator}")]
    InvalidQuorumRatio { numerator: u64, denominator: u64 },
    #[error("verified_certificates_cache_size must be > 0")]
    InvalidCacheSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VoteConfig::default();
        assert_eq!(config.quorum_numerator, 2);
        assert_eq!(config.quorum_denominator, 3);
        assert_eq!(config.verified_certificates_cache_size, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_quorum_power_two_thirds() {
        let config = VoteConfig::default();
        assert_eq!(config.quorum_power(1), 1);
        assert_eq!(config.quorum_power(3), 3);
        assert_eq!(config.quorum_power(4), 3);
        assert_eq!(config.quorum_power(6), 5);
        assert_eq!(config.quorum_power(7), 5);
        assert_eq!(config.quorum_power(100), 67);
        assert_eq!(config.quorum_power(300), 201);
    }

    #[test]
    fn test_quorum_power_large_total_does_not_overflow() {
        let config = VoteConfig::default();
        let q = config.quorum_power(u64::MAX);
        assert!(q > u64::MAX / 3 * 2);
    }

    #[test]
    fn test_quorum_power_empty_set() {
        // Nothing can reach quorum without power.
        assert_eq!(VoteConfig::default().quorum_power(0), 1);
    }

    #[test]
    fn test_invalid_ratio_below_half() {
        let config = VoteConfig {
            quorum_numerator: 1,
            quorum_denominator: 3,
            ..VoteConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidQuorumRatio { .. })
        ));
    }

    #[test]
    fn test_invalid_ratio_at_one() {
        let config = VoteConfig {
            quorum_numerator: 3,
            quorum_denominator: 3,
            ..VoteConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidQuorumRatio { .. })
        ));
    }

    #[test]
    fn test_invalid_zero_denominator() {
        let config = VoteConfig {
            quorum_numerator: 0,
            quorum_denominator: 0,
            ..VoteConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidQuorumRatio { .. })
        ));
    }

    #[test]
    fn test_half_ratio_is_valid() {
        let config = VoteConfig {
            quorum_numerator: 1,
            quorum_denominator: 2,
            ..VoteConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.quorum_power(4), 3);
    }

    #[test]
    fn test_invalid_cache_size() {
        let config = VoteConfig {
            verified_certificates_cache_size: 0,
            ..VoteConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidCacheSize));
    }
}
