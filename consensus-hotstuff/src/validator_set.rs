//! Weighted validator set management.
//!
//! Maintains an ordered set of validators with their voting power for one
//! epoch. Used for membership checks, quorum calculations and as the factory
//! for [`ValidationState`]s.

use {
    crate::{
        config::{ConfigError, VoteConfig},
        hasher::CanonicalEncode,
        validation_state::ValidationState,
    },
    serde::{Deserialize, Serialize},
    solana_pubkey::Pubkey,
    std::{collections::HashMap, sync::Arc},
};

/// A single validator with its voting power.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub pubkey: Pubkey,
    pub power: u64,
}

/// An ordered, weighted set of validators.
///
/// Validators are sorted by (power descending, pubkey ascending) to ensure
/// deterministic ordering across all nodes. The set is immutable; a new
/// epoch gets a new set.
#[derive(Debug, Clone)]
pub struct ValidatorSet {
    /// Validators sorted by power (descending), then pubkey (ascending) for ties.
    validators: Vec<ValidatorInfo>,
    /// Power lookup, shared with every `ValidationState` built from this set.
    powers: Arc<HashMap<Pubkey, u64>>,
    /// Sum of all validator power.
    total_power: u64,
    /// Minimum accumulated power for a quorum.
    quorum_power: u64,
}

impl ValidatorSet {
    /// Create a new validator set from a list of (pubkey, power) pairs using
    /// the default quorum ratio.
    pub fn new(validators: Vec<(Pubkey, u64)>) -> Result<Self, ValidatorSetError> {
        Self::with_config(validators, &VoteConfig::default())
    }

    /// Create a new validator set whose quorum follows `config`.
    ///
    /// Validators with zero power are dropped. A pubkey listed twice keeps
    /// its last power.
    pub fn with_config(
        validators: Vec<(Pubkey, u64)>,
        config: &VoteConfig,
    ) -> Result<Self, ValidatorSetError> {
        config.validate()?;
        let powers: HashMap<Pubkey, u64> = validators
            .into_iter()
            .filter(|(_, power)| *power > 0)
            .collect();
        if powers.is_empty() {
            return Err(ValidatorSetError::Empty);
        }

        let mut infos: Vec<ValidatorInfo> = powers
            .iter()
            .map(|(pubkey, power)| ValidatorInfo {
                pubkey: *pubkey,
                power: *power,
            })
            .collect();
        // Sort by power descending, then pubkey ascending for determinism
        infos.sort_by(|a, b| b.power.cmp(&a.power).then_with(|| a.pubkey.cmp(&b.pubkey)));

        let total_power = infos
            .iter()
            .try_fold(0u64, |acc, v| acc.checked_add(v.power))
            .ok_or(ValidatorSetError::PowerOverflow)?;

        Ok(Self {
            validators: infos,
            powers: Arc::new(powers),
            total_power,
            quorum_power: config.quorum_power(total_power),
        })
    }

    /// Returns the number of validators.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Returns true if the validator set is empty.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Returns total power across all validators.
    pub fn total_power(&self) -> u64 {
        self.total_power
    }

    /// Returns the minimum power required for a quorum.
    pub fn quorum_power(&self) -> u64 {
        self.quorum_power
    }

    /// Returns the validator at the given index.
    pub fn get(&self, index: usize) -> Option<&ValidatorInfo> {
        self.validators.get(index)
    }

    /// Returns the power of a validator, or 0 if not in the set.
    pub fn power_of(&self, pubkey: &Pubkey) -> u64 {
        self.powers.get(pubkey).copied().unwrap_or(0)
    }

    /// Check whether a validator is in the set.
    pub fn contains_node(&self, pubkey: &Pubkey) -> bool {
        self.powers.contains_key(pubkey)
    }

    /// Returns an iterator over all validators in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &ValidatorInfo> {
        self.validators.iter()
    }

    /// Returns all validator pubkeys in deterministic order.
    pub fn nodes(&self) -> Vec<Pubkey> {
        self.validators.iter().map(|v| v.pubkey).collect()
    }

    /// Start accumulating signatures for one piece of signed content under
    /// this set's membership and quorum.
    pub fn new_validation_state(&self) -> ValidationState {
        ValidationState::new(Arc::clone(&self.powers), self.quorum_power)
    }
}

/// Validators in canonical order followed by the quorum threshold. Sets
/// with equal encodings accept the same certificates.
impl CanonicalEncode for ValidatorSet {
    fn encode_canonical(&self, buf: &mut Vec<u8>) {
        let count = u32::try_from(self.validators.len()).unwrap_or(u32::MAX);
        buf.extend_from_slice(&count.to_be_bytes());
        for validator in &self.validators {
            buf.extend_from_slice(validator.pubkey.as_ref());
            buf.extend_from_slice(&validator.power.to_be_bytes());
        }
        buf.extend_from_slice(&self.quorum_power.to_be_bytes());
    }
}

/// Errors building a validator set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidatorSetError {
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
    #[error("validator set has no validator with non-zero power")]
    Empty,
    #[error("total validator power overflows u64")]
    PowerOverflow,
}
