//! Quorum accumulator for one piece of signed content.

use {
    crate::certificate::{TimestampedSignature, TimestampedSignatures},
    solana_pubkey::Pubkey,
    solana_signature::Signature,
    std::{
        collections::{BTreeMap, HashMap},
        sync::Arc,
    },
};

/// Signatures collected so far for a single content hash, either a
/// `VoteData` hash on the QC track or a `VoteTimeout` hash on the TC track.
///
/// Built by [`ValidatorSet::new_validation_state`](crate::validator_set::ValidatorSet::new_validation_state),
/// which fixes the membership, per-node power and quorum threshold.
#[derive(Debug, Clone)]
pub struct ValidationState {
    powers: Arc<HashMap<Pubkey, u64>>,
    quorum_power: u64,
    signed_power: u64,
    signed: BTreeMap<Pubkey, TimestampedSignature>,
}

impl ValidationState {
    pub(crate) fn new(powers: Arc<HashMap<Pubkey, u64>>, quorum_power: u64) -> Self {
        Self {
            powers,
            quorum_power,
            signed_power: 0,
            signed: BTreeMap::new(),
        }
    }

    /// Record a signature from `node`.
    ///
    /// Returns `true` only for the first signature from a member of the set.
    /// A repeat or a non-member leaves the state unchanged.
    pub fn add_signature(&mut self, node: Pubkey, timestamp: i64, signature: Signature) -> bool {
        let Some(&power) = self.powers.get(&node) else {
            return false;
        };
        if self.signed.contains_key(&node) {
            return false;
        }
        self.signed.insert(node, TimestampedSignature::new(timestamp, signature));
        self.signed_power = self.signed_power.saturating_add(power);
        true
    }

    /// Withdraw `node`'s contribution, if any.
    pub fn remove_signature(&mut self, node: &Pubkey) {
        if self.signed.remove(node).is_some() {
            let power = self.powers.get(node).copied().unwrap_or(0);
            self.signed_power = self.signed_power.saturating_sub(power);
        }
    }

    /// Whether the signed power has reached the quorum threshold.
    pub fn complete(&self) -> bool {
        self.signed_power >= self.quorum_power
    }

    pub fn is_empty(&self) -> bool {
        self.signed.is_empty()
    }

    pub fn signed_power(&self) -> u64 {
        self.signed_power
    }

    pub fn quorum_power(&self) -> u64 {
        self.quorum_power
    }

    pub fn contains(&self, node: &Pubkey) -> bool {
        self.signed.contains_key(node)
    }

    /// Snapshot of the current contributions.
    pub fn signatures(&self) -> TimestampedSignatures {
        TimestampedSignatures::new(self.signed.clone())
    }
}
