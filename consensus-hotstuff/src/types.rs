//! Core value types for HotStuff rounds.
//!
//! Defines views, ledger headers, the BFT header that validators vote on,
//! and the vote data a QC certifies. All values are immutable once built.

use {
    crate::{
        hasher::{CanonicalEncode, ContentHash},
        validator_set::{ValidatorInfo, ValidatorSet, ValidatorSetError},
    },
    serde::{de, Deserialize, Deserializer, Serialize},
    solana_hash::Hash,
    std::fmt,
};

/// Validator-set era. Increases by one at every end-of-epoch header.
pub type Epoch = u64;

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// Round counter within an epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct View(u64);

impl View {
    pub const fn new(number: u64) -> Self {
        Self(number)
    }

    pub const fn genesis() -> Self {
        Self(0)
    }

    pub const fn number(&self) -> u64 {
        self.0
    }

    pub const fn is_genesis(&self) -> bool {
        self.0 == 0
    }

    /// The following view. Saturates at `u64::MAX`.
    pub const fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl CanonicalEncode for View {
    fn encode_canonical(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0.to_be_bytes());
    }
}

// ---------------------------------------------------------------------------
// Ledger types
// ---------------------------------------------------------------------------

/// Cumulative hash over every committed command up to `state_version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccumulatorState {
    state_version: u64,
    accumulator_hash: Hash,
}

impl AccumulatorState {
    pub const fn new(state_version: u64, accumulator_hash: Hash) -> Self {
        Self {
            state_version,
            accumulator_hash,
        }
    }

    pub fn state_version(&self) -> u64 {
        self.state_version
    }

    pub fn accumulator_hash(&self) -> &Hash {
        &self.accumulator_hash
    }
}

impl CanonicalEncode for AccumulatorState {
    fn encode_canonical(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.accumulator_hash.as_ref());
        buf.extend_from_slice(&self.state_version.to_be_bytes());
    }
}

/// Ledger state a vertex commits to.
///
/// A header carrying `next_validator_set` ends its epoch; the validators
/// listed there vote in the following epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerHeader {
    epoch: Epoch,
    view: View,
    accumulator_state: AccumulatorState,
    /// Milliseconds since the Unix epoch.
    timestamp: i64,
    /// Canonically ordered validators of the next epoch. Never empty: the
    /// canonical layout cannot tell an empty list from an absent one.
    #[serde(deserialize_with = "deserialize_next_validator_set")]
    next_validator_set: Option<Vec<ValidatorInfo>>,
}

fn deserialize_next_validator_set<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<ValidatorInfo>>, D::Error>
where
    D: Deserializer<'de>,
{
    let validators = Option::<Vec<ValidatorInfo>>::deserialize(deserializer)?;
    if validators.as_ref().is_some_and(Vec::is_empty) {
        return Err(de::Error::custom("next validator set is empty"));
    }
    Ok(validators)
}

impl LedgerHeader {
    pub fn create(
        epoch: Epoch,
        view: View,
        accumulator_state: AccumulatorState,
        timestamp: i64,
    ) -> Self {
        Self {
            epoch,
            view,
            accumulator_state,
            timestamp,
            next_validator_set: None,
        }
    }

    pub fn create_with_next_validator_set(
        epoch: Epoch,
        view: View,
        accumulator_state: AccumulatorState,
        timestamp: i64,
        next_validator_set: &ValidatorSet,
    ) -> Self {
        Self {
            epoch,
            view,
            accumulator_state,
            timestamp,
            next_validator_set: Some(next_validator_set.iter().cloned().collect()),
        }
    }

    /// Header of the genesis ledger state, which ends epoch 0 and hands over
    /// to `validator_set`.
    pub fn genesis(
        accumulator_state: AccumulatorState,
        validator_set: &ValidatorSet,
        timestamp: i64,
    ) -> Self {
        Self::create_with_next_validator_set(
            0,
            View::genesis(),
            accumulator_state,
            timestamp,
            validator_set,
        )
    }

    /// Same ledger state re-stamped for a later view.
    ///
    /// Vertices built on top of an end-of-epoch header carry the parent's
    /// state forward unchanged apart from view and timestamp.
    pub fn update_view_and_timestamp(&self, view: View, timestamp: i64) -> Self {
        Self {
            view,
            timestamp,
            ..self.clone()
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn accumulator_state(&self) -> &AccumulatorState {
        &self.accumulator_state
    }

    pub fn state_version(&self) -> u64 {
        self.accumulator_state.state_version()
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn is_end_of_epoch(&self) -> bool {
        self.next_validator_set.is_some()
    }

    /// Validators of the next epoch, in canonical order.
    pub fn next_validators(&self) -> Option<&[ValidatorInfo]> {
        self.next_validator_set.as_deref()
    }

    /// Rebuild the next epoch's validator set.
    pub fn next_validator_set(&self) -> Option<Result<ValidatorSet, ValidatorSetError>> {
        self.next_validator_set.as_ref().map(|validators| {
            ValidatorSet::new(validators.iter().map(|v| (v.pubkey, v.power)).collect())
        })
    }
}

impl CanonicalEncode for LedgerHeader {
    fn encode_canonical(&self, buf: &mut Vec<u8>) {
        self.accumulator_state.encode_canonical(buf);
        buf.extend_from_slice(&self.epoch.to_be_bytes());
        self.view.encode_canonical(buf);
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        let validators = self.next_validator_set.as_deref().unwrap_or_default();
        let count = u32::try_from(validators.len()).unwrap_or(u32::MAX);
        buf.extend_from_slice(&count.to_be_bytes());
        for validator in validators {
            buf.extend_from_slice(validator.pubkey.as_ref());
            buf.extend_from_slice(&validator.power.to_be_bytes());
        }
    }
}

// ---------------------------------------------------------------------------
// BFT header and vote data
// ---------------------------------------------------------------------------

/// The unit validators vote on: a vertex at a view with its ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BftHeader {
    view: View,
    vertex_id: ContentHash,
    ledger_header: LedgerHeader,
}

impl BftHeader {
    pub fn new(view: View, vertex_id: ContentHash, ledger_header: LedgerHeader) -> Self {
        Self {
            view,
            vertex_id,
            ledger_header,
        }
    }

    /// Header of the implicit ancestor of the genesis vertex: view 0 and a
    /// zero vertex id.
    pub fn genesis_ancestor(ledger_header: LedgerHeader) -> Self {
        Self::new(View::genesis(), ContentHash::zero(), ledger_header)
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn vertex_id(&self) -> &ContentHash {
        &self.vertex_id
    }

    pub fn ledger_header(&self) -> &LedgerHeader {
        &self.ledger_header
    }
}

impl CanonicalEncode for BftHeader {
    fn encode_canonical(&self, buf: &mut Vec<u8>) {
        self.view.encode_canonical(buf);
        buf.extend_from_slice(self.vertex_id.as_bytes());
        self.ledger_header.encode_canonical(buf);
    }
}

/// What a vote certifies: the proposed header, its parent and, when the
/// three-chain rule is satisfied, the header that a QC on this data commits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteData {
    proposed: BftHeader,
    parent: BftHeader,
    committed: Option<BftHeader>,
}

impl VoteData {
    pub fn new(proposed: BftHeader, parent: BftHeader, committed: Option<BftHeader>) -> Self {
        Self {
            proposed,
            parent,
            committed,
        }
    }

    pub fn proposed(&self) -> &BftHeader {
        &self.proposed
    }

    pub fn parent(&self) -> &BftHeader {
        &self.parent
    }

    pub fn committed(&self) -> Option<&BftHeader> {
        self.committed.as_ref()
    }

    pub fn view(&self) -> View {
        self.proposed.view()
    }

    pub fn epoch(&self) -> Epoch {
        self.proposed.ledger_header().epoch()
    }
}

impl CanonicalEncode for VoteData {
    fn encode_canonical(&self, buf: &mut Vec<u8>) {
        self.proposed.encode_canonical(buf);
        self.parent.encode_canonical(buf);
        match &self.committed {
            Some(committed) => {
                buf.push(1);
                committed.encode_canonical(buf);
            }
            None => buf.push(0),
        }
    }
}

/// The `(epoch, view)` pair a timeout vote gives up on.
///
/// Its content hash keys the timeout track of `PendingVotes` and is what
/// timeout signatures are made over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteTimeout {
    pub epoch: Epoch,
    pub view: View,
}

impl VoteTimeout {
    pub fn new(epoch: Epoch, view: View) -> Self {
        Self { epoch, view }
    }
}

impl CanonicalEncode for VoteTimeout {
    fn encode_canonical(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.epoch.to_be_bytes());
        self.view.encode_canonical(buf);
    }
}
