//! Signature sets and the certificates built from them.
//!
//! A [`QuorumCertificate`] proves a quorum voted for one `VoteData`; a
//! [`TimeoutCertificate`] proves a quorum gave up on one `(epoch, view)`.
//! Each signer's entry carries the timestamp that signer bound into its
//! signing hash, so certificates are checked signer by signer.

use {
    crate::{
        hasher::{CanonicalEncode, ContentHash, Hasher},
        types::{AccumulatorState, BftHeader, Epoch, LedgerHeader, View, VoteData},
        validator_set::{ValidatorSet, ValidatorSetError},
        vote::Vertex,
    },
    serde::{Deserialize, Serialize},
    solana_pubkey::Pubkey,
    solana_signature::Signature,
    std::{cmp::Ordering, collections::BTreeMap},
};

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// A signature together with the timestamp its signer bound into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimestampedSignature {
    timestamp: i64,
    signature: Signature,
}

impl TimestampedSignature {
    pub fn new(timestamp: i64, signature: Signature) -> Self {
        Self {
            timestamp,
            signature,
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// Signatures of a certificate keyed by signer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimestampedSignatures {
    signatures: BTreeMap<Pubkey, TimestampedSignature>,
}

impl TimestampedSignatures {
    pub fn new(signatures: BTreeMap<Pubkey, TimestampedSignature>) -> Self {
        Self { signatures }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn get(&self, signer: &Pubkey) -> Option<&TimestampedSignature> {
        self.signatures.get(signer)
    }

    pub fn contains(&self, signer: &Pubkey) -> bool {
        self.signatures.contains_key(signer)
    }

    /// Entries in signer order.
    pub fn iter(&self) -> impl Iterator<Item = (&Pubkey, &TimestampedSignature)> {
        self.signatures.iter()
    }

    pub fn signers(&self) -> impl Iterator<Item = &Pubkey> {
        self.signatures.keys()
    }

    /// Weighted median of the signers' timestamps, every signer weighing one.
    ///
    /// Returns `None` when there are no signatures.
    pub fn weighted_timestamp(&self) -> Option<i64> {
        self.weighted_timestamp_by(|_| 1)
    }

    /// Weighted median of the signers' timestamps.
    ///
    /// Entries are sorted by timestamp; the result is the timestamp at which
    /// the cumulative weight first exceeds half of the total. Returns `None`
    /// when the total weight is zero.
    pub fn weighted_timestamp_by<F>(&self, weight: F) -> Option<i64>
    where
        F: Fn(&Pubkey) -> u64,
    {
        let mut entries: Vec<(i64, u128)> = self
            .signatures
            .iter()
            .map(|(signer, sig)| (sig.timestamp, u128::from(weight(signer))))
            .collect();
        let total: u128 = entries.iter().map(|(_, w)| *w).sum();
        if total == 0 {
            return None;
        }
        entries.sort_unstable_by_key(|(timestamp, _)| *timestamp);

        let mut cumulative = 0u128;
        for (timestamp, w) in entries {
            cumulative = cumulative.saturating_add(w);
            if cumulative.saturating_mul(2) > total {
                return Some(timestamp);
            }
        }
        None
    }
}

impl CanonicalEncode for TimestampedSignatures {
    fn encode_canonical(&self, buf: &mut Vec<u8>) {
        let count = u32::try_from(self.signatures.len()).unwrap_or(u32::MAX);
        buf.extend_from_slice(&count.to_be_bytes());
        for (signer, sig) in &self.signatures {
            buf.extend_from_slice(signer.as_ref());
            buf.extend_from_slice(&sig.timestamp.to_be_bytes());
            buf.extend_from_slice(sig.signature.as_ref());
        }
    }
}

// ---------------------------------------------------------------------------
// Quorum certificate
// ---------------------------------------------------------------------------

/// Proof that a quorum of validators voted for one `VoteData`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuorumCertificate {
    vote_data: VoteData,
    signatures: TimestampedSignatures,
}

impl QuorumCertificate {
    pub fn new(vote_data: VoteData, signatures: TimestampedSignatures) -> Self {
        Self {
            vote_data,
            signatures,
        }
    }

    /// Self-certifying QC for the genesis vertex.
    ///
    /// The vertex must be at view 0. The QC's proposed, parent and committed
    /// headers are all the genesis header and it carries no signatures.
    pub fn of_genesis<H: Hasher + ?Sized>(
        hasher: &H,
        genesis_vertex: &Vertex,
        ledger_header: LedgerHeader,
    ) -> Result<Self, CertificateError> {
        let view = genesis_vertex.view();
        if !view.is_genesis() {
            return Err(CertificateError::NotGenesisView(view));
        }
        let header = BftHeader::new(view, genesis_vertex.id(hasher), ledger_header);
        let vote_data = VoteData::new(header.clone(), header.clone(), Some(header));
        Ok(Self::new(vote_data, TimestampedSignatures::empty()))
    }

    pub fn vote_data(&self) -> &VoteData {
        &self.vote_data
    }

    pub fn signatures(&self) -> &TimestampedSignatures {
        &self.signatures
    }

    pub fn proposed(&self) -> &BftHeader {
        self.vote_data.proposed()
    }

    pub fn parent(&self) -> &BftHeader {
        self.vote_data.parent()
    }

    pub fn committed(&self) -> Option<&BftHeader> {
        self.vote_data.committed()
    }

    pub fn view(&self) -> View {
        self.vote_data.view()
    }

    pub fn epoch(&self) -> Epoch {
        self.vote_data.epoch()
    }

    pub fn signers(&self) -> impl Iterator<Item = &Pubkey> {
        self.signatures.signers()
    }

    /// Median of the signers' timestamps; `None` for a genesis QC.
    pub fn weighted_timestamp(&self) -> Option<i64> {
        self.signatures.weighted_timestamp()
    }

    /// Whether this is a genesis QC: view 0 with all three headers equal.
    pub fn is_genesis(&self) -> bool {
        let proposed = self.vote_data.proposed();
        proposed.view().is_genesis()
            && proposed == self.vote_data.parent()
            && self.vote_data.committed() == Some(proposed)
    }

    /// The header this QC commits and a ledger proof for it.
    ///
    /// The proof's opaque hash is the content hash of the vote data, not any
    /// signer's signing hash.
    pub fn committed_proof<H: Hasher + ?Sized>(
        &self,
        hasher: &H,
    ) -> Option<(BftHeader, LedgerProof)> {
        self.vote_data.committed().map(|committed| {
            let proof = LedgerProof::new(
                hasher.hash(&self.vote_data),
                committed.ledger_header().clone(),
                self.signatures.clone(),
            );
            (committed.clone(), proof)
        })
    }
}

impl CanonicalEncode for QuorumCertificate {
    fn encode_canonical(&self, buf: &mut Vec<u8>) {
        self.vote_data.encode_canonical(buf);
        self.signatures.encode_canonical(buf);
    }
}

// ---------------------------------------------------------------------------
// Timeout certificate
// ---------------------------------------------------------------------------

/// Proof that a quorum of validators timed out on one `(epoch, view)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeoutCertificate {
    epoch: Epoch,
    view: View,
    signatures: TimestampedSignatures,
}

impl TimeoutCertificate {
    pub fn new(epoch: Epoch, view: View, signatures: TimestampedSignatures) -> Self {
        Self {
            epoch,
            view,
            signatures,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn signatures(&self) -> &TimestampedSignatures {
        &self.signatures
    }

    pub fn signers(&self) -> impl Iterator<Item = &Pubkey> {
        self.signatures.signers()
    }

    pub fn weighted_timestamp(&self) -> Option<i64> {
        self.signatures.weighted_timestamp()
    }
}

impl CanonicalEncode for TimeoutCertificate {
    fn encode_canonical(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.epoch.to_be_bytes());
        self.view.encode_canonical(buf);
        self.signatures.encode_canonical(buf);
    }
}

// ---------------------------------------------------------------------------
// High QC
// ---------------------------------------------------------------------------

/// The most advanced certificates a node knows of, sent along with its
/// votes and proposals so peers can catch up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HighQc {
    highest_qc: QuorumCertificate,
    highest_committed_qc: QuorumCertificate,
    highest_tc: Option<TimeoutCertificate>,
}

impl HighQc {
    pub fn from(
        highest_qc: QuorumCertificate,
        highest_committed_qc: QuorumCertificate,
        highest_tc: Option<TimeoutCertificate>,
    ) -> Self {
        Self {
            highest_qc,
            highest_committed_qc,
            highest_tc,
        }
    }

    /// A high QC where one certificate is both the highest and the highest
    /// committed, as at genesis.
    pub fn from_qc(qc: QuorumCertificate) -> Self {
        Self::from(qc.clone(), qc, None)
    }

    pub fn highest_qc(&self) -> &QuorumCertificate {
        &self.highest_qc
    }

    pub fn highest_committed_qc(&self) -> &QuorumCertificate {
        &self.highest_committed_qc
    }

    pub fn highest_tc(&self) -> Option<&TimeoutCertificate> {
        self.highest_tc.as_ref()
    }

    /// Highest view certified by either the QC or the TC.
    pub fn highest_view(&self) -> View {
        let qc_view = self.highest_qc.view();
        match &self.highest_tc {
            Some(tc) if tc.view() > qc_view => tc.view(),
            _ => qc_view,
        }
    }

    /// View of the header committed by the highest committed QC.
    pub fn highest_committed_view(&self) -> Option<View> {
        self.highest_committed_qc.committed().map(BftHeader::view)
    }
}

// ---------------------------------------------------------------------------
// Ledger proof
// ---------------------------------------------------------------------------

/// Signed checkpoint of committed ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerProof {
    /// Content hash of the vote data whose QC committed this header.
    opaque: ContentHash,
    ledger_header: LedgerHeader,
    signatures: TimestampedSignatures,
}

impl LedgerProof {
    pub fn new(
        opaque: ContentHash,
        ledger_header: LedgerHeader,
        signatures: TimestampedSignatures,
    ) -> Self {
        Self {
            opaque,
            ledger_header,
            signatures,
        }
    }

    /// Proof of the genesis state. Nobody signs it.
    pub fn genesis(
        accumulator_state: AccumulatorState,
        validator_set: &ValidatorSet,
        timestamp: i64,
    ) -> Self {
        Self::new(
            ContentHash::zero(),
            LedgerHeader::genesis(accumulator_state, validator_set, timestamp),
            TimestampedSignatures::empty(),
        )
    }

    pub fn opaque(&self) -> &ContentHash {
        &self.opaque
    }

    pub fn ledger_header(&self) -> &LedgerHeader {
        &self.ledger_header
    }

    pub fn signatures(&self) -> &TimestampedSignatures {
        &self.signatures
    }

    pub fn epoch(&self) -> Epoch {
        self.ledger_header.epoch()
    }

    pub fn view(&self) -> View {
        self.ledger_header.view()
    }

    pub fn state_version(&self) -> u64 {
        self.ledger_header.state_version()
    }

    pub fn accumulator_state(&self) -> &AccumulatorState {
        self.ledger_header.accumulator_state()
    }

    pub fn is_end_of_epoch(&self) -> bool {
        self.ledger_header.is_end_of_epoch()
    }

    pub fn next_validator_set(&self) -> Option<Result<ValidatorSet, ValidatorSetError>> {
        self.ledger_header.next_validator_set()
    }

    /// Order proofs by epoch, then state version, then end-of-epoch last.
    pub fn cmp_by_epoch_and_version(&self, other: &Self) -> Ordering {
        self.epoch()
            .cmp(&other.epoch())
            .then_with(|| self.state_version().cmp(&other.state_version()))
            .then_with(|| self.is_end_of_epoch().cmp(&other.is_end_of_epoch()))
    }
}

/// Errors building certificates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CertificateError {
    #[error("genesis QC requires a vertex at view 0, got view {0}")]
    NotGenesisView(View),
    #[error("QC at view {0} is not a genesis QC")]
    NotGenesisQc(View),
}
