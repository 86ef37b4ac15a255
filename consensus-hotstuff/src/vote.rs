//! Votes, vertices and proposals.
//!
//! A [`Vote`] is one validator's signed opinion on a [`VoteData`], optionally
//! upgraded with a timeout signature over the `(epoch, view)` it gives up
//! on. A [`Proposal`] carries a [`Vertex`] signed by its leader.

use {
    crate::{
        certificate::{HighQc, QuorumCertificate, TimeoutCertificate, TimestampedSignatures},
        hasher::{vote_data_signing_hash, CanonicalEncode, ContentHash, Hasher},
        types::{BftHeader, Epoch, LedgerHeader, View, VoteData, VoteTimeout},
    },
    serde::{Deserialize, Serialize},
    solana_keypair::Keypair,
    solana_pubkey::Pubkey,
    solana_signature::Signature,
    solana_signer::Signer,
};

// ---------------------------------------------------------------------------
// Vote
// ---------------------------------------------------------------------------

/// A single validator's vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    author: Pubkey,
    vote_data: VoteData,
    /// Milliseconds since the Unix epoch, bound into `signature`.
    timestamp: i64,
    signature: Signature,
    high_qc: HighQc,
    timeout_signature: Option<Signature>,
}

impl Vote {
    /// Assemble a vote from already computed signatures.
    pub fn new(
        author: Pubkey,
        vote_data: VoteData,
        timestamp: i64,
        signature: Signature,
        high_qc: HighQc,
        timeout_signature: Option<Signature>,
    ) -> Result<Self, VoteError> {
        if timestamp <= 0 {
            return Err(VoteError::NonPositiveTimestamp(timestamp));
        }
        Ok(Self {
            author,
            vote_data,
            timestamp,
            signature,
            high_qc,
            timeout_signature,
        })
    }

    /// Cast a vote on `vote_data`, signing its signing hash at `timestamp`.
    pub fn sign<H: Hasher + ?Sized>(
        hasher: &H,
        keypair: &Keypair,
        vote_data: VoteData,
        timestamp: i64,
        high_qc: HighQc,
    ) -> Result<Self, VoteError> {
        let target = vote_data_signing_hash(hasher, &vote_data, timestamp);
        let signature = keypair.sign_message(target.as_bytes());
        Self::new(
            keypair.pubkey(),
            vote_data,
            timestamp,
            signature,
            high_qc,
            None,
        )
    }

    /// The same vote carrying `timeout_signature`.
    pub fn with_timeout_signature(self, timeout_signature: Signature) -> Self {
        Self {
            timeout_signature: Some(timeout_signature),
            ..self
        }
    }

    /// Upgrade this vote to a timeout vote signed by `keypair`.
    pub fn sign_timeout<H: Hasher + ?Sized>(self, hasher: &H, keypair: &Keypair) -> Self {
        let target = hasher.hash(&self.vote_timeout());
        let signature = keypair.sign_message(target.as_bytes());
        self.with_timeout_signature(signature)
    }

    pub fn author(&self) -> &Pubkey {
        &self.author
    }

    pub fn vote_data(&self) -> &VoteData {
        &self.vote_data
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn high_qc(&self) -> &HighQc {
        &self.high_qc
    }

    pub fn timeout_signature(&self) -> Option<&Signature> {
        self.timeout_signature.as_ref()
    }

    pub fn is_timeout(&self) -> bool {
        self.timeout_signature.is_some()
    }

    /// View of the proposed header.
    pub fn view(&self) -> View {
        self.vote_data.view()
    }

    pub fn epoch(&self) -> Epoch {
        self.vote_data.epoch()
    }

    /// The `(epoch, view)` a timeout signature on this vote covers.
    pub fn vote_timeout(&self) -> VoteTimeout {
        VoteTimeout::new(self.epoch(), self.view())
    }
}

/// Errors building a vote.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoteError {
    #[error("vote timestamp must be positive, got {0}")]
    NonPositiveTimestamp(i64),
}

// ---------------------------------------------------------------------------
// Vertex
// ---------------------------------------------------------------------------

/// A block in the BFT chain: a QC on its parent plus the commands it adds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    qc: QuorumCertificate,
    view: View,
    transactions: Vec<Vec<u8>>,
    proposer: Option<Pubkey>,
}

impl Vertex {
    pub fn new(
        qc: QuorumCertificate,
        view: View,
        transactions: Vec<Vec<u8>>,
        proposer: Pubkey,
    ) -> Self {
        Self {
            qc,
            view,
            transactions,
            proposer: Some(proposer),
        }
    }

    /// The genesis vertex at view 0.
    ///
    /// Its QC certifies the genesis ancestor header for all three of
    /// proposed, parent and committed. No one proposes it.
    pub fn genesis(ledger_header: LedgerHeader) -> Self {
        let header = BftHeader::genesis_ancestor(ledger_header);
        let vote_data = VoteData::new(header.clone(), header.clone(), Some(header));
        Self {
            qc: QuorumCertificate::new(vote_data, TimestampedSignatures::empty()),
            view: View::genesis(),
            transactions: Vec::new(),
            proposer: None,
        }
    }

    /// Content hash identifying this vertex.
    pub fn id<H: Hasher + ?Sized>(&self, hasher: &H) -> ContentHash {
        hasher.hash(self)
    }

    pub fn qc(&self) -> &QuorumCertificate {
        &self.qc
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn epoch(&self) -> Epoch {
        self.qc.epoch()
    }

    pub fn parent_id(&self) -> &ContentHash {
        self.qc.proposed().vertex_id()
    }

    pub fn transactions(&self) -> &[Vec<u8>] {
        &self.transactions
    }

    pub fn proposer(&self) -> Option<&Pubkey> {
        self.proposer.as_ref()
    }
}

impl CanonicalEncode for Vertex {
    fn encode_canonical(&self, buf: &mut Vec<u8>) {
        self.qc.encode_canonical(buf);
        self.view.encode_canonical(buf);
        let count = u32::try_from(self.transactions.len()).unwrap_or(u32::MAX);
        buf.extend_from_slice(&count.to_be_bytes());
        for txn in &self.transactions {
            let len = u32::try_from(txn.len()).unwrap_or(u32::MAX);
            buf.extend_from_slice(&len.to_be_bytes());
            buf.extend_from_slice(txn);
        }
        match &self.proposer {
            Some(proposer) => {
                buf.push(1);
                buf.extend_from_slice(proposer.as_ref());
            }
            None => buf.push(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Proposal
// ---------------------------------------------------------------------------

/// A leader's signed vertex for its view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    vertex: Vertex,
    committed_qc: QuorumCertificate,
    /// Signature over the vertex id.
    signature: Signature,
    highest_tc: Option<TimeoutCertificate>,
}

impl Proposal {
    /// Build a proposal. `highest_tc` is kept only if it is for a later view
    /// than the vertex's QC; otherwise it adds nothing and is dropped.
    pub fn new(
        vertex: Vertex,
        committed_qc: QuorumCertificate,
        signature: Signature,
        highest_tc: Option<TimeoutCertificate>,
    ) -> Self {
        let qc_view = vertex.qc().view();
        let highest_tc = highest_tc.filter(|tc| tc.view() > qc_view);
        Self {
            vertex,
            committed_qc,
            signature,
            highest_tc,
        }
    }

    /// Sign `vertex` with the leader's `keypair` and build the proposal.
    pub fn sign<H: Hasher + ?Sized>(
        hasher: &H,
        keypair: &Keypair,
        vertex: Vertex,
        committed_qc: QuorumCertificate,
        highest_tc: Option<TimeoutCertificate>,
    ) -> Self {
        let signature = keypair.sign_message(vertex.id(hasher).as_bytes());
        Self::new(vertex, committed_qc, signature, highest_tc)
    }

    pub fn vertex(&self) -> &Vertex {
        &self.vertex
    }

    pub fn committed_qc(&self) -> &QuorumCertificate {
        &self.committed_qc
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn highest_tc(&self) -> Option<&TimeoutCertificate> {
        self.highest_tc.as_ref()
    }

    pub fn author(&self) -> Option<&Pubkey> {
        self.vertex.proposer()
    }

    pub fn view(&self) -> View {
        self.vertex.view()
    }

    pub fn epoch(&self) -> Epoch {
        self.vertex.epoch()
    }

    /// Certificates this proposal lets a receiver catch up to.
    pub fn high_qc(&self) -> HighQc {
        HighQc::from(
            self.vertex.qc().clone(),
            self.committed_qc.clone(),
            self.highest_tc.clone(),
        )
    }
}
