//! Pending vote aggregation.
//!
//! [`PendingVotes`] collects votes for the active epoch into quorum and
//! timeout certificates. Each author has at most one effective vote: a new
//! vote replaces the author's previous one, and the previous vote's partial
//! contributions are withdrawn.
//!
//! ```text
//!   Vote ──► membership ──► replace previous ──► QC track ──► TC track
//!                │                 │            (VoteData    (VoteTimeout
//!                ▼                 ▼             hash)        hash)
//!          InvalidAuthor     DuplicateVote          │            │
//!                                                   ▼            ▼
//!                                               QcFormed     TcFormed
//! ```
//!
//! `PendingVotes` is not thread safe. Drive it from a single event loop.

use {
    crate::{
        certificate::{QuorumCertificate, TimeoutCertificate},
        hasher::{ContentHash, Hasher, Sha256Hasher},
        types::{Epoch, View, VoteTimeout},
        validation_state::ValidationState,
        validator_set::ValidatorSet,
        vote::Vote,
    },
    log::*,
    solana_pubkey::Pubkey,
    std::collections::{HashMap, HashSet},
};

/// Why a vote was not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteRejectedReason {
    /// The author is not in the validator set.
    InvalidAuthor,
    /// The author already cast this vote, or changed its vote within the
    /// same view in a way other than adding a timeout signature.
    DuplicateVote,
}

/// Outcome of [`PendingVotes::insert_vote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteProcessingResult {
    Rejected(VoteRejectedReason),
    /// Counted, no new certificate.
    Accepted,
    QcFormed(QuorumCertificate),
    TcFormed(TimeoutCertificate),
}

/// The last vote recorded for an author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviousVote {
    pub view: View,
    pub epoch: Epoch,
    /// Content hash of the vote data.
    pub hash: ContentHash,
    pub is_timeout: bool,
}

/// In-flight vote aggregation for one epoch.
#[derive(Debug)]
pub struct PendingVotes<H: Hasher = Sha256Hasher> {
    hasher: H,
    /// QC track, keyed by vote data hash.
    vote_state: HashMap<ContentHash, ValidationState>,
    /// TC track, keyed by `VoteTimeout` hash.
    timeout_vote_state: HashMap<ContentHash, ValidationState>,
    previous_votes: HashMap<Pubkey, PreviousVote>,
    /// Keys of the states whose certificate has been reported.
    reported_qcs: HashSet<ContentHash>,
    reported_tcs: HashSet<ContentHash>,
}

impl Default for PendingVotes<Sha256Hasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingVotes<Sha256Hasher> {
    pub fn new() -> Self {
        Self::with_hasher(Sha256Hasher)
    }
}

impl<H: Hasher> PendingVotes<H> {
    pub fn with_hasher(hasher: H) -> Self {
        Self {
            hasher,
            vote_state: HashMap::new(),
            timeout_vote_state: HashMap::new(),
            previous_votes: HashMap::new(),
            reported_qcs: HashSet::new(),
            reported_tcs: HashSet::new(),
        }
    }

    /// Count `vote` towards its quorum and timeout certificates.
    ///
    /// `validator_set` must be the set of the vote's epoch. Signatures are
    /// not checked here; callers verify votes before inserting them.
    ///
    /// A certificate is reported once, by the first counted signature that
    /// finds its state complete. If a QC and a TC complete on the same call,
    /// both tracks are updated and the QC is reported; the TC is reported by
    /// the next timeout signature counted for that view.
    pub fn insert_vote(
        &mut self,
        vote: &Vote,
        validator_set: &ValidatorSet,
    ) -> VoteProcessingResult {
        let author = *vote.author();
        if !validator_set.contains_node(&author) {
            warn!(
                "Rejected vote from {author} at epoch {} view {}: not a validator",
                vote.epoch(),
                vote.view()
            );
            return VoteProcessingResult::Rejected(VoteRejectedReason::InvalidAuthor);
        }

        let vote_data_hash = self.hasher.hash(vote.vote_data());
        if !self.replace_previous_vote(author, vote, vote_data_hash) {
            return VoteProcessingResult::Rejected(VoteRejectedReason::DuplicateVote);
        }

        let qc = self.process_vote_for_qc(author, vote, vote_data_hash, validator_set);
        let tc = self.process_vote_for_tc(author, vote, validator_set, qc.is_none());
        match (qc, tc) {
            (Some(qc), _) => VoteProcessingResult::QcFormed(qc),
            (None, Some(tc)) => VoteProcessingResult::TcFormed(tc),
            (None, None) => VoteProcessingResult::Accepted,
        }
    }

    /// Record `vote` as the author's latest and withdraw whatever it
    /// replaces. Returns whether the vote may be counted.
    fn replace_previous_vote(&mut self, author: Pubkey, vote: &Vote, hash: ContentHash) -> bool {
        let this_vote = PreviousVote {
            view: vote.view(),
            epoch: vote.epoch(),
            hash,
            is_timeout: vote.is_timeout(),
        };

        let Some(prior) = self.previous_votes.insert(author, this_vote) else {
            return true;
        };

        if prior == this_vote {
            debug!("Duplicate vote from {author} at view {}", this_vote.view);
            return false;
        }

        self.withdraw(author, &prior);

        if prior.view == this_vote.view {
            // Only adding a timeout signature to the same vote data is allowed.
            let upgrade = this_vote.is_timeout && !prior.is_timeout && this_vote.hash == prior.hash;
            if !upgrade {
                warn!(
                    "Conflicting vote from {author} at view {}: prior {} timeout={}, new {} \
                     timeout={}",
                    this_vote.view,
                    prior.hash,
                    prior.is_timeout,
                    this_vote.hash,
                    this_vote.is_timeout
                );
            }
            upgrade
        } else {
            debug!(
                "Vote from {author} at view {} replaces its vote at view {}",
                this_vote.view, prior.view
            );
            true
        }
    }

    /// Remove `author`'s contributions made by `prior`, dropping states that
    /// become empty.
    fn withdraw(&mut self, author: Pubkey, prior: &PreviousVote) {
        Self::remove_signature(&mut self.vote_state, &prior.hash, &author);
        if prior.is_timeout {
            let timeout_hash = self.hasher.hash(&VoteTimeout::new(prior.epoch, prior.view));
            Self::remove_signature(&mut self.timeout_vote_state, &timeout_hash, &author);
        }
    }

    fn remove_signature(
        states: &mut HashMap<ContentHash, ValidationState>,
        hash: &ContentHash,
        author: &Pubkey,
    ) {
        if let Some(state) = states.get_mut(hash) {
            state.remove_signature(author);
            if state.is_empty() {
                states.remove(hash);
                debug!("Dropped empty validation state {hash}");
            }
        }
    }

    fn process_vote_for_qc(
        &mut self,
        author: Pubkey,
        vote: &Vote,
        vote_data_hash: ContentHash,
        validator_set: &ValidatorSet,
    ) -> Option<QuorumCertificate> {
        let state = self
            .vote_state
            .entry(vote_data_hash)
            .or_insert_with(|| validator_set.new_validation_state());
        if state.add_signature(author, vote.timestamp(), *vote.signature())
            && state.complete()
            && self.reported_qcs.insert(vote_data_hash)
        {
            let signatures = state.signatures();
            info!(
                "Formed QC for {vote_data_hash} at epoch {} view {} with {} signers",
                vote.epoch(),
                vote.view(),
                signatures.count()
            );
            Some(QuorumCertificate::new(vote.vote_data().clone(), signatures))
        } else {
            None
        }
    }

    fn process_vote_for_tc(
        &mut self,
        author: Pubkey,
        vote: &Vote,
        validator_set: &ValidatorSet,
        report: bool,
    ) -> Option<TimeoutCertificate> {
        let timeout_signature = vote.timeout_signature()?;
        let timeout = vote.vote_timeout();
        let timeout_hash = self.hasher.hash(&timeout);
        let state = self
            .timeout_vote_state
            .entry(timeout_hash)
            .or_insert_with(|| validator_set.new_validation_state());
        if state.add_signature(author, vote.timestamp(), *timeout_signature)
            && state.complete()
            && report
            && self.reported_tcs.insert(timeout_hash)
        {
            let signatures = state.signatures();
            info!(
                "Formed TC at epoch {} view {} with {} signers",
                timeout.epoch,
                timeout.view,
                signatures.count()
            );
            Some(TimeoutCertificate::new(timeout.epoch, timeout.view, signatures))
        } else {
            None
        }
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Number of QC-track states, complete ones included.
    pub fn vote_state_len(&self) -> usize {
        self.vote_state.len()
    }

    /// Number of TC-track states, complete ones included.
    pub fn timeout_vote_state_len(&self) -> usize {
        self.timeout_vote_state.len()
    }

    pub fn previous_votes_len(&self) -> usize {
        self.previous_votes.len()
    }

    pub fn previous_vote(&self, author: &Pubkey) -> Option<&PreviousVote> {
        self.previous_votes.get(author)
    }

    /// QC-track state for the vote data with content hash `vote_data_hash`.
    pub fn validation_state(&self, vote_data_hash: &ContentHash) -> Option<&ValidationState> {
        self.vote_state.get(vote_data_hash)
    }

    /// TC-track state for `(epoch, view)`.
    pub fn timeout_validation_state(&self, epoch: Epoch, view: View) -> Option<&ValidationState> {
        let hash = self.hasher.hash(&VoteTimeout::new(epoch, view));
        self.timeout_vote_state.get(&hash)
    }
}
