//! TRv1 HotStuff vote aggregation
//!
//! This crate holds the vote and certificate data model of a HotStuff-style
//! BFT protocol and the state machine that turns individual validator votes
//! into certificates:
//!
//! - A **Quorum Certificate (QC)** proves that validators holding a quorum
//!   of voting power voted for the same `VoteData`.
//! - A **Timeout Certificate (TC)** proves that a quorum gave up on the same
//!   `(epoch, view)`.
//!
//! # Key Properties
//!
//! - **One vote per author**: a new vote from an author replaces its
//!   previous one, and abandoned partial quorums are pruned.
//! - **Per-signer signing hash**: each validator signs the vote data hash
//!   together with its own timestamp, so a QC's timestamp is the weighted
//!   median of its signers' clocks.
//! - **Edge-triggered formation**: a certificate is reported once, by the
//!   vote that completes it.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                 PendingVotes                  │
//! │  ┌────────────┐ ┌──────────────┐ ┌─────────┐  │
//! │  │ vote_state │ │timeout_vote_ │ │previous_│  │
//! │  │ (QC track) │ │state (TC)    │ │votes    │  │
//! │  └─────┬──────┘ └──────┬───────┘ └─────────┘  │
//! │        └──── ValidationState ───┘             │
//! └──────────────────────┬────────────────────────┘
//!                        │ built by
//!               ┌────────▼────────┐   ┌──────────┐
//!               │  ValidatorSet   │   │  Hasher  │
//!               └─────────────────┘   └──────────┘
//!
//! CertificateVerifier checks signatures of votes, QCs and TCs.
//! ```

pub mod certificate;
pub mod config;
pub mod hasher;
pub mod pending_votes;
pub mod types;
pub mod validation_state;
pub mod validator_set;
pub mod verifier;
pub mod vote;

// Re-exports for convenience
pub use certificate::{
    CertificateError, HighQc, LedgerProof, QuorumCertificate, TimeoutCertificate,
    TimestampedSignature, TimestampedSignatures,
};
pub use config::{ConfigError, VoteConfig};
pub use hasher::{
    signing_hash, vote_data_signing_hash, vote_signing_target, CanonicalEncode, ContentHash,
    Hasher, Sha256Hasher, SigningHash,
};
pub use pending_votes::{PendingVotes, PreviousVote, VoteProcessingResult, VoteRejectedReason};
pub use types::{AccumulatorState, BftHeader, Epoch, LedgerHeader, View, VoteData, VoteTimeout};
pub use validation_state::ValidationState;
pub use validator_set::{ValidatorInfo, ValidatorSet, ValidatorSetError};
pub use verifier::CertificateVerifier;
pub use vote::{Proposal, Vertex, Vote, VoteError};
