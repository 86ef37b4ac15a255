//! Cryptographic verification of votes and certificates.
//!
//! Every signature in a QC is over a signing hash recomputed with that
//! signer's own timestamp. Timeout signatures are over the content hash of
//! the `VoteTimeout` they give up on. Certificates that pass are remembered
//! per validator set in an LRU cache, so a certificate relayed many times is
//! checked once. Genesis QCs carry no signatures and are accepted only if
//! registered with [`CertificateVerifier::trust_genesis`].

use {
    crate::{
        certificate::{CertificateError, HighQc, QuorumCertificate, TimeoutCertificate},
        config::VoteConfig,
        hasher::{
            vote_data_signing_hash, vote_signing_target, CanonicalEncode, ContentHash, Hasher,
            Sha256Hasher,
        },
        types::VoteTimeout,
        validator_set::ValidatorSet,
        vote::Vote,
    },
    log::*,
    lru::LruCache,
    std::collections::HashSet,
};

/// Verifies signatures on votes and certificates against a validator set.
#[derive(Debug)]
pub struct CertificateVerifier<H: Hasher = Sha256Hasher> {
    hasher: H,
    /// Keyed by [`Self::cache_key`] of a verified certificate and the set it
    /// was verified against.
    verified: LruCache<ContentHash, ()>,
    /// Content hashes of the genesis QCs accepted without signatures.
    trusted_genesis: HashSet<ContentHash>,
}

impl CertificateVerifier<Sha256Hasher> {
    pub fn new(config: &VoteConfig) -> Self {
        Self::with_hasher(Sha256Hasher, config)
    }
}

impl<H: Hasher> CertificateVerifier<H> {
    pub fn with_hasher(hasher: H, config: &VoteConfig) -> Self {
        Self {
            hasher,
            verified: LruCache::new(config.verified_certificates_cache_size.max(1)),
            trusted_genesis: HashSet::new(),
        }
    }

    /// Accept `genesis_qc` in [`Self::verify_qc`] without signatures.
    ///
    /// Register the genesis QC of every epoch whose certificates are checked.
    pub fn trust_genesis(
        &mut self,
        genesis_qc: &QuorumCertificate,
    ) -> Result<(), CertificateError> {
        if !genesis_qc.is_genesis() {
            return Err(CertificateError::NotGenesisQc(genesis_qc.view()));
        }
        let hash = self.hasher.hash(genesis_qc);
        info!("Trusting genesis QC {hash} of epoch {}", genesis_qc.epoch());
        self.trusted_genesis.insert(hash);
        Ok(())
    }

    /// Check a vote's signature and, if present, its timeout signature.
    ///
    /// Membership is not checked here; `PendingVotes` rejects non-members.
    pub fn verify_vote(&self, vote: &Vote) -> bool {
        let author = vote.author();
        let target = vote_signing_target(&self.hasher, vote);
        if !vote.signature().verify(author.as_ref(), target.as_bytes()) {
            warn!("Invalid vote signature from {author} at view {}", vote.view());
            return false;
        }
        if let Some(timeout_signature) = vote.timeout_signature() {
            let target = self.hasher.hash(&vote.vote_timeout());
            if !timeout_signature.verify(author.as_ref(), target.as_bytes()) {
                warn!("Invalid timeout signature from {author} at view {}", vote.view());
                return false;
            }
        }
        true
    }

    /// Check that `qc` carries valid signatures from a quorum of
    /// `validator_set`, or is a trusted genesis QC.
    pub fn verify_qc(&mut self, qc: &QuorumCertificate, validator_set: &ValidatorSet) -> bool {
        let qc_hash = self.hasher.hash(qc);
        if qc.is_genesis() {
            let trusted = self.trusted_genesis.contains(&qc_hash);
            if !trusted {
                warn!("Untrusted genesis QC {qc_hash} at epoch {}", qc.epoch());
            }
            return trusted;
        }
        let key = self.cache_key(&qc_hash, validator_set);
        if self.verified.get(&key).is_some() {
            return true;
        }

        let mut state = validator_set.new_validation_state();
        for (signer, signature) in qc.signatures().iter() {
            if !validator_set.contains_node(signer) {
                warn!("QC at view {} signed by non-validator {signer}", qc.view());
                return false;
            }
            let target =
                vote_data_signing_hash(&self.hasher, qc.vote_data(), signature.timestamp());
            if !signature.signature().verify(signer.as_ref(), target.as_bytes()) {
                warn!("QC at view {} has invalid signature from {signer}", qc.view());
                return false;
            }
            state.add_signature(*signer, signature.timestamp(), *signature.signature());
        }
        if !state.complete() {
            warn!(
                "QC at view {} lacks quorum: {} of {} power",
                qc.view(),
                state.signed_power(),
                state.quorum_power()
            );
            return false;
        }

        self.verified.put(key, ());
        true
    }

    /// Check that `tc` carries valid timeout signatures from a quorum of
    /// `validator_set`.
    pub fn verify_tc(&mut self, tc: &TimeoutCertificate, validator_set: &ValidatorSet) -> bool {
        let key = self.cache_key(&self.hasher.hash(tc), validator_set);
        if self.verified.get(&key).is_some() {
            return true;
        }

        let target = self.hasher.hash(&VoteTimeout::new(tc.epoch(), tc.view()));
        let mut state = validator_set.new_validation_state();
        for (signer, signature) in tc.signatures().iter() {
            if !validator_set.contains_node(signer) {
                warn!("TC at view {} signed by non-validator {signer}", tc.view());
                return false;
            }
            if !signature.signature().verify(signer.as_ref(), target.as_bytes()) {
                warn!("TC at view {} has invalid signature from {signer}", tc.view());
                return false;
            }
            state.add_signature(*signer, signature.timestamp(), *signature.signature());
        }
        if !state.complete() {
            warn!(
                "TC at view {} lacks quorum: {} of {} power",
                tc.view(),
                state.signed_power(),
                state.quorum_power()
            );
            return false;
        }

        self.verified.put(key, ());
        true
    }

    /// Check every certificate in `high_qc`.
    pub fn verify_high_qc(&mut self, high_qc: &HighQc, validator_set: &ValidatorSet) -> bool {
        self.verify_qc(high_qc.highest_qc(), validator_set)
            && self.verify_qc(high_qc.highest_committed_qc(), validator_set)
            && match high_qc.highest_tc() {
                Some(tc) => self.verify_tc(tc, validator_set),
                None => true,
            }
    }

    /// Number of verified certificates currently cached.
    pub fn cached_len(&self) -> usize {
        self.verified.len()
    }

    /// Hash of a certificate's content hash followed by the canonical
    /// encoding of the set it is checked against.
    fn cache_key(
        &self,
        certificate_hash: &ContentHash,
        validator_set: &ValidatorSet,
    ) -> ContentHash {
        let mut buf = certificate_hash.as_bytes().to_vec();
        validator_set.encode_canonical(&mut buf);
        ContentHash::new(self.hasher.hash_bytes(&buf))
    }
}
