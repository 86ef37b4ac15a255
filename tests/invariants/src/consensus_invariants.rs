//! Property-based tests for vote aggregation invariants.
//!
//! Properties tested:
//! 1. At most one effective vote per author on each track, and each
//!    certificate is reported at most once.
//! 2. Resubmitting a counted vote is rejected and changes nothing.
//! 3. A completed quorum stays complete and is reported once.
//! 4. The weighted median timestamp splits the signer weight in half.

#[cfg(test)]
mod tests {
    use {
        proptest::prelude::*,
        solana_hash::Hash,
        solana_pubkey::Pubkey,
        solana_signature::Signature,
        std::collections::{BTreeMap, BTreeSet, HashMap, HashSet},
        trv1_consensus_hotstuff::{
            AccumulatorState, BftHeader, ContentHash, Hasher, HighQc, LedgerHeader,
            PendingVotes, QuorumCertificate, Sha256Hasher, TimestampedSignature,
            TimestampedSignatures, ValidatorSet, Vertex, View, Vote, VoteData,
            VoteProcessingResult, VoteRejectedReason,
        },
    };

    // ── Helpers ──

    const NUM_VALIDATORS: usize = 7;
    const MAX_VIEW: u64 = 4;
    const NUM_VERTICES: u8 = 3;

    fn node(i: usize) -> Pubkey {
        let mut bytes = [0u8; 32];
        bytes[0] = i as u8;
        bytes[31] = 0xBB;
        Pubkey::new_from_array(bytes)
    }

    fn make_validator_set(powers: &[u64]) -> (Vec<Pubkey>, ValidatorSet) {
        let pks: Vec<Pubkey> = (0..powers.len()).map(node).collect();
        let vs = ValidatorSet::new(
            pks.iter()
                .zip(powers.iter())
                .map(|(pk, p)| (*pk, *p))
                .collect(),
        )
        .unwrap();
        (pks, vs)
    }

    fn ledger(view: u64) -> LedgerHeader {
        LedgerHeader::create(
            0,
            View::new(view),
            AccumulatorState::new(0, Hash::default()),
            1_000,
        )
    }

    fn high_qc() -> HighQc {
        let vertex = Vertex::genesis(ledger(0));
        HighQc::from_qc(QuorumCertificate::of_genesis(&Sha256Hasher, &vertex, ledger(0)).unwrap())
    }

    fn make_vote_data(view: u64, vertex: u8) -> VoteData {
        let mut id = [0u8; 32];
        id[0] = vertex;
        id[1] = view as u8;
        VoteData::new(
            BftHeader::new(
                View::new(view),
                ContentHash::new(Hash::new_from_array(id)),
                ledger(view),
            ),
            BftHeader::genesis_ancestor(ledger(0)),
            None,
        )
    }

    fn make_vote(author: Pubkey, view: u64, vertex: u8, timeout: bool, high_qc: &HighQc) -> Vote {
        let vote = Vote::new(
            author,
            make_vote_data(view, vertex),
            1_000 + view as i64,
            Signature::default(),
            high_qc.clone(),
            None,
        )
        .unwrap();
        if timeout {
            vote.with_timeout_signature(Signature::default())
        } else {
            vote
        }
    }

    /// Every vote data hash the generated votes can produce.
    fn all_vote_data_hashes() -> Vec<ContentHash> {
        (1..=MAX_VIEW)
            .flat_map(|view| (0..NUM_VERTICES).map(move |vertex| (view, vertex)))
            .map(|(view, vertex)| Sha256Hasher.hash(&make_vote_data(view, vertex)))
            .collect()
    }

    /// (author index, view, vertex, timeout). Index `NUM_VALIDATORS` is not
    /// a validator.
    fn vote_strategy() -> impl Strategy<Value = (usize, u64, u8, bool)> {
        (
            0..=NUM_VALIDATORS,
            1..=MAX_VIEW,
            0..NUM_VERTICES,
            any::<bool>(),
        )
    }

    fn powers() -> impl Strategy<Value = Vec<u64>> {
        prop::collection::vec(1..=100u64, NUM_VALIDATORS)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 1. At most one effective vote per author
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// After any sequence of votes, each author is counted in at most
        /// one QC-track state and one TC-track state, every state's power
        /// is the sum of its signers' power, and no certificate is reported
        /// twice.
        #[test]
        fn one_effective_vote_per_author(
            powers in powers(),
            votes in prop::collection::vec(vote_strategy(), 1..80),
        ) {
            let (pks, vs) = make_validator_set(&powers);
            let high_qc = high_qc();
            let hashes = all_vote_data_hashes();
            let mut pending = PendingVotes::new();
            let mut reported_qcs = HashSet::new();
            let mut reported_tcs = HashSet::new();

            for (author, view, vertex, timeout) in votes {
                let vote = make_vote(node(author), view, vertex, timeout, &high_qc);
                let result = pending.insert_vote(&vote, &vs);
                match &result {
                    VoteProcessingResult::QcFormed(qc) => {
                        let hash = Sha256Hasher.hash(qc.vote_data());
                        prop_assert!(reported_qcs.insert(hash), "QC {} reported twice", hash);
                    }
                    VoteProcessingResult::TcFormed(tc) => {
                        let key = (tc.epoch(), tc.view());
                        prop_assert!(reported_tcs.insert(key), "TC {:?} reported twice", key);
                    }
                    _ => {}
                }
                if author == NUM_VALIDATORS {
                    prop_assert_eq!(
                        result,
                        VoteProcessingResult::Rejected(VoteRejectedReason::InvalidAuthor)
                    );
                    continue;
                }

                let qc_states: Vec<_> =
                    hashes.iter().filter_map(|h| pending.validation_state(h)).collect();
                let tc_states: Vec<_> = (1..=MAX_VIEW)
                    .filter_map(|v| pending.timeout_validation_state(0, View::new(v)))
                    .collect();

                for pk in &pks {
                    let in_qc = qc_states.iter().filter(|s| s.contains(pk)).count();
                    let in_tc = tc_states.iter().filter(|s| s.contains(pk)).count();
                    prop_assert!(in_qc <= 1, "{} counted in {} QC states", pk, in_qc);
                    prop_assert!(in_tc <= 1, "{} counted in {} TC states", pk, in_tc);
                }
                for state in qc_states.iter().chain(tc_states.iter()) {
                    prop_assert!(!state.is_empty(), "empty state left behind");
                    let power: u64 = state
                        .signatures()
                        .signers()
                        .map(|pk| vs.power_of(pk))
                        .sum();
                    prop_assert_eq!(power, state.signed_power());
                }
                prop_assert!(pending.previous_votes_len() <= NUM_VALIDATORS);
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 2. Duplicate votes are idempotent
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn resubmitted_vote_is_duplicate(
            powers in powers(),
            votes in prop::collection::vec(vote_strategy(), 1..60),
        ) {
            let (_, vs) = make_validator_set(&powers);
            let high_qc = high_qc();
            let mut pending = PendingVotes::new();

            for (author, view, vertex, timeout) in votes {
                let vote = make_vote(node(author), view, vertex, timeout, &high_qc);
                if let VoteProcessingResult::Rejected(_) = pending.insert_vote(&vote, &vs) {
                    continue;
                }
                let hash = Sha256Hasher.hash(vote.vote_data());
                let qc_power = pending.validation_state(&hash).map(|s| s.signed_power());
                let tc_power = pending
                    .timeout_validation_state(0, View::new(view))
                    .map(|s| s.signed_power());

                prop_assert_eq!(
                    pending.insert_vote(&vote, &vs),
                    VoteProcessingResult::Rejected(VoteRejectedReason::DuplicateVote)
                );
                prop_assert_eq!(
                    pending.validation_state(&hash).map(|s| s.signed_power()),
                    qc_power
                );
                prop_assert_eq!(
                    pending
                        .timeout_validation_state(0, View::new(view))
                        .map(|s| s.signed_power()),
                    tc_power
                );
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 3. Completed quorums stay complete
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        /// Votes for a single vote data from any authors, in any order and
        /// with repeats: the QC is reported exactly once iff the distinct
        /// signers reach quorum, and the state never leaves completion.
        #[test]
        fn quorum_formed_once_and_stays_complete(
            powers in powers(),
            authors in prop::collection::vec(0..NUM_VALIDATORS, 1..30),
        ) {
            let (pks, vs) = make_validator_set(&powers);
            let high_qc = high_qc();
            let hash = Sha256Hasher.hash(&make_vote_data(1, 0));
            let mut pending = PendingVotes::new();
            let mut formed = 0usize;
            let mut was_complete = false;

            for author in &authors {
                let vote = make_vote(pks[*author], 1, 0, false, &high_qc);
                if let VoteProcessingResult::QcFormed(qc) = pending.insert_vote(&vote, &vs) {
                    formed += 1;
                    let power: u64 = qc.signatures().signers().map(|pk| vs.power_of(pk)).sum();
                    prop_assert!(power >= vs.quorum_power());
                }
                let complete = pending
                    .validation_state(&hash)
                    .map(|s| s.complete())
                    .unwrap_or(false);
                prop_assert!(!was_complete || complete, "completed state lost quorum");
                was_complete = complete;
            }

            let distinct: BTreeSet<usize> = authors.iter().copied().collect();
            let distinct_power: u64 = distinct.iter().map(|i| powers[*i]).sum();
            let expected = usize::from(distinct_power >= vs.quorum_power());
            prop_assert_eq!(formed, expected);
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 4. Weighted median timestamp
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Signers strictly before the median hold at most half the weight;
        /// signers at or before it hold more than half.
        #[test]
        fn weighted_median_splits_weight(
            entries in prop::collection::vec((-1_000i64..1_000, 0..50u64), 0..20),
        ) {
            let weights: HashMap<Pubkey, u64> =
                entries.iter().enumerate().map(|(i, (_, w))| (node(i), *w)).collect();
            let signatures = TimestampedSignatures::new(
                entries
                    .iter()
                    .enumerate()
                    .map(|(i, (ts, _))| {
                        (node(i), TimestampedSignature::new(*ts, Signature::default()))
                    })
                    .collect::<BTreeMap<_, _>>(),
            );

            let total: u64 = entries.iter().map(|(_, w)| *w).sum();
            let median =
                signatures.weighted_timestamp_by(|pk| weights.get(pk).copied().unwrap_or(0));

            match median {
                None => prop_assert_eq!(total, 0),
                Some(m) => {
                    let below: u64 =
                        entries.iter().filter(|(ts, _)| *ts < m).map(|(_, w)| *w).sum();
                    let at_or_below: u64 =
                        entries.iter().filter(|(ts, _)| *ts <= m).map(|(_, w)| *w).sum();
                    prop_assert!(below * 2 <= total);
                    prop_assert!(at_or_below * 2 > total);
                    prop_assert!(entries.iter().any(|(ts, _)| *ts == m));
                }
            }
        }
    }
}
