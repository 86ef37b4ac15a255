//! TRv1 Property-Based Invariant Tests
//!
//! Uses proptest to verify vote aggregation invariants:
//! - At most one effective vote per author
//! - Duplicate votes are idempotent
//! - Completed quorums stay complete
//! - Weighted median timestamp bounds

pub mod consensus_invariants;
