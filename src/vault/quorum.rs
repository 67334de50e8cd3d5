//! Quorum threshold derivation
//!
//! The threshold is a pure function of the owner count. It is never
//! adjusted incrementally, only recomputed from the current count.

/// Percentage of owners whose confirmation is required
pub const QUORUM_PERCENT: usize = 60;

/// Required confirmations for `owner_count` owners: `floor(n * 60 / 100)`.
///
/// Integer floor division, no rounding up. With fewer than two owners the
/// threshold is 0 and any tally passes.
pub fn threshold(owner_count: usize) -> usize {
    owner_count * QUORUM_PERCENT / 100
}
