//! # ltm-dedup
//!
//! Duplicate detection for incoming memories, run by the unified store
//! between embedding generation and the primary write. Three stages,
//! cheapest first:
//!
//! 1. exact match: normalized SHA-256 lookup in the content-hash table,
//! 2. semantic match: single nearest neighbour against the primary,
//!    compared to the similarity threshold,
//! 3. business rules: importance delta, user scoping, and age checks
//!    that can overturn a raw similarity hit.
//!
//! The service fails open: any internal error yields a non-duplicate
//! decision carrying the error in `reason`, so a dedup outage can slow
//! writes down but never block them.

mod rules;
mod service;

pub use rules::RuleOutcome;
pub use service::{DedupCandidate, DedupService};
