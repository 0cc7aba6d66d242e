// crates/trellis-graph/src/lib.rs
//
// trellis-graph: The trust graph store of the Trellis web of trust.
//
// Holds identities, own identities and trust edges behind one lock, keeps
// one trust tree per own identity consistent with every edge change, and
// provides the bookkeeping the publication scheduler and the document
// importer work through.

pub mod graph;
pub mod identities;
pub mod import;
pub mod publication;
pub mod scores;
pub mod trusts;

pub use graph::{matches_context, TrustGraph, ALL_CONTEXTS};
pub use identities::{
    NewOwnIdentity, INTRODUCTION_CONTEXT, INTRODUCTION_PUZZLE_COUNT,
    INTRODUCTION_PUZZLE_COUNT_PROPERTY,
};
pub use import::ImportOutcome;
pub use publication::PendingInsert;
