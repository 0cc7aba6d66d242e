// crates/trellis-reputation/src/lib.rs
//
// trellis-reputation: Trust matrix, capacity curve, and the rank/score
// engine for the Trellis web of trust.
//
// Scores are always computed per trust anchor (an own identity) as a whole
// TrustTree value from a snapshot of the trust matrix.

pub mod capacity;
pub mod engine;
pub mod tree;
pub mod trust_matrix;

pub use capacity::{ScoreConfig, DEFAULT_CAPACITIES};
pub use engine::ScoreEngine;
pub use tree::TrustTree;
pub use trust_matrix::{TrustMatrix, TrustView};
