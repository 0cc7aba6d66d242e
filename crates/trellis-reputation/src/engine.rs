// crates/trellis-reputation/src/engine.rs
//
// Score engine: computes an anchor's trust tree from a graph snapshot.
//
// Algorithm:
// 1. Breadth-first traversal from the anchor over edges whose value is at
//    least the positive threshold. The anchor has rank 0; each identity gets
//    the minimum hop count. A visited set keyed by IdentityId stops cycles
//    and self-loops. Identities at the last rank of the capacity table are
//    not expanded.
// 2. Capacity = table[rank].
// 3. Score(T) = sum over ranked trusters U of capacity(U) * value(U->T) / 100,
//    truncating toward zero. The anchor's own score is its capacity.
//
// Every call is a full recompute; there is no incremental patching.

use std::collections::{HashMap, VecDeque};

use trellis_core::{IdentityId, Score, TrellisError};

use crate::capacity::ScoreConfig;
use crate::tree::TrustTree;
use crate::trust_matrix::TrustView;

/// Computes trust trees under a fixed [`ScoreConfig`].
#[derive(Debug, Clone)]
pub struct ScoreEngine {
    config: ScoreConfig,
}

impl ScoreEngine {
    /// Create an engine, rejecting an invalid configuration.
    pub fn new(config: ScoreConfig) -> Result<Self, TrellisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    /// Recompute the whole trust tree of `anchor`.
    pub fn compute_tree(&self, anchor: &IdentityId, view: &impl TrustView) -> TrustTree {
        let ranks = self.compute_ranks(anchor, view);

        let mut tree = TrustTree::new(anchor.clone());
        // `ranks` is in BFS order, so rank never decreases along it and every
        // truster's capacity is known before its trustees are scored.
        let rank_of: HashMap<&IdentityId, u32> = ranks.iter().map(|(id, r)| (id, *r)).collect();
        for (target, rank) in &ranks {
            let capacity = self.capacity_at(*rank);
            let score = if target == anchor {
                capacity as i32
            } else {
                view.received(target)
                    .into_iter()
                    .filter_map(|(truster, value)| {
                        rank_of
                            .get(truster)
                            .map(|r| self.capacity_at(*r) as i32 * value.get() / 100)
                    })
                    .sum()
            };
            tree.push_ranked(Score {
                anchor: anchor.clone(),
                target: target.clone(),
                score,
                rank: *rank,
                capacity,
            });
        }

        tracing::debug!(
            "Recomputed trust tree of {}: {} identities",
            anchor,
            tree.len()
        );
        tree
    }

    /// Ranked identities in breadth-first order, anchor first.
    fn compute_ranks(&self, anchor: &IdentityId, view: &impl TrustView) -> Vec<(IdentityId, u32)> {
        let max_rank = self.config.max_rank();
        let mut visited: HashMap<IdentityId, u32> = HashMap::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        visited.insert(anchor.clone(), 0);
        order.push((anchor.clone(), 0));
        queue.push_back((anchor.clone(), 0u32));

        while let Some((current, rank)) = queue.pop_front() {
            if rank >= max_rank {
                continue;
            }
            for (trustee, value) in view.given(&current) {
                if value.get() < self.config.positive_threshold || visited.contains_key(trustee) {
                    continue;
                }
                visited.insert(trustee.clone(), rank + 1);
                order.push((trustee.clone(), rank + 1));
                queue.push_back((trustee.clone(), rank + 1));
            }
        }

        order
    }

    fn capacity_at(&self, rank: u32) -> u32 {
        // Ranks come from compute_ranks, which never exceeds max_rank.
        self.config.capacity(rank).unwrap_or(0)
    }
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self {
            config: ScoreConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust_matrix::TrustMatrix;
    use trellis_core::{ScoreSign, TrustValue};

    fn id(n: u8) -> IdentityId {
        format!("{:064x}", n).parse().unwrap()
    }

    fn set(tm: &mut TrustMatrix, from: u8, to: u8, value: i32) {
        tm.set_trust(&id(from), &id(to), TrustValue::try_from(value).unwrap());
    }

    const A: u8 = 1;
    const B: u8 = 2;
    const C: u8 = 3;
    const D: u8 = 4;

    #[test]
    fn lone_anchor_scores_itself() {
        let engine = ScoreEngine::default();
        let tree = engine.compute_tree(&id(A), &TrustMatrix::new());
        assert_eq!(tree.len(), 1);
        let own = tree.get(&id(A)).unwrap();
        assert_eq!((own.rank, own.capacity, own.score), (0, 100, 100));
    }

    #[test]
    fn chain_scores_follow_capacity() {
        let mut tm = TrustMatrix::new();
        set(&mut tm, A, B, 100);
        set(&mut tm, B, C, 50);
        let tree = ScoreEngine::default().compute_tree(&id(A), &tm);

        let b = tree.get(&id(B)).unwrap();
        assert_eq!((b.rank, b.capacity, b.score), (1, 40, 100));
        let c = tree.get(&id(C)).unwrap();
        assert_eq!((c.rank, c.capacity, c.score), (2, 16, 20));
    }

    #[test]
    fn negative_root_edge_removes_downstream_rows() {
        let mut tm = TrustMatrix::new();
        set(&mut tm, A, B, 100);
        set(&mut tm, B, C, 50);
        set(&mut tm, A, B, -10);
        let tree = ScoreEngine::default().compute_tree(&id(A), &tm);
        assert!(!tree.contains(&id(B)));
        assert!(!tree.contains(&id(C)));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn zero_edge_does_not_carry_rank() {
        let mut tm = TrustMatrix::new();
        set(&mut tm, A, B, 0);
        let tree = ScoreEngine::default().compute_tree(&id(A), &tm);
        assert!(matches!(
            tree.get(&id(B)),
            Err(TrellisError::NotInTrustTree { .. })
        ));
    }

    #[test]
    fn distrust_from_ranked_truster_lowers_score() {
        let mut tm = TrustMatrix::new();
        set(&mut tm, A, B, 100);
        set(&mut tm, A, C, 10);
        set(&mut tm, B, C, -100);
        let tree = ScoreEngine::default().compute_tree(&id(A), &tm);
        // 100 * 10 / 100 + 40 * -100 / 100
        assert_eq!(tree.get(&id(C)).unwrap().score, -30);
        let negative: Vec<_> = tree.by_sign(ScoreSign::Negative).map(|s| &s.target).collect();
        assert_eq!(negative, vec![&id(C)]);
    }

    #[test]
    fn rank_is_shortest_path() {
        let mut tm = TrustMatrix::new();
        set(&mut tm, A, B, 10);
        set(&mut tm, B, C, 10);
        set(&mut tm, C, D, 10);
        set(&mut tm, A, D, 10);
        let tree = ScoreEngine::default().compute_tree(&id(A), &tm);
        assert_eq!(tree.get(&id(D)).unwrap().rank, 1);
        // D hears from A (cap 100) and C (cap 16): 10 + 1
        assert_eq!(tree.get(&id(D)).unwrap().score, 11);
    }

    #[test]
    fn cycles_and_self_loops_terminate() {
        let mut tm = TrustMatrix::new();
        set(&mut tm, A, A, 100);
        set(&mut tm, A, B, 100);
        set(&mut tm, B, C, 100);
        set(&mut tm, C, A, 100);
        set(&mut tm, C, B, 100);
        let tree = ScoreEngine::default().compute_tree(&id(A), &tm);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.get(&id(A)).unwrap().score, 100);
        assert_eq!(tree.get(&id(A)).unwrap().rank, 0);
        // B hears from A (100) and C (16)
        assert_eq!(tree.get(&id(B)).unwrap().score, 116);
    }

    #[test]
    fn identities_past_cutoff_are_unreachable() {
        let mut tm = TrustMatrix::new();
        for n in 1..10u8 {
            set(&mut tm, n, n + 1, 100);
        }
        let tree = ScoreEngine::default().compute_tree(&id(1), &tm);
        // Ranks 0..=5 are in the tree.
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.get(&id(6)).unwrap().capacity, 1);
        assert!(!tree.contains(&id(7)));
    }

    #[test]
    fn threshold_filters_weak_edges() {
        let mut tm = TrustMatrix::new();
        set(&mut tm, A, B, 5);
        set(&mut tm, A, C, 50);
        let engine = ScoreEngine::new(ScoreConfig {
            positive_threshold: 10,
            ..ScoreConfig::default()
        })
        .unwrap();
        let tree = engine.compute_tree(&id(A), &tm);
        assert!(!tree.contains(&id(B)));
        assert!(tree.contains(&id(C)));
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut tm = TrustMatrix::new();
        set(&mut tm, A, B, 80);
        set(&mut tm, B, C, 30);
        set(&mut tm, C, D, -40);
        set(&mut tm, B, D, 60);
        let engine = ScoreEngine::default();
        assert_eq!(engine.compute_tree(&id(A), &tm), engine.compute_tree(&id(A), &tm));
    }

    #[test]
    fn capacity_always_matches_rank_on_dense_graph() {
        let mut tm = TrustMatrix::new();
        // Deterministic pseudo-random graph over 30 identities.
        let mut state: u32 = 7;
        for _ in 0..200 {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let from = (state >> 8) % 30;
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let to = (state >> 8) % 30;
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let value = ((state >> 8) % 201) as i32 - 100;
            set(&mut tm, from as u8, to as u8, value);
        }
        let engine = ScoreEngine::default();
        let tree = engine.compute_tree(&id(0), &tm);
        for score in tree.iter() {
            assert_eq!(Some(score.capacity), engine.config().capacity(score.rank));
            if score.target != id(0) {
                // Some ranked truster one rank closer gives positive trust.
                let has_parent = tm.received(&score.target).into_iter().any(|(t, v)| {
                    v.is_positive()
                        && tree.get(t).map(|s| s.rank + 1 == score.rank).unwrap_or(false)
                });
                assert!(has_parent, "{} has no positive parent", score.target);
            }
        }
    }

    #[test]
    fn computed_rows_rebuild_the_same_tree() {
        let mut tm = TrustMatrix::new();
        set(&mut tm, A, B, 100);
        set(&mut tm, A, C, 50);
        set(&mut tm, B, C, 100);
        set(&mut tm, C, B, 100);
        set(&mut tm, C, D, 5);
        let tree = ScoreEngine::default().compute_tree(&id(A), &tm);
        assert_eq!(tree.len(), 4);

        // Stored rows pass the checked insert path: one row per target.
        let rebuilt = TrustTree::from_scores(id(A), tree.iter().cloned()).unwrap();
        assert_eq!(rebuilt, tree);
    }
}
