//! Item-item cosine similarity.
//!
//! Each item is a vector over users. Pairwise dot products are accumulated
//! from user rows, so the cost is the sum over users of their degree squared
//! rather than `n_items² × n_users`. The result is stored dense, which caps
//! practical catalog size at a few tens of thousands of interacted items.

use super::aggregate::InteractionMatrix;
use crate::math::{cosine_from_parts, l2_norm};

/// Dense symmetric item × item similarity matrix
#[derive(Debug, Clone, Default)]
pub struct ItemSimilarity {
    n_items: usize,
    values: Vec<f32>,
}

impl ItemSimilarity {
    /// Compute cosine similarity between every pair of item columns
    pub fn build(matrix: &InteractionMatrix) -> Self {
        let n = matrix.n_items();
        if n == 0 {
            return Self::default();
        }
        if n == 1 {
            return Self {
                n_items: 1,
                values: vec![1.0],
            };
        }

        let norms: Vec<f32> = matrix.item_vectors().iter().map(|v| l2_norm(v)).collect();

        let mut dots = vec![0.0f32; n * n];
        for user in 0..matrix.n_users() {
            let row = matrix.row(user);
            for (a, &(i, vi)) in row.iter().enumerate() {
                for &(j, vj) in &row[a..] {
                    let product = vi * vj;
                    dots[i * n + j] += product;
                    if i != j {
                        dots[j * n + i] += product;
                    }
                }
            }
        }

        let values = dots
            .iter()
            .enumerate()
            .map(|(cell, &dot)| cosine_from_parts(dot, norms[cell / n], norms[cell % n]))
            .collect();

        Self { n_items: n, values }
    }

    pub fn n_items(&self) -> usize {
        self.n_items
    }

    pub fn is_empty(&self) -> bool {
        self.n_items == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[i * self.n_items + j]
    }

    /// Similarities of item `i` to every item, indexed by item
    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.n_items;
        &self.values[start..start + self.n_items]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::sparse_cosine;
    use crate::recommend::aggregate::InteractionAggregator;
    use crate::types::InteractionEvent;

    const NOW: i64 = 1_750_000_000;

    fn build(events: &[InteractionEvent]) -> (ItemSimilarity, crate::recommend::AggregatedInteractions) {
        let agg = InteractionAggregator::new(0.1, 90).aggregate(events, NOW);
        (ItemSimilarity::build(&agg.matrix), agg)
    }

    fn sample_events() -> Vec<InteractionEvent> {
        vec![
            InteractionEvent::new("u1", "v1", "view", NOW),
            InteractionEvent::new("u1", "v2", "contact", NOW),
            InteractionEvent::new("u2", "v1", "view", NOW),
            InteractionEvent::new("u2", "v2", "view", NOW),
            InteractionEvent::new("u3", "v3", "save", NOW),
            InteractionEvent::new("u3", "v1", "click", NOW - 86_400),
        ]
    }

    #[test]
    fn test_empty_matrix() {
        let (sim, _) = build(&[]);
        assert!(sim.is_empty());
    }

    #[test]
    fn test_single_item_is_trivial() {
        let (sim, _) = build(&[InteractionEvent::new("u1", "v1", "view", NOW)]);
        assert_eq!(sim.n_items(), 1);
        assert_eq!(sim.get(0, 0), 1.0);
    }

    #[test]
    fn test_symmetric() {
        let (sim, _) = build(&sample_events());
        for i in 0..sim.n_items() {
            for j in 0..sim.n_items() {
                assert!((sim.get(i, j) - sim.get(j, i)).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_matches_direct_cosine() {
        let (sim, agg) = build(&sample_events());
        let columns = agg.matrix.item_vectors();
        for i in 0..sim.n_items() {
            for j in 0..sim.n_items() {
                let expected = sparse_cosine(&columns[i], &columns[j]);
                assert!((sim.get(i, j) - expected).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_shared_users_score_higher_than_disjoint() {
        let events = vec![
            InteractionEvent::new("u1", "v1", "view", NOW),
            InteractionEvent::new("u1", "v2", "contact", NOW),
            InteractionEvent::new("u2", "v1", "view", NOW),
            InteractionEvent::new("u2", "v2", "view", NOW),
            InteractionEvent::new("u3", "v3", "view", NOW),
        ];
        let (sim, agg) = build(&events);
        let v1 = agg.items.get("v1").unwrap();
        let v2 = agg.items.get("v2").unwrap();
        let v3 = agg.items.get("v3").unwrap();

        assert!(sim.get(v1, v2) > 0.5);
        assert_eq!(sim.get(v1, v3), 0.0);
    }

    #[test]
    fn test_diagonal_is_one() {
        let (sim, _) = build(&sample_events());
        for i in 0..sim.n_items() {
            assert!((sim.get(i, i) - 1.0).abs() < 1e-5);
        }
    }
}
