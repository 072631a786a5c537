//! Interaction aggregation.
//!
//! Turns raw events into a weighted, time-decayed user × item matrix plus the
//! dense index maps for both axes. Indices are only meaningful within the
//! aggregation that produced them.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::weights::TimeDecay;
use crate::math::SparseEntry;
use crate::types::InteractionEvent;

/// Bijective mapping between external ids and dense indices
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    ids: Vec<String>,
    positions: HashMap<String, usize>,
}

impl IdIndex {
    /// Build an index over the distinct ids, assigned in sorted order
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let ids: Vec<String> = ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        let positions = ids
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect();
        Self { ids, positions }
    }

    pub fn get(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// External id at a dense index
    pub fn id(&self, idx: usize) -> &str {
        &self.ids[idx]
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.ids.iter().enumerate().map(|(idx, id)| (idx, id.as_str()))
    }
}

/// Sparse user × item matrix stored as one sorted row per user
#[derive(Debug, Clone, Default)]
pub struct InteractionMatrix {
    n_items: usize,
    rows: Vec<Vec<SparseEntry>>,
}

impl InteractionMatrix {
    /// Build from summed cell values
    fn from_cells(n_users: usize, n_items: usize, cells: HashMap<(usize, usize), f32>) -> Self {
        let mut rows: Vec<Vec<SparseEntry>> = vec![Vec::new(); n_users];
        for ((user, item), value) in cells {
            rows[user].push((item, value));
        }
        for row in &mut rows {
            row.sort_unstable_by_key(|(item, _)| *item);
        }
        Self { n_items, rows }
    }

    pub fn n_users(&self) -> usize {
        self.rows.len()
    }

    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Number of stored (non-empty) cells
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Items a user interacted with, sorted by item index
    pub fn row(&self, user: usize) -> &[SparseEntry] {
        &self.rows[user]
    }

    pub fn get(&self, user: usize, item: usize) -> f32 {
        self.rows
            .get(user)
            .and_then(|row| {
                row.binary_search_by_key(&item, |(i, _)| *i)
                    .ok()
                    .map(|pos| row[pos].1)
            })
            .unwrap_or(0.0)
    }

    /// Transpose into one sparse vector over users per item
    pub fn item_vectors(&self) -> Vec<Vec<SparseEntry>> {
        let mut columns: Vec<Vec<SparseEntry>> = vec![Vec::new(); self.n_items];
        // Rows are visited in user order, so each column comes out sorted
        for (user, row) in self.rows.iter().enumerate() {
            for &(item, value) in row {
                columns[item].push((user, value));
            }
        }
        columns
    }
}

/// Output of one aggregation pass
#[derive(Debug, Clone, Default)]
pub struct AggregatedInteractions {
    pub users: IdIndex,
    pub items: IdIndex,
    pub matrix: InteractionMatrix,
    /// Events that fell inside the window
    pub events_used: usize,
}

impl AggregatedInteractions {
    /// True when no event qualified; callers fall back to non-CF paths
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Builds the weighted interaction matrix from raw events
#[derive(Debug, Clone, Copy)]
pub struct InteractionAggregator {
    /// Time decay rate per day
    pub decay_lambda: f32,
    /// Events older than this many days are dropped entirely
    pub lookback_days: u32,
}

impl InteractionAggregator {
    pub fn new(decay_lambda: f32, lookback_days: u32) -> Self {
        Self {
            decay_lambda,
            lookback_days,
        }
    }

    /// Oldest timestamp still inside the window for evaluation time `now`
    pub fn cutoff(&self, now: i64) -> i64 {
        now.saturating_sub(i64::from(self.lookback_days) * 86_400)
    }

    /// Aggregate events into a user × item matrix.
    ///
    /// Each cell is the sum over its events of
    /// `base_weight × decay × explicit_score`. An empty input (or one with
    /// every event outside the window) produces empty index maps rather than
    /// an error.
    pub fn aggregate(&self, events: &[InteractionEvent], now: i64) -> AggregatedInteractions {
        let cutoff = self.cutoff(now);
        let in_window: Vec<&InteractionEvent> =
            events.iter().filter(|e| e.timestamp >= cutoff).collect();

        if in_window.is_empty() {
            return AggregatedInteractions::default();
        }

        let users = IdIndex::from_ids(in_window.iter().map(|e| e.user_id.clone()));
        let items = IdIndex::from_ids(in_window.iter().map(|e| e.vehicle_id.clone()));
        let decay = TimeDecay::new(self.decay_lambda, now);

        let mut cells: HashMap<(usize, usize), f32> = HashMap::new();
        for event in &in_window {
            // Both lookups succeed: the indices were built from these events
            let (Some(user), Some(item)) = (users.get(&event.user_id), items.get(&event.vehicle_id))
            else {
                continue;
            };
            *cells.entry((user, item)).or_insert(0.0) += decay.event_score(event);
        }

        let matrix = InteractionMatrix::from_cells(users.len(), items.len(), cells);

        debug!(
            events = in_window.len(),
            dropped = events.len() - in_window.len(),
            users = users.len(),
            items = items.len(),
            nnz = matrix.nnz(),
            "Aggregated interactions"
        );

        AggregatedInteractions {
            events_used: in_window.len(),
            users,
            items,
            matrix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_750_000_000;
    const DAY: i64 = 86_400;

    fn aggregator() -> InteractionAggregator {
        InteractionAggregator::new(0.1, 90)
    }

    fn cell(agg: &AggregatedInteractions, user: &str, item: &str) -> f32 {
        agg.matrix
            .get(agg.users.get(user).unwrap(), agg.items.get(item).unwrap())
    }

    #[test]
    fn test_empty_events_signal_no_data() {
        let agg = aggregator().aggregate(&[], NOW);
        assert!(agg.is_empty());
        assert!(agg.users.is_empty());
        assert_eq!(agg.matrix.nnz(), 0);
    }

    #[test]
    fn test_events_outside_window_are_excluded() {
        let events = vec![
            InteractionEvent::new("u1", "v1", "view", NOW - 91 * DAY),
            InteractionEvent::new("u2", "v2", "view", NOW - DAY),
        ];
        let agg = aggregator().aggregate(&events, NOW);

        assert_eq!(agg.events_used, 1);
        assert!(!agg.users.contains("u1"));
        assert!(!agg.items.contains("v1"));
        assert!(agg.items.contains("v2"));
    }

    #[test]
    fn test_all_events_outside_window_is_empty() {
        let events = vec![InteractionEvent::new("u1", "v1", "contact", NOW - 200 * DAY)];
        assert!(aggregator().aggregate(&events, NOW).is_empty());
    }

    #[test]
    fn test_repeated_events_sum() {
        let once = vec![InteractionEvent::new("u1", "v1", "view", NOW)];
        let twice = vec![
            InteractionEvent::new("u1", "v1", "view", NOW),
            InteractionEvent::new("u1", "v1", "view", NOW),
        ];

        let single = cell(&aggregator().aggregate(&once, NOW), "u1", "v1");
        let double = cell(&aggregator().aggregate(&twice, NOW), "u1", "v1");
        assert!((double - 2.0 * single).abs() < 1e-6);
    }

    #[test]
    fn test_mixed_types_compound() {
        let events = vec![
            InteractionEvent::new("u1", "v1", "view", NOW),
            InteractionEvent::new("u1", "v1", "contact", NOW),
        ];
        let agg = aggregator().aggregate(&events, NOW);
        assert!((cell(&agg, "u1", "v1") - 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_more_recent_event_scores_higher() {
        let events = vec![
            InteractionEvent::new("u1", "v1", "click", NOW - 5 * DAY),
            InteractionEvent::new("u1", "v2", "click", NOW - 2 * DAY),
        ];
        let agg = aggregator().aggregate(&events, NOW);
        assert!(cell(&agg, "u1", "v2") > cell(&agg, "u1", "v1"));
    }

    #[test]
    fn test_explicit_score_multiplies() {
        let events = vec![InteractionEvent::new("u1", "v1", "save", NOW).with_score(0.5)];
        let agg = aggregator().aggregate(&events, NOW);
        assert!((cell(&agg, "u1", "v1") - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_index_maps_are_bijective() {
        let events = vec![
            InteractionEvent::new("u2", "v3", "view", NOW),
            InteractionEvent::new("u1", "v1", "view", NOW),
            InteractionEvent::new("u1", "v3", "view", NOW),
        ];
        let agg = aggregator().aggregate(&events, NOW);

        assert_eq!(agg.users.len(), 2);
        assert_eq!(agg.items.len(), 2);
        for (idx, id) in agg.items.iter() {
            assert_eq!(agg.items.get(id), Some(idx));
        }
        assert_eq!(agg.matrix.n_users(), 2);
        assert_eq!(agg.matrix.n_items(), 2);
    }

    #[test]
    fn test_item_vectors_transpose() {
        let events = vec![
            InteractionEvent::new("u1", "v1", "view", NOW),
            InteractionEvent::new("u2", "v1", "click", NOW),
            InteractionEvent::new("u2", "v2", "view", NOW),
        ];
        let agg = aggregator().aggregate(&events, NOW);
        let columns = agg.matrix.item_vectors();

        let v1 = agg.items.get("v1").unwrap();
        assert_eq!(columns[v1].len(), 2);
        assert!(columns[v1].windows(2).all(|w| w[0].0 < w[1].0));
    }
}
