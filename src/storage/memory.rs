//! In-process storage backed by lock-protected collections.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::warn;

use super::{AttributeFilter, InteractionSource, StorageError, VehicleSource};
use crate::types::{InteractionEvent, PopularityRow, VehicleRecord};

/// Helper trait to recover from poisoned RwLocks
trait RecoverableLock<T> {
    fn read_or_recover(&self) -> RwLockReadGuard<'_, T>;
    fn write_or_recover(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T> RecoverableLock<T> for RwLock<T> {
    fn read_or_recover(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap_or_else(|poisoned| {
            warn!("RwLock was poisoned during read, recovering");
            poisoned.into_inner()
        })
    }

    fn write_or_recover(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap_or_else(|poisoned| {
            warn!("RwLock was poisoned during write, recovering");
            poisoned.into_inner()
        })
    }
}

/// Interaction log and catalog held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    interactions: RwLock<Vec<InteractionEvent>>,
    vehicles: RwLock<HashMap<String, VehicleRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with events and vehicles
    pub fn with_data(
        interactions: impl IntoIterator<Item = InteractionEvent>,
        vehicles: impl IntoIterator<Item = VehicleRecord>,
    ) -> Self {
        Self {
            interactions: RwLock::new(interactions.into_iter().collect()),
            vehicles: RwLock::new(
                vehicles
                    .into_iter()
                    .map(|v| (v.vehicle_id.clone(), v))
                    .collect(),
            ),
        }
    }
}

fn most_recent_first(events: &mut [InteractionEvent]) {
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[async_trait]
impl InteractionSource for MemoryStore {
    async fn events_since(&self, since: i64) -> Result<Vec<InteractionEvent>, StorageError> {
        let mut events: Vec<_> = self
            .interactions
            .read_or_recover()
            .iter()
            .filter(|e| e.timestamp >= since)
            .cloned()
            .collect();
        most_recent_first(&mut events);
        Ok(events)
    }

    async fn recent_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<InteractionEvent>, StorageError> {
        let mut events: Vec<_> = self
            .interactions
            .read_or_recover()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        most_recent_first(&mut events);
        events.truncate(limit);
        Ok(events)
    }

    async fn append(&self, event: InteractionEvent) -> Result<(), StorageError> {
        self.interactions.write_or_recover().push(event);
        Ok(())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.interactions.read_or_recover().len() as u64)
    }
}

#[async_trait]
impl VehicleSource for MemoryStore {
    async fn get_vehicle(&self, vehicle_id: &str) -> Result<Option<VehicleRecord>, StorageError> {
        Ok(self.vehicles.read_or_recover().get(vehicle_id).cloned())
    }

    async fn scan_vehicles(&self) -> Result<Vec<VehicleRecord>, StorageError> {
        Ok(self.vehicles.read_or_recover().values().cloned().collect())
    }

    async fn filter_ids(
        &self,
        ids: &[String],
        filter: &AttributeFilter,
    ) -> Result<HashSet<String>, StorageError> {
        let vehicles = self.vehicles.read_or_recover();
        Ok(ids
            .iter()
            .filter(|id| vehicles.get(id.as_str()).is_some_and(|v| filter.matches(v)))
            .cloned()
            .collect())
    }

    async fn popularity(&self) -> Result<Vec<PopularityRow>, StorageError> {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        let interactions = self.interactions.read_or_recover();
        for event in interactions.iter() {
            *counts.entry(event.vehicle_id.as_str()).or_insert(0) += 1;
        }

        Ok(self
            .vehicles
            .read_or_recover()
            .values()
            .filter(|v| v.title.is_some())
            .map(|v| PopularityRow {
                vehicle_id: v.vehicle_id.clone(),
                interaction_count: counts.get(v.vehicle_id.as_str()).copied().unwrap_or(0),
                rating: v.rating,
            })
            .collect())
    }

    async fn upsert_vehicles(&self, vehicles: Vec<VehicleRecord>) -> Result<usize, StorageError> {
        let mut catalog = self.vehicles.write_or_recover();
        let written = vehicles.len();
        for vehicle in vehicles {
            catalog.insert(vehicle.vehicle_id.clone(), vehicle);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_750_000_000;

    fn store() -> MemoryStore {
        MemoryStore::with_data(
            vec![
                InteractionEvent::new("u1", "v1", "view", NOW - 300),
                InteractionEvent::new("u1", "v2", "save", NOW - 100),
                InteractionEvent::new("u2", "v1", "click", NOW - 200),
                InteractionEvent::new("u1", "v3", "view", NOW - 10_000),
            ],
            vec![
                VehicleRecord::new("v1").with_title("Civic").with_brand("Honda").with_rating(4.0),
                VehicleRecord::new("v2").with_title("Camry").with_brand("Toyota"),
                VehicleRecord::new("v3").with_brand("Toyota"),
            ],
        )
    }

    #[tokio::test]
    async fn test_events_since_most_recent_first() {
        let events = store().events_since(NOW - 1_000).await.unwrap();
        let times: Vec<i64> = events.iter().map(|e| e.timestamp).collect();
        assert_eq!(times, vec![NOW - 100, NOW - 200, NOW - 300]);
    }

    #[tokio::test]
    async fn test_recent_for_user_is_bounded() {
        let events = store().recent_for_user("u1", 2).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].vehicle_id, "v2");
        assert_eq!(events[1].vehicle_id, "v1");
    }

    #[tokio::test]
    async fn test_append_and_count() {
        let store = store();
        store
            .append(InteractionEvent::new("u9", "v9", "view", NOW))
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_filter_ids_skips_unknown() {
        let ids = vec!["v1".to_string(), "v2".to_string(), "missing".to_string()];
        let matched = store()
            .filter_ids(&ids, &AttributeFilter::new().with_brand("Toyota"))
            .await
            .unwrap();
        assert_eq!(matched, HashSet::from(["v2".to_string()]));
    }

    #[tokio::test]
    async fn test_popularity_counts_published_only() {
        let mut rows = store().popularity().await.unwrap();
        rows.sort_by(|a, b| a.vehicle_id.cmp(&b.vehicle_id));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].vehicle_id, "v1");
        assert_eq!(rows[0].interaction_count, 2);
        assert_eq!(rows[0].rating, Some(4.0));
        assert_eq!(rows[1].interaction_count, 1);
    }
}
