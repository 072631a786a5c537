//! Embedded file-based storage using redb.
//!
//! Interactions are keyed by an increasing sequence number so the log stays
//! append-only. Vehicles are keyed by id. Values are MessagePack encoded.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use super::{AttributeFilter, InteractionSource, StorageError, VehicleSource};
use crate::types::{InteractionEvent, PopularityRow, VehicleRecord};

/// Table of interaction events keyed by sequence number
const INTERACTIONS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("interactions");

/// Table of vehicle records keyed by vehicle id
const VEHICLES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("vehicles");

/// Database file name inside the data directory
const DB_FILE: &str = "recsys.redb";

macro_rules! impl_from_redb {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for StorageError {
                fn from(err: $err) -> Self {
                    StorageError::Database(err.to_string())
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    rmp_serde::to_vec_named(value).map_err(|e| StorageError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    rmp_serde::from_slice(bytes).map_err(|e| StorageError::SerializationError(e.to_string()))
}

/// Persistent interaction log and catalog
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Create or open the database inside `data_dir`
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir).map_err(|e| {
            StorageError::ConnectionFailed(format!("Failed to create data directory: {}", e))
        })?;

        let db_path = data_dir.join(DB_FILE);
        let db = Database::create(&db_path)?;

        // Ensure tables exist so read transactions never miss them
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(INTERACTIONS_TABLE)?;
            let _ = write_txn.open_table(VEHICLES_TABLE)?;
        }
        write_txn.commit()?;

        info!(db_path = %db_path.display(), "Recommendation store opened");

        Ok(Self { db })
    }

    /// Decode every interaction in the log
    fn read_interactions(&self) -> Result<Vec<InteractionEvent>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(INTERACTIONS_TABLE)?;

        let mut events = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            events.push(decode::<InteractionEvent>(value.value())?);
        }
        Ok(events)
    }

    /// Decode every vehicle in the catalog
    fn read_vehicles(&self) -> Result<Vec<VehicleRecord>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VEHICLES_TABLE)?;

        let mut vehicles = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            vehicles.push(decode::<VehicleRecord>(value.value())?);
        }
        Ok(vehicles)
    }
}

#[async_trait]
impl InteractionSource for RedbStore {
    async fn events_since(&self, since: i64) -> Result<Vec<InteractionEvent>, StorageError> {
        let mut events: Vec<_> = self
            .read_interactions()?
            .into_iter()
            .filter(|e| e.timestamp >= since)
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }

    async fn recent_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<InteractionEvent>, StorageError> {
        let mut events: Vec<_> = self
            .read_interactions()?
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events.truncate(limit);
        Ok(events)
    }

    async fn append(&self, event: InteractionEvent) -> Result<(), StorageError> {
        let data = encode(&event)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(INTERACTIONS_TABLE)?;
            let next_key = match table.last()? {
                Some((key, _)) => key.value() + 1,
                None => 0,
            };
            table.insert(next_key, data.as_slice())?;
        }
        write_txn.commit()?;

        debug!(
            user_id = %event.user_id,
            vehicle_id = %event.vehicle_id,
            interaction_type = %event.interaction_type,
            "Interaction recorded"
        );

        Ok(())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(INTERACTIONS_TABLE)?;
        Ok(table.len()?)
    }
}

#[async_trait]
impl VehicleSource for RedbStore {
    async fn get_vehicle(&self, vehicle_id: &str) -> Result<Option<VehicleRecord>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VEHICLES_TABLE)?;

        match table.get(vehicle_id)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    async fn scan_vehicles(&self) -> Result<Vec<VehicleRecord>, StorageError> {
        self.read_vehicles()
    }

    async fn filter_ids(
        &self,
        ids: &[String],
        filter: &AttributeFilter,
    ) -> Result<HashSet<String>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VEHICLES_TABLE)?;

        let mut matched = HashSet::new();
        for id in ids {
            if let Some(data) = table.get(id.as_str())? {
                let vehicle: VehicleRecord = decode(data.value())?;
                if filter.matches(&vehicle) {
                    matched.insert(id.clone());
                }
            }
        }
        Ok(matched)
    }

    async fn popularity(&self) -> Result<Vec<PopularityRow>, StorageError> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for event in self.read_interactions()? {
            *counts.entry(event.vehicle_id).or_insert(0) += 1;
        }

        Ok(self
            .read_vehicles()?
            .into_iter()
            .filter(|v| v.title.is_some())
            .map(|v| PopularityRow {
                interaction_count: counts.get(&v.vehicle_id).copied().unwrap_or(0),
                vehicle_id: v.vehicle_id,
                rating: v.rating,
            })
            .collect())
    }

    async fn upsert_vehicles(&self, vehicles: Vec<VehicleRecord>) -> Result<usize, StorageError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(VEHICLES_TABLE)?;
            for vehicle in &vehicles {
                let data = encode(vehicle)?;
                table.insert(vehicle.vehicle_id.as_str(), data.as_slice())?;
            }
        }
        write_txn.commit()?;

        debug!(count = vehicles.len(), "Vehicles upserted");
        Ok(vehicles.len())
    }
}
