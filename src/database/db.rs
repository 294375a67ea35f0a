//! The database handle
//!
//! Executes operation types against the storage engine:
//!
//! - writes run as one atomic engine transaction each
//! - fetches read the latest committed table, filter, sort, decode, then
//!   hand the records to the request's transform
//!
//! Writes take `&mut self` and reads `&self`. Share across threads by
//! wrapping the handle in a `Mutex` or `RwLock`.

use serde_json::Value;

use super::errors::{DatabaseError, DatabaseResult};
use crate::config::{DatabaseConfig, Location};
use crate::model::StorageRecord;
use crate::observability::{log_event_with_fields, Event};
use crate::operation::{CreateOrUpdate, DeleteRequest, FetchRequest};
use crate::query::{PredicateFilter, RecordSorter};
use crate::storage::{
    FileBackend, LogBackend, MemoryBackend, StorageError, Store, StoreOptions, Transaction,
};

/// An open database. Dropping it closes the engine.
#[derive(Debug)]
pub struct Database {
    store: Store,
}

impl Database {
    /// Opens the engine at the configured location and replays its log.
    pub fn open(config: &DatabaseConfig) -> DatabaseResult<Self> {
        let location = config.location()?;
        let location_str = location.to_string();
        log_event_with_fields(Event::DatabaseOpen, &[("location", location_str.as_str())]);

        let options = StoreOptions {
            sync_on_commit: config.sync_on_commit,
        };
        let opened = Self::open_backend(&location)
            .and_then(|backend| Store::open(backend, options))
            .and_then(|(mut store, report)| {
                if config.compact_on_open {
                    store.compact()?;
                }
                Ok((store, report))
            });

        let (store, report) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                let code = e.code().code();
                log_event_with_fields(
                    Event::DatabaseUnavailable,
                    &[("location", location_str.as_str()), ("code", code)],
                );
                return Err(DatabaseError::StorageUnavailable {
                    location: location_str,
                    source: e,
                });
            }
        };

        let frames = report.frames_applied.to_string();
        let records = store.total_len().to_string();
        log_event_with_fields(
            Event::DatabaseReady,
            &[
                ("location", location_str.as_str()),
                ("frames", frames.as_str()),
                ("records", records.as_str()),
            ],
        );

        Ok(Self { store })
    }

    /// Process-local database labelled `identifier`.
    ///
    /// The label only names the database in logs; every call returns a
    /// fresh, empty database.
    pub fn in_memory(identifier: impl Into<String>) -> DatabaseResult<Self> {
        Self::open(&DatabaseConfig::in_memory(identifier))
    }

    fn open_backend(location: &Location) -> Result<Box<dyn LogBackend>, StorageError> {
        let backend: Box<dyn LogBackend> = match location {
            Location::OnDisk(dir) => Box::new(FileBackend::open(dir)?),
            Location::InMemory(id) => Box::new(MemoryBackend::new(id.clone())),
        };
        Ok(backend)
    }

    /// Inserts or fully overwrites the record built from `model`.
    ///
    /// Returns the primary key written.
    pub fn create_or_update<M, R: StorageRecord>(
        &mut self,
        model: &M,
        op: &CreateOrUpdate<M, R>,
    ) -> DatabaseResult<String> {
        let record = op.to_record(model);
        let mut txn = Transaction::new();
        let key = Self::stage_put(&mut txn, &record)?;
        self.commit(txn, R::COLLECTION)?;
        Ok(key)
    }

    /// `create_or_update` with a bare model → record function
    pub fn create_or_update_with<M, R, F>(
        &mut self,
        model: &M,
        reverse_transform: F,
    ) -> DatabaseResult<String>
    where
        R: StorageRecord,
        F: Fn(&M) -> R,
    {
        let record = reverse_transform(model);
        let mut txn = Transaction::new();
        let key = Self::stage_put(&mut txn, &record)?;
        self.commit(txn, R::COLLECTION)?;
        Ok(key)
    }

    /// Upserts every model in one transaction: all are written or none.
    pub fn create_or_update_all<M, R: StorageRecord>(
        &mut self,
        models: &[M],
        op: &CreateOrUpdate<M, R>,
    ) -> DatabaseResult<Vec<String>> {
        let mut txn = Transaction::new();
        let keys = models
            .iter()
            .map(|model| Self::stage_put(&mut txn, &op.to_record(model)))
            .collect::<DatabaseResult<Vec<_>>>()?;
        self.commit(txn, R::COLLECTION)?;
        Ok(keys)
    }

    fn stage_put<R: StorageRecord>(txn: &mut Transaction, record: &R) -> DatabaseResult<String> {
        let key = record.primary_key();
        if key.is_empty() {
            return Err(DatabaseError::WriteFailed(StorageError::write_failed_no_source(
                format!("Empty primary key in {}", R::COLLECTION),
            )));
        }
        let body = serde_json::to_vec(record).map_err(|e| {
            DatabaseError::WriteFailed(StorageError::write_failed_no_source(format!(
                "Failed to encode {}:{}: {}",
                R::COLLECTION,
                key,
                e
            )))
        })?;
        txn.put(R::COLLECTION, key, body);
        Ok(key.to_string())
    }

    fn commit(&mut self, txn: Transaction, scope: &str) -> DatabaseResult<u64> {
        let ops = txn.len().to_string();
        log_event_with_fields(
            Event::WriteBegin,
            &[("collection", scope), ("ops", ops.as_str())],
        );

        match self.store.commit(txn) {
            Ok(sequence) => {
                let sequence_str = sequence.to_string();
                log_event_with_fields(
                    Event::WriteCommit,
                    &[("collection", scope), ("sequence", sequence_str.as_str())],
                );
                Ok(sequence)
            }
            Err(e) => {
                let message = e.to_string();
                log_event_with_fields(
                    Event::WriteFailed,
                    &[("collection", scope), ("error", message.as_str())],
                );
                Err(DatabaseError::WriteFailed(e))
            }
        }
    }

    /// Runs a fetch: filter, sort, decode, transform.
    pub fn fetch<M, R: StorageRecord>(&self, request: &FetchRequest<M, R>) -> DatabaseResult<M> {
        let collection = R::COLLECTION;
        let stored = self.store.scan(collection);
        let scanned = stored.len();

        let mut rows = Vec::with_capacity(scanned);
        for (key, body) in stored {
            let value: Value = serde_json::from_slice(body)
                .map_err(|e| corruption(collection, key, e.to_string()))?;
            if let Some(filter) = request.filter() {
                if !PredicateFilter::matches(&value, filter) {
                    continue;
                }
            }
            rows.push((key, value));
        }

        RecordSorter::sort(&mut rows, request.sort_keys(), |(_, value)| value);

        let records = rows
            .into_iter()
            .map(|(key, value)| {
                serde_json::from_value::<R>(value)
                    .map_err(|e| corruption(collection, key, e.to_string()))
            })
            .collect::<DatabaseResult<Vec<R>>>()?;

        let scanned = scanned.to_string();
        let matched = records.len().to_string();
        log_event_with_fields(
            Event::FetchExecuted,
            &[
                ("collection", collection),
                ("scanned", scanned.as_str()),
                ("matched", matched.as_str()),
            ],
        );

        request.transform(records).map_err(|e| {
            if let DatabaseError::DataCorruption {
                collection,
                key,
                reason,
            } = &e
            {
                log_event_with_fields(
                    Event::DataCorruption,
                    &[
                        ("collection", collection.as_str()),
                        ("key", key.as_str()),
                        ("reason", reason.as_str()),
                    ],
                );
            }
            e
        })
    }

    /// The record of `R` stored under `primary_key`, if any
    pub fn get<R: StorageRecord>(&self, primary_key: &str) -> DatabaseResult<Option<R>> {
        match self.store.get(R::COLLECTION, primary_key) {
            Some(body) => serde_json::from_slice(body)
                .map(Some)
                .map_err(|e| corruption(R::COLLECTION, primary_key, e.to_string())),
            None => Ok(None),
        }
    }

    /// Number of live records of `R`
    pub fn count<R: StorageRecord>(&self) -> usize {
        self.store.len(R::COLLECTION)
    }

    /// Removes the record under the request's key.
    ///
    /// Returns `false`, writing nothing, when no such record exists.
    pub fn delete<R: StorageRecord>(&mut self, request: &DeleteRequest<R>) -> DatabaseResult<bool> {
        let key = request.primary_key();
        if !self.store.contains(R::COLLECTION, key) {
            log_event_with_fields(
                Event::DeleteMissing,
                &[("collection", R::COLLECTION), ("key", key)],
            );
            return Ok(false);
        }

        let mut txn = Transaction::new();
        txn.delete(R::COLLECTION, key);
        self.commit(txn, R::COLLECTION)?;
        Ok(true)
    }

    /// Removes every record of every collection in one transaction.
    pub fn delete_all(&mut self) -> DatabaseResult<()> {
        let removed = self.store.total_len();
        if removed > 0 {
            let mut txn = Transaction::new();
            txn.clear();
            self.commit(txn, "*")?;
        }

        let removed = removed.to_string();
        log_event_with_fields(Event::DeleteAll, &[("removed", removed.as_str())]);
        Ok(())
    }

    /// Rewrites the log down to the live records.
    pub fn compact(&mut self) -> DatabaseResult<()> {
        let before = self.store.log_size().to_string();
        log_event_with_fields(Event::CompactBegin, &[("log_bytes", before.as_str())]);

        self.store.compact().map_err(DatabaseError::WriteFailed)?;

        let after = self.store.log_size().to_string();
        log_event_with_fields(
            Event::CompactComplete,
            &[("log_bytes_before", before.as_str()), ("log_bytes", after.as_str())],
        );
        Ok(())
    }

    /// Reads the log back and checks it matches the live table.
    pub fn verify(&mut self) -> DatabaseResult<()> {
        self.store.verify().map_err(DatabaseError::ReadFailed)
    }

    /// Human-readable storage location
    pub fn location(&self) -> String {
        self.store.location()
    }

    /// Sequence of the last committed transaction (0 when none)
    pub fn last_sequence(&self) -> u64 {
        self.store.last_sequence()
    }

    /// Current size of the commit log in bytes
    pub fn log_size(&self) -> u64 {
        self.store.log_size()
    }
}

fn corruption(collection: &str, key: &str, reason: String) -> DatabaseError {
    log_event_with_fields(
        Event::DataCorruption,
        &[("collection", collection), ("key", key), ("reason", reason.as_str())],
    );
    DatabaseError::data_corruption(collection, key, reason)
}
