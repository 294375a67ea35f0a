//! The storage engine: commit log + materialized table
//!
//! On open the log is replayed into an in-memory table keyed by
//! collection and primary key. Every commit encodes one frame, appends and
//! (optionally) syncs it, and only then applies it to the table. Readers
//! therefore only ever observe fully committed transactions.
//!
//! A frame whose append or sync fails is cut back off the log. If that
//! truncate fails as well, the store refuses every later write until it is
//! reopened, so no two frames can ever share a sequence.

use std::collections::{BTreeMap, HashMap};

use super::backend::LogBackend;
use super::errors::{StorageError, StorageResult};
use super::reader::LogReader;
use super::record::{CommitRecord, RecordOp};
use crate::observability::{log_event_with_fields, Event};

/// Options that control how a store commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// fsync the log after every commit
    pub sync_on_commit: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            sync_on_commit: true,
        }
    }
}

/// What replay found while opening a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Committed frames applied
    pub frames_applied: u64,
    /// Bytes of an interrupted trailing frame that were discarded
    pub torn_bytes_discarded: u64,
}

#[derive(Debug, Clone)]
struct Row {
    slot: u64,
    body: Vec<u8>,
}

#[derive(Debug, Default)]
struct Collection {
    rows: HashMap<String, Row>,
    next_slot: u64,
}

impl Collection {
    fn put(&mut self, key: String, body: Vec<u8>) {
        match self.rows.get_mut(&key) {
            // Overwrite in place: the record keeps its natural-order position.
            Some(row) => row.body = body,
            None => {
                let slot = self.next_slot;
                self.next_slot += 1;
                self.rows.insert(key, Row { slot, body });
            }
        }
    }

    fn ordered(&self) -> Vec<(&str, &Row)> {
        let mut rows: Vec<_> = self.rows.iter().map(|(k, r)| (k.as_str(), r)).collect();
        rows.sort_by_key(|(_, row)| row.slot);
        rows
    }
}

/// A batch of mutations committed atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    ops: Vec<RecordOp>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully overwrite `collection/key`.
    pub fn put(&mut self, collection: &str, key: &str, body: Vec<u8>) -> &mut Self {
        self.ops.push(RecordOp::Put {
            collection: collection.to_string(),
            key: key.to_string(),
            body,
        });
        self
    }

    /// Remove `collection/key`; a missing key is ignored.
    pub fn delete(&mut self, collection: &str, key: &str) -> &mut Self {
        self.ops.push(RecordOp::Delete {
            collection: collection.to_string(),
            key: key.to_string(),
        });
        self
    }

    /// Remove everything in every collection.
    pub fn clear(&mut self) -> &mut Self {
        self.ops.push(RecordOp::Clear);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Embedded keyed record store over a [`LogBackend`].
#[derive(Debug)]
pub struct Store {
    backend: Box<dyn LogBackend>,
    options: StoreOptions,
    collections: BTreeMap<String, Collection>,
    last_sequence: u64,
    /// Set when a failed frame could not be rolled back
    poisoned: Option<String>,
}

impl Store {
    /// Opens a store, replaying whatever the backend already holds.
    ///
    /// An interrupted trailing frame is discarded and cut from the log.
    /// A damaged committed frame fails the open.
    pub fn open(
        backend: Box<dyn LogBackend>,
        options: StoreOptions,
    ) -> StorageResult<(Self, ReplayReport)> {
        let mut store = Self {
            backend,
            options,
            collections: BTreeMap::new(),
            last_sequence: 0,
            poisoned: None,
        };
        let report = store.replay()?;
        Ok((store, report))
    }

    fn replay(&mut self) -> StorageResult<ReplayReport> {
        let location = self.backend.location();
        log_event_with_fields(Event::ReplayBegin, &[("location", location.as_str())]);

        let image = self.backend.read_all()?;
        let mut reader = LogReader::new(&image);
        let mut report = ReplayReport::default();

        while let Some(record) = reader.read_next()? {
            self.apply(&record.ops);
            report.frames_applied += 1;
        }
        self.last_sequence = reader.last_sequence();

        if let Some(offset) = reader.torn_tail_at() {
            report.torn_bytes_discarded = image.len() as u64 - offset;
            self.backend.truncate(offset)?;
            let offset = offset.to_string();
            let discarded = report.torn_bytes_discarded.to_string();
            log_event_with_fields(
                Event::ReplayTornTail,
                &[
                    ("location", location.as_str()),
                    ("offset", offset.as_str()),
                    ("discarded_bytes", discarded.as_str()),
                ],
            );
        }

        let frames = report.frames_applied.to_string();
        let last_sequence = self.last_sequence.to_string();
        log_event_with_fields(
            Event::ReplayComplete,
            &[
                ("location", location.as_str()),
                ("frames", frames.as_str()),
                ("last_sequence", last_sequence.as_str()),
            ],
        );
        Ok(report)
    }

    fn apply(&mut self, ops: &[RecordOp]) {
        for op in ops {
            match op {
                RecordOp::Put {
                    collection,
                    key,
                    body,
                } => self
                    .collections
                    .entry(collection.clone())
                    .or_default()
                    .put(key.clone(), body.clone()),
                RecordOp::Delete { collection, key } => {
                    if let Some(c) = self.collections.get_mut(collection) {
                        c.rows.remove(key);
                    }
                }
                RecordOp::Clear => self.collections.clear(),
            }
        }
    }

    /// Commits a transaction atomically, returning its sequence.
    ///
    /// Nothing is applied unless the frame was appended (and synced, when
    /// configured). An empty transaction writes nothing.
    pub fn commit(&mut self, txn: Transaction) -> StorageResult<u64> {
        if txn.is_empty() {
            return Ok(self.last_sequence);
        }
        self.ensure_writable()?;

        let sequence = self.last_sequence + 1;
        let record = CommitRecord::new(sequence, txn.ops);
        let frame = record.serialize()?;

        let start = self.backend.size();
        if let Err(e) = self.write_frame(&frame) {
            self.roll_back(start);
            return Err(e);
        }

        self.apply(&record.ops);
        self.last_sequence = sequence;
        Ok(sequence)
    }

    fn write_frame(&mut self, frame: &[u8]) -> StorageResult<()> {
        self.backend.append(frame)?;
        if self.options.sync_on_commit {
            self.backend.sync()?;
        }
        Ok(())
    }

    fn roll_back(&mut self, len: u64) {
        if let Err(e) = self.backend.truncate(len) {
            let location = self.backend.location();
            let error = e.to_string();
            log_event_with_fields(
                Event::WriteRollbackFailed,
                &[("location", location.as_str()), ("error", error.as_str())],
            );
            self.poisoned = Some(error);
        }
    }

    fn ensure_writable(&self) -> StorageResult<()> {
        match &self.poisoned {
            Some(reason) => Err(StorageError::write_failed_no_source(format!(
                "Log holds an unrolled-back frame, reopen to recover: {}",
                reason
            ))),
            None => Ok(()),
        }
    }

    /// Whether writes are refused after a failed rollback
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Latest committed body for `collection/key`.
    pub fn get(&self, collection: &str, key: &str) -> Option<&[u8]> {
        self.collections
            .get(collection)
            .and_then(|c| c.rows.get(key))
            .map(|row| row.body.as_slice())
    }

    pub fn contains(&self, collection: &str, key: &str) -> bool {
        self.get(collection, key).is_some()
    }

    /// Every live record of a collection in natural (first-insert) order.
    pub fn scan(&self, collection: &str) -> Vec<(&str, &[u8])> {
        match self.collections.get(collection) {
            Some(c) => c
                .ordered()
                .into_iter()
                .map(|(key, row)| (key, row.body.as_slice()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of live records in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|c| c.rows.len())
            .unwrap_or(0)
    }

    /// Number of live records across all collections.
    pub fn total_len(&self) -> usize {
        self.collections.values().map(|c| c.rows.len()).sum()
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn log_size(&self) -> u64 {
        self.backend.size()
    }

    pub fn location(&self) -> String {
        self.backend.location()
    }

    /// Rewrites the log as a single frame holding only live records.
    ///
    /// Natural order survives: rows are written in slot order, so replay
    /// reassigns slots in the same relative order.
    pub fn compact(&mut self) -> StorageResult<()> {
        self.ensure_writable()?;

        let mut ops = Vec::new();
        for (name, collection) in &self.collections {
            for (key, row) in collection.ordered() {
                ops.push(RecordOp::Put {
                    collection: name.clone(),
                    key: key.to_string(),
                    body: row.body.clone(),
                });
            }
        }

        let image = if ops.is_empty() {
            Vec::new()
        } else {
            CommitRecord::new(self.last_sequence.max(1), ops).serialize()?
        };

        self.backend.replace(&image)?;
        if self.last_sequence == 0 && !image.is_empty() {
            self.last_sequence = 1;
        }
        Ok(())
    }

    /// Reads the log back and checks it replays to the current table.
    pub fn verify(&mut self) -> StorageResult<()> {
        let image = self.backend.read_all()?;
        let records = LogReader::new(&image).read_all()?;

        let mut shadow = Store {
            backend: Box::new(super::backend::MemoryBackend::new("verify")),
            options: self.options,
            collections: BTreeMap::new(),
            last_sequence: 0,
            poisoned: None,
        };
        for record in &records {
            shadow.apply(&record.ops);
        }

        for (name, collection) in &self.collections {
            for (key, row) in &collection.rows {
                if shadow.get(name, key) != Some(row.body.as_slice()) {
                    return Err(StorageError::data_corruption(format!(
                        "Log does not match table for {}:{}",
                        name, key
                    )));
                }
            }
        }
        if shadow.total_len() != self.total_len() {
            return Err(StorageError::data_corruption(
                "Log holds records missing from the table",
            ));
        }
        Ok(())
    }
}
