//! Sequential commit-log reader
//!
//! Walks a log image frame by frame, validating every checksum. A frame
//! cut short at the end of the log is an interrupted commit and ends the
//! scan; any other framing failure is corruption.

use std::io;

use super::errors::{StorageError, StorageResult};
use super::record::{CommitRecord, MIN_FRAME_SIZE};

/// Reader over an in-memory image of the commit log.
pub struct LogReader<'a> {
    data: &'a [u8],
    current_offset: u64,
    last_sequence: u64,
    torn_tail_at: Option<u64>,
}

impl<'a> LogReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            current_offset: 0,
            last_sequence: 0,
            torn_tail_at: None,
        }
    }

    /// Offset of the next frame to read.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Sequence of the last frame read, 0 if none.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Offset of an interrupted trailing frame, once the scan has reached it.
    pub fn torn_tail_at(&self) -> Option<u64> {
        self.torn_tail_at
    }

    /// Reads the next committed frame.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` for a valid frame
    /// - `Ok(None)` at end of log, or at an interrupted trailing frame
    /// - `Err(BOOKSHELF_DATA_CORRUPTION)` for a damaged committed frame
    pub fn read_next(&mut self) -> StorageResult<Option<CommitRecord>> {
        if self.torn_tail_at.is_some() {
            return Ok(None);
        }

        let offset = self.current_offset as usize;
        if offset >= self.data.len() {
            return Ok(None);
        }

        let remaining = &self.data[offset..];

        // A header that never finished writing, or a declared length running
        // past the end, marks a frame whose commit never completed.
        let torn = if remaining.len() < 4 {
            true
        } else {
            let declared =
                u32::from_le_bytes([remaining[0], remaining[1], remaining[2], remaining[3]])
                    as usize;
            declared >= MIN_FRAME_SIZE && declared > remaining.len()
        };
        if torn {
            self.torn_tail_at = Some(self.current_offset);
            return Ok(None);
        }

        let (record, consumed) = CommitRecord::deserialize(remaining).map_err(|e| {
            let reason = match e.kind() {
                io::ErrorKind::UnexpectedEof => format!("Unexpected end of frame: {}", e),
                _ => e.to_string(),
            };
            StorageError::corruption_at_offset(self.current_offset, reason)
        })?;

        if record.sequence <= self.last_sequence {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Sequence went backwards: {} after {}",
                    record.sequence, self.last_sequence
                ),
            ));
        }

        self.last_sequence = record.sequence;
        self.current_offset += consumed as u64;
        Ok(Some(record))
    }

    /// Reads every committed frame.
    pub fn read_all(&mut self) -> StorageResult<Vec<CommitRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_next()? {
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::super::record::RecordOp;
    use super::*;

    fn frame(sequence: u64, key: &str) -> Vec<u8> {
        CommitRecord::new(
            sequence,
            vec![RecordOp::Put {
                collection: "books".into(),
                key: key.into(),
                body: format!(r#"{{"id":"{}"}}"#, key).into_bytes(),
            }],
        )
        .serialize()
        .unwrap()
    }

    fn log_of(frames: &[Vec<u8>]) -> Vec<u8> {
        frames.concat()
    }

    #[test]
    fn test_read_empty_log() {
        let mut reader = LogReader::new(&[]);
        assert!(reader.read_next().unwrap().is_none());
        assert!(reader.torn_tail_at().is_none());
    }

    #[test]
    fn test_read_multiple_frames() {
        let log = log_of(&[frame(1, "a"), frame(2, "b"), frame(3, "c")]);
        let mut reader = LogReader::new(&log);

        let records = reader.read_all().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(reader.last_sequence(), 3);
        assert_eq!(reader.current_offset(), log.len() as u64);
    }

    #[test]
    fn test_torn_tail_stops_scan() {
        let first = frame(1, "a");
        let second = frame(2, "b");
        let mut log = log_of(&[first.clone(), second.clone()]);
        log.truncate(first.len() + second.len() / 2);

        let mut reader = LogReader::new(&log);
        let records = reader.read_all().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(reader.torn_tail_at(), Some(first.len() as u64));
    }

    #[test]
    fn test_partial_header_is_torn_tail() {
        let mut log = frame(1, "a");
        log.extend_from_slice(&[0x20, 0x00]);

        let mut reader = LogReader::new(&log);
        assert_eq!(reader.read_all().unwrap().len(), 1);
        assert!(reader.torn_tail_at().is_some());
    }

    #[test]
    fn test_corrupt_frame_is_fatal() {
        let mut log = log_of(&[frame(1, "a"), frame(2, "b")]);
        log[10] ^= 0xFF;

        let mut reader = LogReader::new(&log);
        let err = reader.read_next().unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(err.details(), Some("byte_offset: 0"));
    }

    #[test]
    fn test_sequence_regression_is_corruption() {
        let log = log_of(&[frame(2, "a"), frame(2, "b")]);
        let mut reader = LogReader::new(&log);

        reader.read_next().unwrap();
        let err = reader.read_next().unwrap_err();
        assert!(err.message().contains("Sequence went backwards"));
    }
}
