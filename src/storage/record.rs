//! Commit-log frame format
//!
//! One frame is one committed transaction:
//!
//! ```text
//! +------------------+
//! | Frame Length     | (u32 LE, includes itself and the checksum)
//! +------------------+
//! | Sequence         | (u64 LE)
//! +------------------+
//! | Op Count         | (u32 LE)
//! +------------------+
//! | Ops              | kind (u8) | collection | key | body
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Strings and bodies are u32-length-prefixed. The checksum covers every
//! byte before it, so a frame is either applied whole or rejected whole.
//! A frame, field or op count that does not fit in a u32 is refused at
//! encode time.

use std::io::{self, Cursor, Read};

use super::checksum::compute_checksum;
use super::errors::{StorageError, StorageResult};

/// Smallest possible frame: length + sequence + op count + checksum.
pub const MIN_FRAME_SIZE: usize = 4 + 8 + 4 + 4;

const KIND_PUT: u8 = 1;
const KIND_DELETE: u8 = 2;
const KIND_CLEAR: u8 = 3;

/// A single mutation inside a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOp {
    /// Insert or fully overwrite the record stored under `key`.
    Put {
        collection: String,
        key: String,
        body: Vec<u8>,
    },
    /// Remove the record stored under `key`.
    Delete { collection: String, key: String },
    /// Remove every record of every collection.
    Clear,
}

impl RecordOp {
    fn kind(&self) -> u8 {
        match self {
            RecordOp::Put { .. } => KIND_PUT,
            RecordOp::Delete { .. } => KIND_DELETE,
            RecordOp::Clear => KIND_CLEAR,
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) -> StorageResult<()> {
        buf.push(self.kind());
        let (collection, key, body): (&str, &str, &[u8]) = match self {
            RecordOp::Put {
                collection,
                key,
                body,
            } => (collection, key, body),
            RecordOp::Delete { collection, key } => (collection, key, &[]),
            RecordOp::Clear => ("", "", &[]),
        };
        write_bytes(buf, collection.as_bytes())?;
        write_bytes(buf, key.as_bytes())?;
        write_bytes(buf, body)
    }

    fn decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut kind = [0u8; 1];
        reader.read_exact(&mut kind)?;
        let collection = read_string(reader)?;
        let key = read_string(reader)?;
        let body = read_bytes(reader)?;

        match kind[0] {
            KIND_PUT => Ok(RecordOp::Put {
                collection,
                key,
                body,
            }),
            KIND_DELETE => Ok(RecordOp::Delete { collection, key }),
            KIND_CLEAR => Ok(RecordOp::Clear),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown op kind: {}", other),
            )),
        }
    }
}

/// One committed transaction as stored in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Monotonic commit sequence, starting at 1
    pub sequence: u64,
    /// Mutations applied atomically, in order
    pub ops: Vec<RecordOp>,
}

impl CommitRecord {
    pub fn new(sequence: u64, ops: Vec<RecordOp>) -> Self {
        Self { sequence, ops }
    }

    /// Serialize the complete frame.
    ///
    /// Fails with `WriteFailed`, before anything reaches the log, when the
    /// frame is too large for its u32 length fields.
    pub fn serialize(&self) -> StorageResult<Vec<u8>> {
        let mut body = Vec::new();
        body.extend_from_slice(&self.sequence.to_le_bytes());
        body.extend_from_slice(&encoded_len(self.ops.len(), "op count")?.to_le_bytes());
        for op in &self.ops {
            op.encode(&mut body)?;
        }

        let frame_length = encoded_len(4 + body.len() + 4, "frame")?;

        let mut frame = Vec::with_capacity(frame_length as usize);
        frame.extend_from_slice(&frame_length.to_le_bytes());
        frame.extend_from_slice(&body);
        let checksum = compute_checksum(&frame);
        frame.extend_from_slice(&checksum.to_le_bytes());

        Ok(frame)
    }

    /// Deserialize one frame from the front of `data`, verifying its checksum.
    ///
    /// Returns the frame and the number of bytes consumed. A frame that runs
    /// past the end of `data` yields `UnexpectedEof`; anything else that is
    /// wrong with it yields `InvalidData`.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < 4 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Frame header truncated",
            ));
        }

        let frame_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if frame_length < MIN_FRAME_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid frame length: {}", frame_length),
            ));
        }

        if data.len() < frame_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Frame truncated: expected {} bytes, got {}",
                    frame_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = frame_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed_checksum = compute_checksum(&data[..checksum_offset]);

        if computed_checksum != stored_checksum {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: computed {:08x}, stored {:08x}",
                    computed_checksum, stored_checksum
                ),
            ));
        }

        let body = &data[4..checksum_offset];
        let mut cursor = Cursor::new(body);

        let mut sequence_buf = [0u8; 8];
        cursor.read_exact(&mut sequence_buf).map_err(invalid)?;
        let sequence = u64::from_le_bytes(sequence_buf);

        let mut count_buf = [0u8; 4];
        cursor.read_exact(&mut count_buf).map_err(invalid)?;
        let op_count = u32::from_le_bytes(count_buf) as usize;

        let mut ops = Vec::with_capacity(op_count.min(1024));
        for _ in 0..op_count {
            ops.push(RecordOp::decode(&mut cursor).map_err(invalid)?);
        }

        if cursor.position() as usize != body.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Trailing bytes after last op",
            ));
        }

        Ok((Self { sequence, ops }, frame_length))
    }
}

/// A checksum-valid frame can still be malformed inside; an EOF while
/// parsing its body is corruption, not truncation.
fn invalid(e: io::Error) -> io::Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        io::Error::new(io::ErrorKind::InvalidData, "Frame body malformed")
    } else {
        e
    }
}

fn encoded_len(len: usize, what: &str) -> StorageResult<u32> {
    u32::try_from(len).map_err(|_| {
        StorageError::write_failed_no_source(format!(
            "{} of {} exceeds the {} limit of a log frame",
            what,
            len,
            u32::MAX
        ))
    })
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> StorageResult<()> {
    buf.extend_from_slice(&encoded_len(bytes.len(), "field")?.to_le_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

fn read_bytes<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    let mut buf = Vec::new();
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "Field shorter than its length prefix",
        ));
    }
    Ok(buf)
}

fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let buf = read_bytes(reader)?;
    String::from_utf8(buf)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {}", e)))
}
