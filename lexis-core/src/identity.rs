//! Identity types for dictionary rows

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Row identifier, assigned by an [`IdGenerator`] when the caller leaves it empty.
pub type EntryId = i64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Hex encoded SHA-256 of an entry's identifying content.
pub type ContentToken = String;

/// Compute the content token of the given fields.
///
/// Fields are joined with `|` before hashing. Absent fields should be passed
/// as empty strings.
pub fn compute_content_token(fields: &[&str]) -> ContentToken {
    let mut hasher = Sha256::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update(b"|");
        }
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Source of ids for new dictionary and language rows.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> EntryId;
}

// Bit layout: 41 bits of milliseconds since the epoch, 10 bits of worker id,
// 12 bits of per-millisecond sequence.
const WORKER_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const MAX_WORKER_ID: u16 = (1 << WORKER_BITS) - 1;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;

/// 2020-01-01T00:00:00Z in unix milliseconds.
pub const DEFAULT_EPOCH_MS: i64 = 1_577_836_800_000;

/// Snowflake style generator: ids are unique per worker and increase
/// monotonically within one process.
#[derive(Debug)]
pub struct SnowflakeIdGenerator {
    worker_id: i64,
    epoch_ms: i64,
    state: Mutex<SnowflakeState>,
}

#[derive(Debug, Default)]
struct SnowflakeState {
    last_ms: i64,
    sequence: i64,
}

impl SnowflakeIdGenerator {
    /// Worker ids above 1023 are masked into range.
    pub fn new(worker_id: u16) -> Self {
        Self {
            worker_id: i64::from(worker_id & MAX_WORKER_ID),
            epoch_ms: DEFAULT_EPOCH_MS,
            state: Mutex::new(SnowflakeState::default()),
        }
    }

    pub fn worker_id(&self) -> u16 {
        self.worker_id as u16
    }

    fn now_ms(&self) -> i64 {
        (Utc::now().timestamp_millis() - self.epoch_ms).max(0)
    }
}

impl Default for SnowflakeIdGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl IdGenerator for SnowflakeIdGenerator {
    fn next_id(&self) -> EntryId {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        // A clock that steps backwards keeps issuing from the last seen millisecond.
        let mut now = self.now_ms().max(state.last_ms);
        if now == state.last_ms {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                while now <= state.last_ms {
                    std::hint::spin_loop();
                    now = self.now_ms();
                }
            }
        } else {
            state.sequence = 0;
        }
        state.last_ms = now;

        (now << (WORKER_BITS + SEQUENCE_BITS)) | (self.worker_id << SEQUENCE_BITS) | state.sequence
    }
}
