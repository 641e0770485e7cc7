//! Bit-packed unique id generation.
//!
//! Every account id is a 64-bit value composed of a millisecond timestamp
//! offset, a datacenter id, a worker id, and a per-millisecond sequence.
//! Allocation is serialized through a single mutex so ids from one worker are
//! strictly unique and time-ordered. Running more than one instance requires
//! each to be configured with a distinct (worker id, datacenter id) pair;
//! nothing here verifies that assignment.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Epoch for the timestamp field: 2020-01-01T00:00:00Z.
///
/// With 41 bits of millisecond offset the field lasts until ~2089, after
/// which `next_id` fails with [`IdError::TimestampOverflow`] instead of
/// wrapping into the sign bit.
const EPOCH_MILLIS: i64 = 1_577_836_800_000;

const WORKER_ID_BITS: u32 = 5;
const DATACENTER_ID_BITS: u32 = 5;
const SEQUENCE_BITS: u32 = 12;
const TIMESTAMP_BITS: u32 = 41;

pub const MAX_WORKER_ID: u64 = (1 << WORKER_ID_BITS) - 1;
pub const MAX_DATACENTER_ID: u64 = (1 << DATACENTER_ID_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const MAX_TIMESTAMP_DELTA: i64 = (1 << TIMESTAMP_BITS) - 1;

const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;
const DATACENTER_ID_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS + DATACENTER_ID_BITS;

#[derive(Debug, Error)]
pub enum IdError {
    #[error("worker id {0} is out of range [0, {MAX_WORKER_ID}]")]
    InvalidWorkerId(u64),
    #[error("datacenter id {0} is out of range [0, {MAX_DATACENTER_ID}]")]
    InvalidDatacenterId(u64),
    #[error("clock moved backwards, refusing to generate an id for {0} ms")]
    ClockRegression(i64),
    #[error("timestamp offset {0} no longer fits the {TIMESTAMP_BITS}-bit field")]
    TimestampOverflow(i64),
}

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

fn system_clock() -> i64 {
    // Millisecond wall clock; regressions are detected per call, not here.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(0))
}

struct IdWorkerState {
    last_timestamp: i64,
    sequence: u64,
}

/// Mutex-serialized snowflake-style id generator.
pub struct IdWorker {
    worker_id: u64,
    datacenter_id: u64,
    clock: Clock,
    state: Mutex<IdWorkerState>,
}

impl std::fmt::Debug for IdWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdWorker")
            .field("worker_id", &self.worker_id)
            .field("datacenter_id", &self.datacenter_id)
            .finish_non_exhaustive()
    }
}

impl IdWorker {
    /// Create a generator for the given worker/datacenter pair.
    ///
    /// # Errors
    /// Fails when either id exceeds its field width; callers should treat
    /// this as fatal at startup.
    pub fn new(worker_id: u64, datacenter_id: u64) -> Result<Self, IdError> {
        Self::with_clock(worker_id, datacenter_id, Box::new(system_clock))
    }

    fn with_clock(worker_id: u64, datacenter_id: u64, clock: Clock) -> Result<Self, IdError> {
        if worker_id > MAX_WORKER_ID {
            return Err(IdError::InvalidWorkerId(worker_id));
        }
        if datacenter_id > MAX_DATACENTER_ID {
            return Err(IdError::InvalidDatacenterId(datacenter_id));
        }

        Ok(Self {
            worker_id,
            datacenter_id,
            clock,
            state: Mutex::new(IdWorkerState {
                last_timestamp: -1,
                sequence: 0,
            }),
        })
    }

    #[cfg(test)]
    fn with_clock_for_test<F>(worker_id: u64, datacenter_id: u64, clock: F) -> Result<Self, IdError>
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        Self::with_clock(worker_id, datacenter_id, Box::new(clock))
    }

    /// Allocate the next id.
    ///
    /// # Errors
    /// Returns [`IdError::ClockRegression`] when the wall clock reads earlier
    /// than the last issued timestamp, and [`IdError::TimestampOverflow`]
    /// when the timestamp offset no longer fits its field. Both leave the
    /// generator unable to issue ordered ids until the clock recovers.
    pub fn next_id(&self) -> Result<u64, IdError> {
        // Composition only reads the captured locals, so the lock is held
        // just long enough to pick (timestamp, sequence).
        let (timestamp, sequence) = {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);

            let mut timestamp = (self.clock)();
            if timestamp < state.last_timestamp {
                return Err(IdError::ClockRegression(state.last_timestamp - timestamp));
            }

            if timestamp == state.last_timestamp {
                state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
                if state.sequence == 0 {
                    // Sequence exhausted for this millisecond: busy-poll
                    // until the clock ticks over.
                    timestamp = self.until_next_millis(state.last_timestamp);
                }
            } else {
                state.sequence = 0;
            }

            state.last_timestamp = timestamp;
            (timestamp, state.sequence)
        };

        let delta = timestamp - EPOCH_MILLIS;
        if !(0..=MAX_TIMESTAMP_DELTA).contains(&delta) {
            return Err(IdError::TimestampOverflow(delta));
        }

        #[allow(clippy::cast_sign_loss)]
        let id = ((delta as u64) << TIMESTAMP_SHIFT)
            | (self.datacenter_id << DATACENTER_ID_SHIFT)
            | (self.worker_id << WORKER_ID_SHIFT)
            | sequence;

        Ok(id)
    }

    fn until_next_millis(&self, last_timestamp: i64) -> i64 {
        loop {
            let timestamp = (self.clock)();
            if timestamp > last_timestamp {
                return timestamp;
            }
            std::hint::spin_loop();
        }
    }
}
