use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

const NODE_ID_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const MAX_NODE_ID: u64 = (1 << NODE_ID_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_LEFT_SHIFT: u64 = SEQUENCE_BITS + NODE_ID_BITS;
const EPOCH: u64 = 1288834974657;

/// Produces the `_id` of every inserted document.
///
/// Generated ids must be unique across every collection using the generator.
pub trait IdGenerator: Send + Sync {
    fn generate_id(&self) -> String;
}

#[derive(Debug, Default)]
struct SequenceState {
    last_timestamp: u64,
    sequence: u64,
}

/// Time ordered 64-bit ids, rendered as decimal strings.
///
/// An id packs the milliseconds since a fixed epoch, a random node id and a
/// per-millisecond sequence. When the sequence of one millisecond is used up
/// the generator waits for the next one; when the clock goes backwards it
/// keeps counting on the last timestamp it saw.
pub struct SnowflakeIdGenerator {
    node_id: u64,
    state: Mutex<SequenceState>,
}

impl SnowflakeIdGenerator {
    pub fn new() -> Self {
        let node_id = random_node_id();
        log::info!("Initialized id generator with node id: {}", node_id);
        SnowflakeIdGenerator {
            node_id,
            state: Mutex::new(SequenceState::default()),
        }
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    /// Next id as a number.
    pub fn next_id(&self) -> u64 {
        let mut state = self.state.lock();

        let mut timestamp = current_time_millis().max(state.last_timestamp);
        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                timestamp = wait_next_millis(state.last_timestamp);
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        (timestamp.saturating_sub(EPOCH) << TIMESTAMP_LEFT_SHIFT)
            | (self.node_id << SEQUENCE_BITS)
            | state.sequence
    }
}

impl Default for SnowflakeIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SnowflakeIdGenerator {
    fn generate_id(&self) -> String {
        self.next_id().to_string()
    }
}

fn random_node_id() -> u64 {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    let random = OsRng.gen::<u64>();
    ((bytes[bytes.len() - 1] as u64) | ((random & 0xFF) << 8)) & MAX_NODE_ID
}

fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn wait_next_millis(last_timestamp: u64) -> u64 {
    let mut timestamp = current_time_millis();
    while timestamp <= last_timestamp {
        std::thread::yield_now();
        timestamp = current_time_millis();
    }
    timestamp
}
