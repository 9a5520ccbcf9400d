use std::collections::VecDeque;

use crate::types::{ActivityEvent, ConnectionStatus, TrafficPacket};

pub const DEFAULT_HISTORY_CAPACITY: usize = 200;
pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Fixed-capacity, insertion-ordered buffer of accepted packets.
///
/// Oldest entries are dropped once the capacity is reached. Timestamps are
/// opaque, so nothing is ever sorted or deduplicated.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    /// Maximum number of packets kept
    capacity: usize,
    /// Oldest first
    packets: VecDeque<TrafficPacket>,
}

impl HistoryStore {
    /// Create an empty store. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            packets: VecDeque::with_capacity(capacity),
        }
    }

    /// Add a packet at the newest end, evicting the oldest when full.
    pub fn append(&mut self, packet: TrafficPacket) {
        if self.packets.len() >= self.capacity {
            self.packets.pop_front();
        }
        self.packets.push_back(packet);
    }

    /// Most recently appended packet, if any.
    pub fn latest(&self) -> Option<&TrafficPacket> {
        self.packets.back()
    }

    /// Copy of the buffer, oldest first.
    pub fn snapshot(&self) -> Vec<TrafficPacket> {
        self.packets.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrafficPacket> {
        self.packets.iter()
    }

    /// The last `n` packets (fewer if the store is shorter), oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &TrafficPacket> {
        self.packets.iter().skip(self.packets.len().saturating_sub(n))
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.packets.clear();
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Newest-first activity log with a fixed capacity.
#[derive(Debug, Clone)]
pub struct EventLog {
    capacity: usize,
    events: VecDeque<ActivityEvent>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, event: ActivityEvent) {
        self.events.push_front(event);
        self.events.truncate(self.capacity);
    }

    /// Copy of the log, newest first.
    pub fn snapshot(&self) -> Vec<ActivityEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityEvent> {
        self.events.iter()
    }

    pub fn newest(&self) -> Option<&ActivityEvent> {
        self.events.front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

/// Everything a rendering layer may read. Only the connection manager writes it.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub(crate) status: ConnectionStatus,
    pub(crate) history: HistoryStore,
    pub(crate) log: EventLog,
    /// Packets accepted since startup, across sessions and evictions
    pub(crate) accepted: u64,
}

impl DashboardState {
    pub fn new(history_capacity: usize, log_capacity: usize) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            history: HistoryStore::new(history_capacity),
            log: EventLog::new(log_capacity),
            accepted: 0,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn latest(&self) -> Option<&TrafficPacket> {
        self.history.latest()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }
}
