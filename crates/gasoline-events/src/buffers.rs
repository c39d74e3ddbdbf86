//! The fixed set of ring buffers the daemon owns, one per captured event
//! kind, each independently sized and independently locked.

use crate::buffer::ReadOrder;
use crate::buffer::RingBuffer;

pub struct BufferCapacities {
    pub console_logs: usize,
    pub network_waterfall: usize,
    pub network_bodies: usize,
    pub websocket_events: usize,
    pub actions: usize,
    pub performance: usize,
    pub extension_logs: usize,
}

impl Default for BufferCapacities {
    fn default() -> Self {
        Self {
            console_logs: 2000,
            network_waterfall: 2000,
            network_bodies: 500,
            websocket_events: 1000,
            actions: 1000,
            performance: 500,
            extension_logs: 500,
        }
    }
}

/// Owns every ring buffer in the system. Each field is independently
/// lockable; cross-buffer reads (e.g. `observe(timeline)`) snapshot each in
/// turn rather than taking a shared lock.
pub struct BufferSet {
    pub console_logs: RingBuffer,
    pub network_waterfall: RingBuffer,
    pub network_bodies: RingBuffer,
    pub websocket_events: RingBuffer,
    pub actions: RingBuffer,
    pub performance: RingBuffer,
    pub extension_logs: RingBuffer,
}

impl BufferSet {
    pub fn new(capacities: BufferCapacities) -> Self {
        Self {
            console_logs: RingBuffer::new(capacities.console_logs, ReadOrder::NewestFirst),
            network_waterfall: RingBuffer::new(capacities.network_waterfall, ReadOrder::OldestFirst),
            network_bodies: RingBuffer::new(capacities.network_bodies, ReadOrder::NewestFirst),
            websocket_events: RingBuffer::new(capacities.websocket_events, ReadOrder::NewestFirst),
            actions: RingBuffer::new(capacities.actions, ReadOrder::NewestFirst),
            performance: RingBuffer::new(capacities.performance, ReadOrder::NewestFirst),
            extension_logs: RingBuffer::new(capacities.extension_logs, ReadOrder::NewestFirst),
        }
    }

    pub fn clear_all(&self) {
        self.console_logs.clear();
        self.network_waterfall.clear();
        self.network_bodies.clear();
        self.websocket_events.clear();
        self.actions.clear();
        self.performance.clear();
        self.extension_logs.clear();
    }

    /// Clears a single named buffer; `configure(clear)` supports clearing
    /// per-buffer rather than always wiping everything.
    pub fn clear_named(&self, name: &str) -> bool {
        match name {
            "logs" | "console" | "errors" => self.console_logs.clear(),
            "network_waterfall" | "waterfall" => self.network_waterfall.clear(),
            "network_bodies" => self.network_bodies.clear(),
            "websocket_events" | "websocket" => self.websocket_events.clear(),
            "actions" => self.actions.clear(),
            "performance" | "vitals" => self.performance.clear(),
            "extension_logs" => self.extension_logs.clear(),
            _ => return false,
        }
        true
    }
}

impl Default for BufferSet {
    fn default() -> Self {
        Self::new(BufferCapacities::default())
    }
}
