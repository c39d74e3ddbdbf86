//! Bounded FIFO ring buffers, one per event kind. Each buffer owns its own
//! mutex; there is never a cross-buffer lock (§5).

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::event::ConsoleLevel;
use crate::event::Event;

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub min_level: Option<ConsoleLevel>,
    pub limit: Option<usize>,
    pub match_substr: Option<String>,
    pub since_ts: Option<i64>,
}

/// Whether a buffer's default read order surfaces the newest or the oldest
/// entry first. Logs/errors favor newest-first (recency matters most);
/// waterfall/timeline favor oldest-first by start time (causality matters
/// most).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOrder {
    NewestFirst,
    OldestFirst,
}

pub struct RingBuffer {
    capacity: usize,
    order: ReadOrder,
    entries: Mutex<VecDeque<Event>>,
}

impl RingBuffer {
    pub fn new(capacity: usize, order: ReadOrder) -> Self {
        Self {
            capacity,
            order,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// O(1) append; drops the oldest entry silently on overflow. Never
    /// blocks the caller beyond the brief mutex hold.
    pub fn append(&self, event: Event) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(event);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a filtered copy. `limit` is clamped to the buffer's capacity
    /// so a caller can never force an unbounded allocation.
    pub fn snapshot(&self, filter: &EventFilter) -> Vec<Event> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut items: Vec<Event> = entries
            .iter()
            .filter(|e| match (filter.min_level, e.console_level()) {
                (Some(min), Some(level)) => level >= min,
                (Some(_), None) => true,
                (None, _) => true,
            })
            .filter(|e| match filter.since_ts {
                Some(since) => e.timestamp >= since,
                None => true,
            })
            .filter(|e| match &filter.match_substr {
                Some(needle) => e.searchable_text().contains(needle.as_str()),
                None => true,
            })
            .cloned()
            .collect();

        if self.order == ReadOrder::NewestFirst {
            items.reverse();
        }

        let limit = filter.limit.unwrap_or(self.capacity).min(self.capacity);
        items.truncate(limit);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ConsoleLog;
    use crate::event::EventPayload;

    fn log_event(message: &str, level: ConsoleLevel) -> Event {
        Event::new(
            "console",
            EventPayload::ConsoleLog(ConsoleLog {
                level,
                message: message.to_string(),
                source: None,
                line: None,
                column: None,
                stack: None,
            }),
        )
    }

    #[test]
    fn overflow_drops_oldest() {
        let buf = RingBuffer::new(2, ReadOrder::OldestFirst);
        buf.append(log_event("a", ConsoleLevel::Log));
        buf.append(log_event("b", ConsoleLevel::Log));
        buf.append(log_event("c", ConsoleLevel::Log));
        assert_eq!(buf.len(), 2);
        let snap = buf.snapshot(&EventFilter::default());
        assert_eq!(snap[0].searchable_text(), "b");
        assert_eq!(snap[1].searchable_text(), "c");
    }

    #[test]
    fn newest_first_order_reverses() {
        let buf = RingBuffer::new(10, ReadOrder::NewestFirst);
        buf.append(log_event("a", ConsoleLevel::Log));
        buf.append(log_event("b", ConsoleLevel::Log));
        let snap = buf.snapshot(&EventFilter::default());
        assert_eq!(snap[0].searchable_text(), "b");
        assert_eq!(snap[1].searchable_text(), "a");
    }

    #[test]
    fn clear_empties_buffer() {
        let buf = RingBuffer::new(10, ReadOrder::OldestFirst);
        buf.append(log_event("a", ConsoleLevel::Log));
        buf.clear();
        assert_eq!(buf.len(), 0);
        assert!(buf.snapshot(&EventFilter::default()).is_empty());
    }

    #[test]
    fn min_level_filters_out_lower_severity() {
        let buf = RingBuffer::new(10, ReadOrder::OldestFirst);
        buf.append(log_event("info msg", ConsoleLevel::Info));
        buf.append(log_event("err msg", ConsoleLevel::Error));
        let filter = EventFilter {
            min_level: Some(ConsoleLevel::Error),
            ..Default::default()
        };
        let snap = buf.snapshot(&filter);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].searchable_text(), "err msg");
    }

    #[test]
    fn limit_is_clamped_to_capacity() {
        let buf = RingBuffer::new(3, ReadOrder::OldestFirst);
        for i in 0..3 {
            buf.append(log_event(&i.to_string(), ConsoleLevel::Log));
        }
        let filter = EventFilter {
            limit: Some(1000),
            ..Default::default()
        };
        let snap = buf.snapshot(&filter);
        assert_eq!(snap.len(), 3);
    }
}
