//! In-memory log buffer for the admin dashboard
//!
//! Keeps the newest records in a bounded ring and broadcasts every record
//! to live subscribers (the SSE log stream).

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

/// Records kept in memory
const DEFAULT_CAPACITY: usize = 1000;

/// Broadcast channel capacity for live streams
const STREAM_CAPACITY: usize = 256;

/// A single captured log record
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Aggregate view over the buffered records
#[derive(Debug, Clone, Serialize)]
pub struct LogStats {
    pub buffered: usize,
    pub capacity: usize,
    pub active_streams: usize,
    pub by_level: BTreeMap<String, usize>,
}

/// Bounded in-memory log store with live subscriptions
#[derive(Clone)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEvent>>>,
    sender: broadcast::Sender<LogEvent>,
    stream_count: Arc<AtomicUsize>,
    capacity: usize,
}

impl LogBuffer {
    /// Create a buffer with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a buffer with custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(STREAM_CAPACITY);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            sender,
            stream_count: Arc::new(AtomicUsize::new(0)),
            capacity,
        }
    }

    /// Append a record, evicting the oldest when full.
    pub fn push(&self, event: LogEvent) {
        {
            let mut entries = self.entries.lock().unwrap();
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(event.clone());
        }

        // No subscribers is the normal case
        let _ = self.sender.send(event);
    }

    /// The newest `limit` records in chronological order, optionally
    /// narrowed to one level.
    pub fn recent(&self, limit: usize, level: Option<&str>) -> Vec<LogEvent> {
        let entries = self.entries.lock().unwrap();

        let matching: Vec<&LogEvent> = entries
            .iter()
            .filter(|e| level.map_or(true, |l| e.level.eq_ignore_ascii_case(l)))
            .collect();

        matching
            .into_iter()
            .rev()
            .take(limit)
            .rev()
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> LogStats {
        let entries = self.entries.lock().unwrap();

        // Standard levels always appear, dashboards rely on stable keys
        let mut by_level: BTreeMap<String, usize> = ["ERROR", "WARN", "INFO", "DEBUG", "TRACE"]
            .into_iter()
            .map(|level| (level.to_string(), 0))
            .collect();
        for event in entries.iter() {
            *by_level.entry(event.level.clone()).or_insert(0) += 1;
        }

        LogStats {
            buffered: entries.len(),
            capacity: self.capacity,
            active_streams: self.stream_count.load(Ordering::SeqCst),
            by_level,
        }
    }

    /// Subscribe to records appended after this call.
    pub fn subscribe(&self) -> LogStream {
        let receiver = self.sender.subscribe();
        self.stream_count.fetch_add(1, Ordering::SeqCst);

        LogStream {
            receiver,
            stream_count: self.stream_count.clone(),
        }
    }

    pub fn active_streams(&self) -> usize {
        self.stream_count.load(Ordering::SeqCst)
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Live subscription to the log buffer
pub struct LogStream {
    receiver: broadcast::Receiver<LogEvent>,
    stream_count: Arc<AtomicUsize>,
}

impl LogStream {
    /// Receive the next record. Lagged gaps are skipped.
    pub async fn recv(&mut self) -> Option<LogEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!("Log stream lagged, {} records missed", count);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return None;
                }
            }
        }
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        self.stream_count.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(level: &str, message: &str) -> LogEvent {
        LogEvent {
            timestamp: Utc::now(),
            level: level.to_string(),
            target: "core_auth::test".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let buffer = LogBuffer::with_capacity(3);

        for i in 0..5 {
            buffer.push(event("INFO", &format!("message {}", i)));
        }

        let recent = buffer.recent(10, None);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].message, "message 2");
        assert_eq!(recent[2].message, "message 4");
    }

    #[test]
    fn test_recent_filters_by_level() {
        let buffer = LogBuffer::new();
        buffer.push(event("INFO", "a"));
        buffer.push(event("ERROR", "b"));
        buffer.push(event("INFO", "c"));

        let errors = buffer.recent(10, Some("error"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "b");

        let all = buffer.recent(2, None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].message, "b");
        assert_eq!(all[1].message, "c");
    }

    #[test]
    fn test_stats_counts_levels_and_streams() {
        let buffer = LogBuffer::new();
        buffer.push(event("INFO", "a"));
        buffer.push(event("INFO", "b"));
        buffer.push(event("WARN", "c"));

        let stream = buffer.subscribe();
        let stats = buffer.stats();

        assert_eq!(stats.buffered, 3);
        assert_eq!(stats.by_level.get("INFO"), Some(&2));
        assert_eq!(stats.by_level.get("WARN"), Some(&1));
        // quiet levels still report a zero
        assert_eq!(stats.by_level.get("ERROR"), Some(&0));
        assert_eq!(stats.active_streams, 1);

        drop(stream);
        assert_eq!(buffer.active_streams(), 0);
    }

    #[tokio::test]
    async fn test_stream_receives_new_records() {
        let buffer = LogBuffer::new();
        let mut stream = buffer.subscribe();

        buffer.push(event("INFO", "live"));

        let received = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            stream.recv(),
        )
        .await
        .expect("stream should yield")
        .expect("channel should be open");
        assert_eq!(received.message, "live");
    }
}
