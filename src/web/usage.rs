//! In-memory usage analytics
//!
//! Records client-reported events (page visits, uploads, downloads) and
//! derives the summary counters served by `/analytics/stats`. Nothing is
//! persisted; counters reset when the server restarts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use dashmap::DashSet;
use serde::{Deserialize, Serialize};

/// Event type counted as a visit
pub const EVENT_PAGE_VISIT: &str = "page_visit";

/// Event type counted as an upload
pub const EVENT_FILE_UPLOAD: &str = "file_upload";

/// Event type counted as a download
pub const EVENT_FILE_DOWNLOAD: &str = "file_download";

/// Events kept for export before the oldest are dropped
pub const DEFAULT_EVENT_CAPACITY: usize = 10_000;

/// Event as sent by the client
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsEvent {
    pub session_id: String,
    pub event_type: String,
    pub timestamp: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Request details recorded alongside an event
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_agent: String,
    pub ip_address: String,
}

/// Stored event, as returned by the export endpoint
#[derive(Debug, Clone, Serialize)]
pub struct TrackedEvent {
    pub session_id: String,
    pub event_type: String,
    pub timestamp: String,
    pub file_size: Option<u64>,
    pub file_name: Option<String>,
    pub user_agent: String,
    pub ip_address: String,
    /// Server receive time (RFC 3339)
    pub received_at: String,
}

/// Summary counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    /// Distinct sessions that reported a page visit
    pub unique_visitors: u64,
    pub total_uploads: u64,
    pub total_downloads: u64,
    pub total_events: u64,
}

/// Export payload
#[derive(Debug, Clone, Serialize)]
pub struct UsageExport {
    pub data: Vec<TrackedEvent>,
    pub total: usize,
}

/// Thread-safe usage tracker
pub struct UsageTracker {
    visitors: DashSet<String>,
    uploads: AtomicU64,
    downloads: AtomicU64,
    total: AtomicU64,
    events: Mutex<VecDeque<TrackedEvent>>,
    capacity: usize,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            visitors: DashSet::new(),
            uploads: AtomicU64::new(0),
            downloads: AtomicU64::new(0),
            total: AtomicU64::new(0),
            events: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Record one event
    pub fn track(&self, event: AnalyticsEvent, client: ClientInfo) {
        self.total.fetch_add(1, Ordering::Relaxed);
        match event.event_type.as_str() {
            EVENT_PAGE_VISIT => {
                self.visitors.insert(event.session_id.clone());
            }
            EVENT_FILE_UPLOAD => {
                self.uploads.fetch_add(1, Ordering::Relaxed);
            }
            EVENT_FILE_DOWNLOAD => {
                self.downloads.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        let tracked = TrackedEvent {
            session_id: event.session_id,
            event_type: event.event_type,
            timestamp: event.timestamp,
            file_size: event.file_size,
            file_name: event.file_name,
            user_agent: client.user_agent,
            ip_address: client.ip_address,
            received_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Ok(mut events) = self.events.lock() {
            if events.len() >= self.capacity {
                events.pop_front();
            }
            events.push_back(tracked);
        }
    }

    pub fn stats(&self) -> UsageStats {
        UsageStats {
            unique_visitors: self.visitors.len() as u64,
            total_uploads: self.uploads.load(Ordering::Relaxed),
            total_downloads: self.downloads.load(Ordering::Relaxed),
            total_events: self.total.load(Ordering::Relaxed),
        }
    }

    /// Stored events, newest client timestamp first
    pub fn export(&self) -> UsageExport {
        let mut data: Vec<TrackedEvent> = self
            .events
            .lock()
            .map(|events| events.iter().cloned().collect())
            .unwrap_or_default();
        data.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        UsageExport {
            total: data.len(),
            data,
        }
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Client address from `X-Forwarded-For` (first hop) or a fallback
pub fn client_ip(forwarded_for: Option<&str>, fallback: &str) -> String {
    forwarded_for
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
