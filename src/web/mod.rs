//! HTTP service for pdf-watermark-remover
//!
//! Exposes detection, preview and cleaning over multipart uploads, plus a
//! small in-memory usage tracker.
//!
//! # Features
//!
//! - Candidate detection (`POST /analyze`)
//! - Cleaned first-page preview (`POST /preview`)
//! - Cleaned document download (`POST /process`)
//! - Usage analytics (`/analytics/track`, `/analytics/stats`, `/analytics/export`)
//!
//! # Usage
//!
//! Enable the `web` feature and use the `serve` subcommand:
//!
//! ```bash
//! cargo build --features web
//! pdf-watermark-remover serve --port 8000
//! ```

mod routes;
mod server;
mod usage;

pub use routes::{parse_form_bool, AppError, AppState, UploadForm};
pub use server::{ServerConfig, WebServer};
pub use usage::{
    client_ip, AnalyticsEvent, ClientInfo, TrackedEvent, UsageExport, UsageStats, UsageTracker,
    EVENT_FILE_DOWNLOAD, EVENT_FILE_UPLOAD, EVENT_PAGE_VISIT,
};

/// Default server port
pub const DEFAULT_PORT: u16 = crate::config::DEFAULT_PORT;

/// Default bind address
pub const DEFAULT_BIND: &str = crate::config::DEFAULT_BIND;

/// Default upload limit in bytes
pub const DEFAULT_UPLOAD_LIMIT: usize = crate::config::DEFAULT_UPLOAD_LIMIT_MB * 1024 * 1024;
