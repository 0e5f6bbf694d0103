//! Scanrelay Core Library
//!
//! Submits accessibility scans to a remote scanner, polls them to a terminal
//! state with bounded backoff, and reconciles the results into a report.

pub mod types;
pub mod error;
pub mod http;
pub mod client;
pub mod service;
pub mod config;
pub mod backoff;
pub mod progress;
pub mod poller;
pub mod reconcile;
pub mod report;
pub mod scanner;
pub mod store;

pub use types::*;
pub use error::{ScanError, Result};
pub use service::ScanService;
pub use client::{CancelAck, RawResult, RawViolation, RemoteStatus, ScannerClient, ScannerTimeouts, StatusReport, Submission};
pub use report::{IssueSummary, ScanReport};
pub use scanner::Scanner;
pub use http::HttpClient;
pub use store::{FileJobStore, JobStore, MemoryJobStore};
pub use config::{Config, PollingConfig, ScannerConfig, StoreConfig, StoreKind};
pub use backoff::{Backoff, BackoffPolicy};
pub use progress::{ProgressScale, ProgressUpdate};
pub use poller::Poller;
