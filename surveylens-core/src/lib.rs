//! # surveylens-core
//!
//! Core library for surveylens - analytics behind a store-level survey
//! dashboard.
//!
//! This library provides:
//! - The survey-response record type and its JSON decoding
//! - Time-window filtering, answer distributions and time series
//! - The feedback table (dedup, sort, column filters, star histogram)
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Data flow
//!
//! A [`SurveyResultSource`] delivers the flat record list for one shop.
//! [`DashboardAnalyticsEngine::load`] takes ownership of it, and
//! [`DashboardAnalyticsEngine::snapshot`] turns it into everything the
//! dashboard renders for one set of [`DashboardControls`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use surveylens_core::{Config, DashboardAnalyticsEngine, JsonDirSource, SurveyResultSource};
//!
//! let config = Config::load().expect("failed to load config");
//! let source = JsonDirSource::new(config.source.results_dir());
//!
//! let mut engine = DashboardAnalyticsEngine::from_config(&config.dashboard).expect("bad config");
//! engine.load(source.fetch("acme", "shibuya").expect("failed to fetch"));
//!
//! let snapshot = engine.snapshot(&config.dashboard.default_controls(), chrono::Utc::now());
//! println!("{} feedback rows", snapshot.feedback.rows.len());
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{
    AggregationUnit, CalendarZone, DashboardAnalyticsEngine, DashboardControls,
    DashboardSnapshot, FeedbackField, SortDirection, TimeWindow, WeekStart, WindowKind,
};
pub use config::Config;
pub use error::{Error, Result};
pub use source::{parse_records, JsonDirSource, SurveyResultSource};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod source;
pub mod types;
