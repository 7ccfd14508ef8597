//! Accessibility annotation for a chat web client
//!
//! This crate holds everything that does not need a browser: reading and
//! cleaning message content, deciding which inserted nodes are new messages,
//! writing accessible labels, and the activation state machine that drives it.
//!
//! The page is reached only through the [`dom::HostDom`] trait, and spoken
//! output only through [`notify::NotificationSink`]. The wasm app implements
//! both against the real document; tests use [`dom::MemoryDom`] and
//! [`notify::RecordingSink`].
//!
//! - `sanitize`: phone number and whitespace cleanup
//! - `extract`: ordered content strategies for one message
//! - `classify`: bulk and tail guards over a mutation batch
//! - `annotate`: idempotent labeling pass
//! - `engine`: activation, debounce, settle delay and announcements

pub mod annotate;
pub mod classify;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod extract;
pub mod locale;
pub mod marks;
pub mod notify;
pub mod rate_limit;
pub mod sanitize;

pub use annotate::PassReport;
pub use classify::{Candidate, Direction};
pub use config::EngineConfig;
pub use dom::{HostDom, MemoryDom, MutationBatch, MutationRecord, NodeId};
pub use engine::{AnnotationEngine, EngineState, TickReport};
pub use error::{A11yError, DomError};
pub use extract::extract;
pub use locale::{Locale, Strings};
pub use marks::NodeMarks;
pub use notify::{NotificationSink, RecordingSink};
pub use rate_limit::{AnnouncementLimiter, RateLimitConfig, RateLimitResult};
pub use sanitize::sanitize;
