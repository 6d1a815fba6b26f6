//! Service core of the Custodian Economy staff portal.
//!
//! CRUD-style orchestration over a pluggable record store: a metrics and
//! activity layer, a content search engine, a brand-test comparison engine,
//! and a backup/recovery subsystem. The view layer (website + staff portal
//! UI) lives elsewhere and talks to this crate through [`Portal`].
//!
//! Storage is remote-first with a silent local fallback: when the remote
//! record service is configured, every successful write is mirrored into the
//! local SQLite store, and any remote failure downgrades to the local copy
//! without surfacing an error.

pub mod config;
pub mod error;
pub mod export;
pub mod notification;
mod portal;
pub mod scheduler;
pub mod services;
pub mod storage;
pub mod types;
mod util;

pub use config::{load_config, update_config, PortalConfig};
pub use error::{FailureReport, FieldError, PortalError};
pub use portal::Portal;
