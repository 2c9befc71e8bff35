//! # annex-core
//!
//! Identifier management and concurrency layer for approximate-nearest-
//! neighbor vector indexes.
//!
//! Callers address vectors by an opaque, caller-assigned string key
//! ("uuid") instead of the engine's internal numeric object id, while a
//! reader/writer guard coordinates safe concurrent access to a native
//! index handle that does not tolerate unsynchronized mutation.
//!
//! Two layers, leaves first:
//!
//! - [`handle::IndexHandle`] owns one native index resource and exposes
//!   synchronized primitive operations with no knowledge of caller-level
//!   identifiers.
//! - [`service::IndexService`] owns the bijective uuid ↔ object-id
//!   mapping pair and composes guard calls into uuid-addressable CRUD,
//!   search and index lifecycle operations.
//!
//! The ANN algorithm itself is an external collaborator consumed through
//! the [`engine::AnnEngine`] trait; [`engine::flat::FlatEngine`] is the
//! in-tree exact-scan reference implementation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use annex_core::{IndexConfig, IndexService, DEFAULT_EPSILON, DEFAULT_RADIUS};
//!
//! fn main() -> annex_core::Result<()> {
//!     let config = IndexConfig::new("./vectors.idx", 3);
//!     let service = IndexService::new(&config)?;
//!
//!     service.insert("doc-1", &[0.1, 0.2, 0.3])?;
//!     service.insert("doc-2", &[0.3, 0.2, 0.1])?;
//!     service.create_and_save_index(4)?;
//!
//!     let response = service.search(&[0.1, 0.2, 0.3], 5, DEFAULT_EPSILON, DEFAULT_RADIUS)?;
//!     for hit in &response.hits {
//!         println!("{} at {}", hit.uuid, hit.distance);
//!     }
//!
//!     service.close();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
// Clippy lints configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(
    test,
    allow(clippy::uninlined_format_args, clippy::single_match_else)
)]

pub mod config;
pub mod distance;
pub mod engine;
pub mod error;
pub mod handle;
pub mod idmap;
pub mod object;
pub mod service;

#[cfg(test)]
mod handle_tests;

pub use config::IndexConfig;
pub use distance::DistanceMetric;
pub use engine::{AnnEngine, EngineError, EngineResult, RawHit};
pub use error::{Error, Result};
pub use handle::{IndexHandle, SearchHit, SearchSlot};
pub use idmap::IdMap;
pub use object::ObjectKind;
pub use service::{
    BulkReport, Distance, IndexService, SearchResponse, DEFAULT_EPSILON, DEFAULT_RADIUS,
};
