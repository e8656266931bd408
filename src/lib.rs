//! # git-strata
//!
//! Derives queryable views from a repository's file-change history: a
//! directory tree with activity counts, a directory x time activity grid, a
//! co-change coupling index, per-file health scores and a timeline
//! visibility view.
//!
//! ```text
//! git repository ──> analyzer ──> FileChangeEvent[]
//!                                      │
//!                  ┌───────────────────┼─────────────────────┐
//!                  v                   v                     v
//!                tree            coupling edges          lifecycle
//!                  │                   │                     │
//!                  v                   v                     v
//!          activity grid        coupling index         health scores
//!                                                            │
//!                                                            v
//!                                                     temporal views
//! ```

pub mod activity;
pub mod analyzer;
pub mod cancel;
pub mod config;
pub mod coupling;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod model;
pub mod pipeline;
pub mod temporal;
pub mod time_bin;
pub mod tree;

pub use error::{Result, StrataError};
pub use model::{ChangeStatus, CouplingEdge, FileChangeEvent, RepositoryHistory, Timestamp};
