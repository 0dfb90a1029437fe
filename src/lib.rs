//! # single-diffexpr
//!
//! Differential expression statistics between two row selections of a numeric dataset, part of
//! the single-rust ecosystem.
//!
//! For every dimension (gene) of a dataset this crate computes the mean and median of two user
//! selections, optionally min-max normalized with dataset-wide ranges, and a difference score
//! rounded half-up to a fixed number of decimals. Datasets can be dense ([`ndarray`]) or sparse
//! (`CsrMatrix` from nalgebra-sparse).
//!
//! ## Core Features
//!
//! - **Bulk statistics**: exact per-dimension means and medians of both selections
//! - **Single-cell mode**: means derived from a cluster × gene average expression matrix,
//!   weighted by how many selected cells fall into each cluster
//! - **Range caching**: per-dimension minima and maxima, persisted in the dataset's property store
//! - **Result tables**: ranking, name filtering, N/A-aware sorting and CSV export
//!
//! ## Quick Start
//!
//! Build a [`DiffExprSession`], set both selections and call [`DiffExprSession::compute`] with
//! [`AggregationMode::Bulk`]. The stateless entry point is
//! [`engine::compute_differential_expression`].
//!
//! ## Module Organization
//!
//! - **[`data`]**: dataset abstraction, dense / sparse / average expression datasets, properties
//! - **[`statistics`]**: range scan, selection aggregation, cluster-weighted averaging, rounding
//! - **[`engine`]**: the differential computation and the interactive session around it
//! - **[`io`]**: average expression loading and result export
//! - **[`result`]**, **[`selection`]**, **[`config`]**, **[`progress`]**, **[`error`]**

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod io;
pub mod progress;
pub mod result;
pub mod selection;
pub mod statistics;

pub use config::DiffExprConfig;
pub use data::{AverageExpression, DenseDataset, NumericMatrixSource, SparseDataset};
pub use engine::{AggregationMode, ComputeOptions, ComputeState, DiffExprSession};
pub use error::{DiffExprError, Result};
pub use result::{ResultRow, ResultTable};
pub use selection::{PersistedState, Selection, SelectionMapping};
pub use statistics::cluster::{Cluster, ClusterAssignment};
pub use statistics::range::DimensionRangeCache;
