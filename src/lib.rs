//! # bim2sml
//!
//! Converts a tabular semantic model (a `.bim` document) into SML
//! semantic-layer objects.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 bim::Database (source)                   │
//! │      (tables, columns, measures, partitions, ...)        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [classify]
//! ┌─────────────────────────────────────────────────────────┐
//! │        TableLists (fact / dimension / unused)            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [resolve + expr + names]
//! ┌─────────────────────────────────────────────────────────┐
//! │   datasets, metrics, metric calcs, dimensions,           │
//! │   relationships, perspectives + diagnostics              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [convert]
//! ┌─────────────────────────────────────────────────────────┐
//! │              Conversion (sml::* objects)                 │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Reading the source document and writing SML files are left to the caller:
//! source types implement `Deserialize`, target types implement `Serialize`.

pub mod bim;
pub mod classify;
pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod error;
pub mod expr;
pub mod names;
pub mod resolve;
pub mod sml;

pub use convert::{convert, convert_with_settings, Conversion};
pub use diagnostics::{Diagnostic, Severity};
pub use error::{ConvertError, ConvertResult};
