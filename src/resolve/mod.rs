//! Resolvers turning source objects into SML objects.
//!
//! Every resolver takes the shared [`ConversionContext`] by `&mut` and appends
//! to its output. They run in a fixed order (see [`crate::convert`]) because
//! later passes look up identifiers allocated by earlier ones.

mod context;
pub mod dataset;
pub mod dimension;
mod graph;
pub mod measure;
pub mod mquery;
pub mod perspective;
pub mod relationship;

pub use context::{ConversionContext, Output};
pub use graph::DimensionGraph;
