//! Unique-identifier allocation.
//!
//! Every emitted SML object needs a machine-safe identifier that is unique
//! across the whole output, case-insensitively, and at most 63 characters
//! long. [`NameRegistry`] hands these out and remembers, per source object
//! (its verbose key), which identifier it received so later passes can look
//! it up again.
//!
//! ```
//! use bim2sml::names::{key, NameRegistry, NameRequest, ObjectKind};
//!
//! let mut names = NameRegistry::default();
//! let verbose = key::measure("Sales", "Total Sales");
//! let allocation = names.allocate(&NameRequest::new(
//!     "Total Sales",
//!     &verbose,
//!     ObjectKind::Metric,
//!     "Sales",
//! ));
//! assert_eq!(allocation.name, "Total_Sales_Sales");
//! assert_eq!(names.lookup(&verbose), Some("Total_Sales_Sales"));
//! ```

pub mod key;
mod registry;

pub use registry::{
    sanitize, Allocation, NameRegistry, NameRequest, NameResolution, ObjectKind, Registration,
};
