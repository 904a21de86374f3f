//! Grade aggregation and population rollups.
//!
//! Score entries are classified into weighted categories, averaged per
//! learner or per class, and rolled up into pass-rate statistics. The
//! [`analyzer`] module wires a record source in front of that pipeline.

pub mod aggregate;
pub mod analyzer;
pub mod classify;
pub mod types;
pub mod utility;
pub mod weighted;
