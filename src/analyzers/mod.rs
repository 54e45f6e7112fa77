//! Report aggregation and health scoring.
//!
//! Sections query the reporting backend and reduce the rows with the
//! segment and breakdown helpers. The reduced figures feed the composite
//! scorer, whose card drives the insight rules.

pub mod analyzer;
pub mod breakdown;
pub mod cohort;
pub mod grade;
pub mod insights;
pub mod scoring;
pub mod sections;
pub mod segment;
pub mod types;
pub mod utility;
