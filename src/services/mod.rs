//! Seams to external analytics services.

pub mod report_api;
