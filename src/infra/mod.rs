pub mod ga4;
pub mod keys;
