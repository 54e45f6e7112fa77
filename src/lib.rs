pub mod analyzers;
pub mod coerce;
pub mod config;
pub mod fetch;
pub mod infra;
pub mod output;
pub mod parser;
pub mod period;
pub mod record;
pub mod services;
