pub mod admin;
pub mod backend;
pub mod campaigns;
pub mod events;
pub mod leads;
pub mod popups;
pub mod schema;
pub mod settings;
pub mod sites;
pub mod subscribers;
pub mod users;

pub use backend::DuckDbBackend;

/// Re-export the `duckdb` crate so consumers (especially tests) can use
/// `pushpop_duckdb::duckdb::params!` without an extra dependency.
pub use duckdb;
