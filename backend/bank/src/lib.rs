//! # Bank
//!
//! Shared data layer for the library: models, static reference data, the
//! store client and the in-memory catalog. The server and the operator CLI
//! both build on it.
//!
//! ## Flow
//! - Store rows (snake_case) are mapped into models in [`rows`]
//! - [`snapshot::Catalog`] holds the fetched lists, newest first
//! - Grades and subjects never hit the store, see [`reference`]
pub mod credentials;
pub mod models;
pub mod reference;
pub mod remote;
pub mod rows;
pub mod snapshot;
pub mod utils;

pub use remote::StoreClient;
pub use snapshot::Catalog;
