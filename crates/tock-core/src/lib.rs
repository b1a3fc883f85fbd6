//! tock-core - Core library for tock
//!
//! Models, the local replica store, the remote entity service, and the
//! reconciliation engine shared by every tock interface.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod reports;
pub mod services;
pub mod sync;
pub mod timer;
pub mod util;

pub use error::{Error, Result};
pub use services::LocalStore;
