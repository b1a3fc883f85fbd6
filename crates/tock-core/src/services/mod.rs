//! Stateful services built on the database layer.

mod local_store;

pub use local_store::{CascadeSummary, LocalStore};
