//! Bounded, persisted history of past evaluations.

pub mod backend;
pub mod store;

pub use backend::FileStore;
pub use store::{HistoryStore, DEFAULT_HISTORY_KEY, HISTORY_CAPACITY};
