mod encoding;
pub mod store;

pub use store::{RedbStore, StoreStats};
