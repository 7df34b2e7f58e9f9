// ── Reactive data store ──
//
// Concurrent entity storage with push-based change notification, plus
// the lu_sdata merge that is its only writer.

mod collection;
mod data_store;
mod merge;

pub use data_store::DataStore;
pub(crate) use merge::apply_sync;
