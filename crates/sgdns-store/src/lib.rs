pub mod error;
pub mod gc;
pub mod kv;
pub mod lock;
pub mod memory;
pub mod queue;

pub use error::StoreError;
pub use gc::{gc_marker_key, GcMarker, GcMarkerStore};
pub use kv::KvStore;
pub use lock::{sg_lock_key, KvLockStore, LockStore, RetryingLockStore};
pub use memory::{InMemoryKvStore, InMemoryQueue};
pub use queue::Queue;
