//! Queue module: expiry heap, per-path records, retry policy.

mod heap;
mod record;
mod retry;
mod state;

pub use heap::ExpiryQueue;
pub use record::DirectoryRecord;
pub use retry::RetryPolicy;
pub use state::DirectoryState;
