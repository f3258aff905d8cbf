//! Domain model (tenant ids, queue entries, outcomes, events).

pub mod entry;
pub mod events;
pub mod outcome;
pub mod tenant;

pub use entry::Entry;
pub use events::SweepEvent;
pub use outcome::OutcomeKind;
pub use tenant::TenantId;
