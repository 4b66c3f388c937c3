pub mod clock;
pub mod entity_store;
pub mod notifier;

pub use clock::Clock;
pub use entity_store::{
    ChangeEntry, ChangeSet, EntityStore, EntryState, LoanDetail, ReminderCandidate,
    StoreTransaction, TrackedEntity,
};
pub use notifier::Notifier;
