#![doc = include_str!("../README.md")]

#[cfg(feature = "test-util")]
pub use turnstile_core::test;
pub use turnstile_core::{
    aggregate,
    aggregate::{Aggregate, AggregateRoot, Handle, ReplayError},
    concurrency,
    concurrency::ConcurrencyConflict,
    event,
    event::{Change, DomainEvent, EventDecodeError, EventKind, EventSet, Recorded, Version},
    repository,
    repository::{Repository, RepositoryError},
    translator,
    translator::{AggregateTranslator, ReconstituteError},
};

pub mod building;

pub mod store {
    pub use turnstile_core::store::{
        AppendError, AppendOutcome, EventStore, NonEmpty, StoredEvent, check_batch_versions,
        inmemory,
    };
}
