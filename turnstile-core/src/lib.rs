//! Core traits and types for the turnstile event-sourcing kernel.
//!
//! This crate provides the domain-agnostic building blocks:
//!
//! - [`event`] - Event payload traits (`DomainEvent`, `EventSet`), versions
//!   and the `Change`/`Recorded` event values
//! - [`aggregate`] - Command-side primitives (`Aggregate`, `Handle`) and the
//!   generic `AggregateRoot` (replay, record, pending-event extraction)
//! - [`translator`] - Conversion between aggregates and stored event streams
//! - [`store`] - Persisted event schema and the `EventStore` contract
//! - [`repository`] - Load, execute and commit orchestration (`Repository`)
//! - [`concurrency`] - Optimistic concurrency conflicts
//!
//! # Example
//!
//! ```
//! use turnstile_core::{repository::Repository, store::inmemory};
//!
//! let store: inmemory::Store<String> = inmemory::Store::new();
//! let repo = Repository::new(store);
//! ```
//!
//! Most users should depend on the `turnstile` crate, which re-exports these
//! types next to the building access-control domain.

pub mod aggregate;
pub mod concurrency;
pub mod event;
pub mod repository;
pub mod store;
pub mod translator;

// Test utilities module: public when feature enabled, internal for crate tests
#[cfg(feature = "test-util")]
pub mod test;

#[cfg(all(test, not(feature = "test-util")))]
pub(crate) mod test;
