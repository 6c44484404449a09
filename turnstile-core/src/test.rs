//! Test utilities for event-sourced aggregates.
//!
//! [`TestFramework`] tests aggregate behaviour in isolation using a
//! given-when-then pattern, without an event store:
//!
//! ```ignore
//! use turnstile::test::TestFramework;
//!
//! #[test]
//! fn checking_in_twice_is_an_anomaly() {
//!     TestFramework::<Building>::given([
//!         Change::occur(id, NewBuildingWasRegistered::new("DX Solutions")),
//!         Change::occur(id, UserCheckedIn::new("Joe")),
//!     ])
//!     .when(&CheckInUser::new("Joe", &AlwaysAllow))
//!     .then_expect_events(&[
//!         CheckInAnomalyDetected::new("Joe", AnomalyReason::AlreadyCheckedIn).into(),
//!     ]);
//! }
//! ```
//!
//! The `given` history is numbered `1, 2, 3, ...` the way a store would
//! number it and then goes through the same replay path as a loaded
//! aggregate.

use std::fmt;

use crate::{
    aggregate::{Aggregate, AggregateRoot, Handle},
    event::{Change, Recorded, Version},
};

/// Test executor for aggregate testing using a given-when-then pattern.
///
/// # Type Parameters
///
/// * `A` - The aggregate type being tested
pub struct TestFramework<A: Aggregate> {
    history: Vec<Recorded<A::Id, A::Event>>,
}

impl<A: Aggregate> TestFramework<A> {
    /// Start a test scenario with previous events already applied.
    ///
    /// Pass an empty collection to start from a fresh aggregate.
    #[must_use]
    pub fn given<I>(changes: I) -> Self
    where
        I: IntoIterator<Item = Change<A::Id, A::Event>>,
    {
        Self {
            history: Vec::new(),
        }
        .and(changes)
    }

    /// Append more events to the history before executing the command.
    #[must_use]
    pub fn and<I>(mut self, changes: I) -> Self
    where
        I: IntoIterator<Item = Change<A::Id, A::Event>>,
    {
        for change in changes {
            let version = Version::after(self.history.last().map(Recorded::version));
            self.history.push(change.recorded_as(version));
        }
        self
    }

    /// Execute a command against the aggregate rebuilt from the history.
    ///
    /// # Panics
    ///
    /// Panics if the history cannot be replayed.
    #[must_use]
    #[track_caller]
    pub fn when<C>(self, command: &C) -> TestResult<A>
    where
        A: Handle<C>,
    {
        let mut root = if self.history.is_empty() {
            AggregateRoot::new()
        } else {
            match AggregateRoot::reconstitute_from_history(self.history) {
                Ok(root) => root,
                Err(error) => panic!("given history could not be replayed: {error}"),
            }
        };
        let result = root.execute(command);
        TestResult { result, root }
    }
}

impl<A> fmt::Debug for TestFramework<A>
where
    A: Aggregate,
    A::Event: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestFramework")
            .field("history", &self.history)
            .finish()
    }
}

/// Result of executing a command, ready for assertions.
pub struct TestResult<A: Aggregate> {
    result: Result<(), A::Error>,
    root: AggregateRoot<A>,
}

impl<A: Aggregate> TestResult<A> {
    fn recorded(&mut self) -> Vec<A::Event> {
        self.root
            .extract_pending_events()
            .into_iter()
            .map(Recorded::into_payload)
            .collect()
    }

    /// Assert that the command recorded exactly the expected events.
    ///
    /// # Panics
    ///
    /// Panics if:
    /// - The command returned an error
    /// - The events don't match the expected events
    #[track_caller]
    pub fn then_expect_events(mut self, expected: &[A::Event])
    where
        A::Event: PartialEq + fmt::Debug,
        A::Error: fmt::Debug,
    {
        if let Err(error) = &self.result {
            panic!("Expected events but got error: {error:?}");
        }
        let events = self.recorded();
        assert_eq!(
            events, expected,
            "Expected events did not match actual events"
        );
    }

    /// Assert that the command recorded no events.
    ///
    /// # Panics
    ///
    /// Panics if:
    /// - The command returned an error
    /// - The command recorded any events
    #[track_caller]
    pub fn then_expect_no_events(mut self)
    where
        A::Event: fmt::Debug,
        A::Error: fmt::Debug,
    {
        if let Err(error) = &self.result {
            panic!("Expected no events but got error: {error:?}");
        }
        let events = self.recorded();
        assert!(events.is_empty(), "Expected no events but got: {events:?}");
    }

    /// Assert that the command returned an error and recorded nothing.
    ///
    /// # Panics
    ///
    /// Panics if the command succeeded or left pending events behind.
    #[track_caller]
    pub fn then_expect_error(mut self)
    where
        A::Event: fmt::Debug,
    {
        let events = self.recorded();
        assert!(
            self.result.is_err(),
            "Expected error but got events: {events:?}"
        );
        assert!(
            events.is_empty(),
            "Rejected command left pending events: {events:?}"
        );
    }

    /// Assert that the command returned a specific error.
    ///
    /// # Panics
    ///
    /// Panics if:
    /// - The command succeeded
    /// - The error doesn't match the expected error
    #[track_caller]
    pub fn then_expect_error_eq(mut self, expected: &A::Error)
    where
        A::Event: fmt::Debug,
        A::Error: PartialEq + fmt::Debug,
    {
        let events = self.recorded();
        match &self.result {
            Ok(()) => panic!("Expected error but got events: {events:?}"),
            Err(error) => {
                assert_eq!(
                    error, expected,
                    "Expected error did not match actual error"
                );
            }
        }
        assert!(
            events.is_empty(),
            "Rejected command left pending events: {events:?}"
        );
    }

    /// Assert that the command returned an error containing the given message.
    ///
    /// # Panics
    ///
    /// Panics if:
    /// - The command succeeded
    /// - The error message doesn't contain the expected substring
    /// - The command left pending events behind
    #[track_caller]
    pub fn then_expect_error_message(mut self, expected_substring: &str)
    where
        A::Event: fmt::Debug,
        A::Error: fmt::Display,
    {
        let events = self.recorded();
        match &self.result {
            Ok(()) => panic!("Expected error but got events: {events:?}"),
            Err(error) => {
                let error_msg = error.to_string();
                assert!(
                    error_msg.contains(expected_substring),
                    "Expected error message to contain '{expected_substring}' but got: {error_msg}"
                );
            }
        }
        assert!(
            events.is_empty(),
            "Rejected command left pending events: {events:?}"
        );
    }

    /// Get the raw outcome for custom assertions: the recorded events (or
    /// the handler's error) together with the aggregate after the command.
    pub fn inspect_result(
        mut self,
    ) -> (Result<Vec<Recorded<A::Id, A::Event>>, A::Error>, AggregateRoot<A>) {
        let pending = self.root.extract_pending_events();
        (self.result.map(|()| pending), self.root)
    }
}

impl<A> fmt::Debug for TestResult<A>
where
    A: Aggregate + fmt::Debug,
    A::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResult")
            .field("result", &self.result)
            .field("root", &self.root)
            .finish()
    }
}
