use std::collections::BTreeSet;

use turnstile_core::{
    aggregate::{Aggregate, Handle},
    event::{Change, Recorded},
};

use super::{
    commands::{CheckInUser, CheckOutUser, RegisterBuilding},
    error::BuildingError,
    events::{
        AnomalyReason, BuildingEvent, BuildingId, CheckInAnomalyDetected,
        NewBuildingWasRegistered, UserCheckedIn, UserCheckedOut,
    },
    policy::AccessPolicy,
};

type BuildingChanges = Result<Vec<Change<BuildingId, BuildingEvent>>, BuildingError>;

/// A building guarded by a turnstile.
///
/// A building starts unregistered and becomes registered through its first
/// event. Once registered, every username is either checked in (a member of
/// `checked_in_users`) or implicitly checked out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Building {
    id: Option<BuildingId>,
    name: String,
    checked_in_users: BTreeSet<String>,
}

impl Building {
    #[must_use]
    pub const fn id(&self) -> Option<BuildingId> {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.id.is_some()
    }

    #[must_use]
    pub fn is_checked_in(&self, username: &str) -> bool {
        self.checked_in_users.contains(username)
    }

    /// Users currently inside, in name order.
    pub fn checked_in_users(&self) -> impl Iterator<Item = &str> {
        self.checked_in_users.iter().map(String::as_str)
    }

    fn registered_id(&self) -> Result<BuildingId, BuildingError> {
        self.id.ok_or(BuildingError::NotRegistered)
    }
}

fn ensure_allowed(policy: &dyn AccessPolicy, username: &str) -> Result<(), BuildingError> {
    if policy.is_allowed(username)? {
        Ok(())
    } else {
        tracing::debug!(username, "access denied by policy");
        Err(BuildingError::AccessDenied {
            username: username.to_string(),
        })
    }
}

impl Aggregate for Building {
    type Error = BuildingError;
    type Event = BuildingEvent;
    type Id = BuildingId;

    const KIND: &'static str = "building";

    fn apply(&mut self, event: &Recorded<BuildingId, BuildingEvent>) {
        match event.payload() {
            BuildingEvent::Registered(NewBuildingWasRegistered { name }) => {
                if self.id.is_none() {
                    self.id = Some(*event.aggregate_id());
                    self.name.clone_from(name);
                }
            }
            BuildingEvent::CheckedIn(UserCheckedIn { username }) => {
                self.checked_in_users.insert(username.clone());
            }
            BuildingEvent::CheckedOut(UserCheckedOut { username }) => {
                self.checked_in_users.remove(username);
            }
            BuildingEvent::AnomalyDetected(_) => {}
        }
    }

    fn opens_stream(event: &BuildingEvent) -> bool {
        matches!(event, BuildingEvent::Registered(_))
    }
}

impl Handle<RegisterBuilding> for Building {
    fn handle(&self, command: &RegisterBuilding) -> BuildingChanges {
        if self.is_registered() {
            return Err(BuildingError::AlreadyRegistered);
        }
        if command.name.trim().is_empty() {
            return Err(BuildingError::EmptyName);
        }
        Ok(vec![Change::occur(
            command.id,
            NewBuildingWasRegistered::new(command.name.clone()),
        )])
    }
}

impl Handle<CheckInUser<'_>> for Building {
    fn handle(&self, command: &CheckInUser<'_>) -> BuildingChanges {
        let id = self.registered_id()?;
        ensure_allowed(command.policy, command.username)?;

        if self.is_checked_in(command.username) {
            tracing::info!(
                building_id = %id,
                username = command.username,
                "user checked in twice"
            );
            return Ok(vec![Change::occur(
                id,
                CheckInAnomalyDetected::new(command.username, AnomalyReason::AlreadyCheckedIn),
            )]);
        }
        Ok(vec![Change::occur(id, UserCheckedIn::new(command.username))])
    }
}

impl Handle<CheckOutUser<'_>> for Building {
    fn handle(&self, command: &CheckOutUser<'_>) -> BuildingChanges {
        let id = self.registered_id()?;
        ensure_allowed(command.policy, command.username)?;

        if !self.is_checked_in(command.username) {
            tracing::info!(
                building_id = %id,
                username = command.username,
                "user checked out while not checked in"
            );
            return Ok(vec![Change::occur(
                id,
                CheckInAnomalyDetected::new(command.username, AnomalyReason::AlreadyCheckedOut),
            )]);
        }
        Ok(vec![Change::occur(id, UserCheckedOut::new(command.username))])
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use turnstile_core::{
        aggregate::{AggregateRoot, ReplayError},
        event::Version,
        test::TestFramework,
    };
    use uuid::Uuid;

    use super::*;
    use crate::building::policy::{AllowList, AlwaysAllow, DenyList, PolicyError};

    fn b1() -> BuildingId {
        BuildingId::new(Uuid::from_u128(1))
    }

    fn registered() -> Change<BuildingId, BuildingEvent> {
        Change::occur(b1(), NewBuildingWasRegistered::new("DX Solutions"))
    }

    fn checked_in(username: &str) -> Change<BuildingId, BuildingEvent> {
        Change::occur(b1(), UserCheckedIn::new(username))
    }

    struct Unreachable;

    impl AccessPolicy for Unreachable {
        fn is_allowed(&self, _username: &str) -> Result<bool, PolicyError> {
            Err(PolicyError::new(io::Error::new(
                io::ErrorKind::TimedOut,
                "directory timed out",
            )))
        }
    }

    #[test]
    fn registering_records_the_building_at_version_one() {
        let (result, root) = TestFramework::<Building>::given([])
            .when(&RegisterBuilding::new(b1(), "DX Solutions"))
            .inspect_result();

        let events = result.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].version().get(), 1);
        assert_eq!(events[0].aggregate_id(), &b1());
        assert_eq!(
            events[0].payload(),
            &NewBuildingWasRegistered::new("DX Solutions").into()
        );
        assert_eq!(root.state().id(), Some(b1()));
        assert_eq!(root.state().name(), "DX Solutions");
    }

    #[test]
    fn registering_twice_is_rejected() {
        TestFramework::<Building>::given([registered()])
            .when(&RegisterBuilding::new(b1(), "Another name"))
            .then_expect_error_message("already registered");
    }

    #[test]
    fn blank_names_are_rejected() {
        TestFramework::<Building>::given([])
            .when(&RegisterBuilding::new(b1(), "   "))
            .then_expect_error_message("must not be empty");
    }

    #[test]
    fn allowed_user_checks_in() {
        TestFramework::<Building>::given([registered()])
            .when(&CheckInUser::new("Joe", &AlwaysAllow))
            .then_expect_events(&[UserCheckedIn::new("Joe").into()]);
    }

    #[test]
    fn checking_in_twice_records_an_anomaly() {
        TestFramework::<Building>::given([registered(), checked_in("Joe")])
            .when(&CheckInUser::new("Joe", &AlwaysAllow))
            .then_expect_events(&[CheckInAnomalyDetected::new(
                "Joe",
                AnomalyReason::AlreadyCheckedIn,
            )
            .into()]);
    }

    #[test]
    fn repeated_anomalies_leave_the_checked_in_set_alone() {
        let anomaly = || {
            Change::occur(
                b1(),
                CheckInAnomalyDetected::new("Joe", AnomalyReason::AlreadyCheckedIn),
            )
        };
        let (result, root) = TestFramework::<Building>::given([registered(), checked_in("Joe")])
            .and([anomaly(), anomaly(), anomaly()])
            .when(&CheckInUser::new("Joe", &AlwaysAllow))
            .inspect_result();

        let events = result.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].version().get(), 6);
        assert_eq!(
            events[0].payload(),
            &CheckInAnomalyDetected::new("Joe", AnomalyReason::AlreadyCheckedIn).into()
        );
        assert_eq!(root.state().checked_in_users().collect::<Vec<_>>(), ["Joe"]);
    }

    #[test]
    fn denied_user_is_rejected_without_events() {
        let policy = DenyList::new(["Eve"]);
        TestFramework::<Building>::given([registered()])
            .when(&CheckInUser::new("Eve", &policy))
            .then_expect_error_message("`Eve` is not allowed");
    }

    #[test]
    fn denial_takes_precedence_over_anomalies() {
        let policy = AllowList::new(["Joe"]);
        TestFramework::<Building>::given([registered(), checked_in("Eve")])
            .when(&CheckInUser::new("Eve", &policy))
            .then_expect_error();
    }

    #[test]
    fn policy_failures_are_not_treated_as_allowed() {
        let (result, root) = TestFramework::<Building>::given([registered()])
            .when(&CheckInUser::new("Joe", &Unreachable))
            .inspect_result();

        assert!(matches!(result, Err(BuildingError::Policy(_))));
        assert!(!root.state().is_checked_in("Joe"));
    }

    #[test]
    fn closures_can_serve_as_policies() {
        let only_joe = |username: &str| username == "Joe";
        TestFramework::<Building>::given([registered()])
            .when(&CheckInUser::new("Joe", &only_joe))
            .then_expect_events(&[UserCheckedIn::new("Joe").into()]);
    }

    #[test]
    fn unregistered_building_rejects_check_in() {
        TestFramework::<Building>::given([])
            .when(&CheckInUser::new("Joe", &AlwaysAllow))
            .then_expect_error_message("not registered");
    }

    #[test]
    fn checked_in_user_checks_out() {
        TestFramework::<Building>::given([registered(), checked_in("Joe")])
            .when(&CheckOutUser::new("Joe", &AlwaysAllow))
            .then_expect_events(&[UserCheckedOut::new("Joe").into()]);
    }

    #[test]
    fn checking_out_twice_records_an_anomaly() {
        TestFramework::<Building>::given([registered(), checked_in("Joe")])
            .and([Change::occur(b1(), UserCheckedOut::new("Joe"))])
            .when(&CheckOutUser::new("Joe", &AlwaysAllow))
            .then_expect_events(&[CheckInAnomalyDetected::new(
                "Joe",
                AnomalyReason::AlreadyCheckedOut,
            )
            .into()]);
    }

    #[test]
    fn unregistered_building_rejects_check_out() {
        TestFramework::<Building>::given([])
            .when(&CheckOutUser::new("Joe", &AlwaysAllow))
            .then_expect_error_message("not registered");
    }

    #[test]
    fn pending_events_are_surfaced_once() {
        let mut root = AggregateRoot::<Building>::new();
        root.execute(&RegisterBuilding::new(b1(), "DX Solutions"))
            .unwrap();
        root.execute(&CheckInUser::new("Joe", &AlwaysAllow)).unwrap();

        let first = root.extract_pending_events();
        let versions: Vec<u64> = first.iter().map(|e| e.version().get()).collect();
        assert_eq!(versions, vec![1, 2]);
        assert!(root.extract_pending_events().is_empty());
        assert!(root.state().is_checked_in("Joe"));
    }

    #[test]
    fn replayed_registration_does_not_rename_the_building() {
        let (_, root) = TestFramework::<Building>::given([
            registered(),
            Change::occur(b1(), NewBuildingWasRegistered::new("Renamed")),
        ])
        .when(&CheckInUser::new("Joe", &AlwaysAllow))
        .inspect_result();

        assert_eq!(root.state().name(), "DX Solutions");
    }

    #[test]
    fn history_must_start_with_registration() {
        let truncated = vec![
            checked_in("Joe").recorded_as(Version::FIRST),
            Change::occur(b1(), UserCheckedOut::new("Joe")).recorded_as(Version::FIRST.next()),
        ];

        let err = AggregateRoot::<Building>::reconstitute_from_history(truncated).unwrap_err();

        assert_eq!(
            err,
            ReplayError::MissingStreamStart {
                kind: "UserCheckedIn"
            }
        );
    }
}
