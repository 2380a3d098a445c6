//! The task status state machine and its role gates.
//!
//! Tasks start `Pending`; `Complete` and `Cancel` are absorbing. The role
//! gate answers "may this role ever request this target status" and is
//! checked before the state machine, so a forbidden target is reported as
//! an authorization failure rather than a transition failure.

use relief_grid_core::Role;
use relief_grid_store::TaskStatus;

/// Returns true if no transition out of `status` is permitted.
#[must_use]
pub const fn is_terminal(status: TaskStatus) -> bool {
    matches!(status, TaskStatus::Complete | TaskStatus::Cancel)
}

/// Returns true if the state machine permits `from -> to`.
///
/// No-op transitions are not permitted; callers are expected to detect
/// redundant submissions.
#[must_use]
pub const fn is_valid_transition(from: TaskStatus, to: TaskStatus) -> bool {
    matches!(
        (from, to),
        (TaskStatus::Pending, TaskStatus::Complete) | (TaskStatus::Pending, TaskStatus::Cancel)
    )
}

/// Returns true if `role` may request `target` at all.
///
/// Government may request any status. First responders and volunteers may
/// not cancel. Plain users never act on tasks.
#[must_use]
pub const fn role_may_target(role: Role, target: TaskStatus) -> bool {
    match role {
        Role::Government => true,
        Role::FirstResponder | Role::Volunteer => !matches!(target, TaskStatus::Cancel),
        Role::User => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_has_outgoing_transitions() {
        assert!(is_valid_transition(TaskStatus::Pending, TaskStatus::Complete));
        assert!(is_valid_transition(TaskStatus::Pending, TaskStatus::Cancel));

        for from in [TaskStatus::Complete, TaskStatus::Cancel] {
            assert!(is_terminal(from));
            for to in [TaskStatus::Pending, TaskStatus::Complete, TaskStatus::Cancel] {
                assert!(!is_valid_transition(from, to));
            }
        }
    }

    #[test]
    fn no_op_is_invalid() {
        assert!(!is_valid_transition(TaskStatus::Pending, TaskStatus::Pending));
    }

    #[test]
    fn cancel_is_government_only() {
        assert!(role_may_target(Role::Government, TaskStatus::Cancel));
        assert!(!role_may_target(Role::FirstResponder, TaskStatus::Cancel));
        assert!(!role_may_target(Role::Volunteer, TaskStatus::Cancel));
        assert!(role_may_target(Role::Volunteer, TaskStatus::Complete));
        assert!(!role_may_target(Role::User, TaskStatus::Complete));
    }
}
