//! The task ledger.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use relief_grid_core::{ActorId, DisasterId, Role, TaskId};
use relief_grid_store::{Store, TaskRecord, TaskStatus};

use crate::error::{LedgerError, Result};
use crate::transitions;

/// Validates and applies task status transitions.
///
/// Task records are created by the task-generation pipeline; this service
/// is the only mutation path and tasks are never deleted. Transitions on
/// one task id are linearized through a per-id lock so racing requesters
/// cannot both move a task out of `Pending`; distinct tasks proceed in
/// parallel.
pub struct TaskLedger<S: Store> {
    store: Arc<S>,
    locks: Mutex<HashMap<TaskId, Arc<Mutex<()>>>>,
}

impl<S: Store> TaskLedger<S> {
    /// Create a ledger over the given store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Advance a task to a new status on behalf of an actor.
    ///
    /// Authorization is checked before the state machine: a role that may
    /// never request the target status, or that is not in the task's
    /// eligible set, fails with [`LedgerError::Unauthorized`] regardless of
    /// the task's current status. A permitted requester whose target the
    /// state machine rejects (terminal current status, no-op, or an
    /// unreachable target) fails with [`LedgerError::InvalidTransition`].
    ///
    /// On success `action_done_by` records the actor, the record is
    /// persisted, and the canonical updated record is returned so callers
    /// need not re-read.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `InvalidTransition`, `TaskNotFound`, or a store
    /// failure. Rejections leave the record untouched.
    pub fn advance(
        &self,
        task_id: &TaskId,
        role: Role,
        target: TaskStatus,
        actor: &ActorId,
    ) -> Result<TaskRecord> {
        if !transitions::role_may_target(role, target) {
            return Err(LedgerError::Unauthorized {
                role,
                action: "request this task status",
            });
        }

        let lock = self.lock_for(task_id);
        let _guard = lock.lock();

        let mut task = self
            .store
            .get_task(task_id)?
            .ok_or(LedgerError::TaskNotFound(*task_id))?;

        if !task.eligible_roles.contains(&role) {
            return Err(LedgerError::Unauthorized {
                role,
                action: "act on this task",
            });
        }

        if !transitions::is_valid_transition(task.status, target) {
            return Err(LedgerError::InvalidTransition {
                task_id: *task_id,
                from: task.status,
                to: target,
            });
        }

        let from = task.status;
        task.status = target;
        task.action_done_by = Some(actor.clone());
        task.updated_at = Utc::now();
        self.store.put_task(&task)?;

        tracing::info!(
            task_id = %task_id,
            ?from,
            to = ?target,
            actor = %actor,
            "Task advanced"
        );

        Ok(task)
    }

    /// Get a task by id.
    ///
    /// # Errors
    ///
    /// `TaskNotFound` or a store failure.
    pub fn get(&self, task_id: &TaskId) -> Result<TaskRecord> {
        self.store
            .get_task(task_id)?
            .ok_or(LedgerError::TaskNotFound(*task_id))
    }

    /// List all tasks attached to a disaster.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list_for_disaster(&self, disaster_id: &DisasterId) -> Result<Vec<TaskRecord>> {
        Ok(self.store.list_tasks_by_disaster(disaster_id)?)
    }

    fn lock_for(&self, task_id: &TaskId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.lock().entry(*task_id).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_grid_store::RocksStore;
    use tempfile::TempDir;

    fn setup() -> (TaskLedger<RocksStore>, Arc<RocksStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        (TaskLedger::new(Arc::clone(&store)), store, dir)
    }

    fn seed_task(store: &RocksStore, status: TaskStatus, eligible: Vec<Role>) -> TaskRecord {
        let now = Utc::now();
        let task = TaskRecord {
            task_id: TaskId::generate(),
            disaster_id: DisasterId::generate(),
            description: "distribute water".to_string(),
            status,
            eligible_roles: eligible,
            action_done_by: None,
            created_at: now,
            updated_at: now,
        };
        store.put_task(&task).unwrap();
        task
    }

    fn actor(uid: &str) -> ActorId {
        uid.parse().unwrap()
    }

    #[test]
    fn volunteer_completes_pending_task() {
        let (ledger, store, _dir) = setup();
        let task = seed_task(&store, TaskStatus::Pending, vec![Role::Volunteer]);

        let updated = ledger
            .advance(&task.task_id, Role::Volunteer, TaskStatus::Complete, &actor("vol@x"))
            .unwrap();

        assert_eq!(updated.status, TaskStatus::Complete);
        assert_eq!(updated.action_done_by, Some(actor("vol@x")));

        // Persisted, not just returned.
        assert_eq!(ledger.get(&task.task_id).unwrap().status, TaskStatus::Complete);
    }

    #[test]
    fn volunteer_cancel_is_unauthorized() {
        let (ledger, store, _dir) = setup();
        let task = seed_task(&store, TaskStatus::Pending, vec![Role::Volunteer]);

        let result = ledger.advance(&task.task_id, Role::Volunteer, TaskStatus::Cancel, &actor("vol@x"));
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));

        let unchanged = ledger.get(&task.task_id).unwrap();
        assert_eq!(unchanged.status, TaskStatus::Pending);
        assert_eq!(unchanged.action_done_by, None);
    }

    #[test]
    fn ineligible_role_is_unauthorized() {
        let (ledger, store, _dir) = setup();
        let task = seed_task(&store, TaskStatus::Pending, vec![Role::FirstResponder]);

        let result = ledger.advance(&task.task_id, Role::Volunteer, TaskStatus::Complete, &actor("vol@x"));
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
    }

    #[test]
    fn government_cancel_on_completed_task_is_invalid_transition() {
        let (ledger, store, _dir) = setup();
        let mut task = seed_task(&store, TaskStatus::Pending, vec![Role::Government, Role::Volunteer]);
        task.status = TaskStatus::Complete;
        task.action_done_by = Some(actor("vol@x"));
        store.put_task(&task).unwrap();

        let result = ledger.advance(&task.task_id, Role::Government, TaskStatus::Cancel, &actor("gov@x"));
        assert!(matches!(
            result,
            Err(LedgerError::InvalidTransition {
                from: TaskStatus::Complete,
                to: TaskStatus::Cancel,
                ..
            })
        ));

        // Status and actor untouched by the rejection.
        let unchanged = ledger.get(&task.task_id).unwrap();
        assert_eq!(unchanged.status, TaskStatus::Complete);
        assert_eq!(unchanged.action_done_by, Some(actor("vol@x")));
    }

    #[test]
    fn no_op_transition_is_rejected() {
        let (ledger, store, _dir) = setup();
        let task = seed_task(&store, TaskStatus::Pending, vec![Role::Government]);

        let result = ledger.advance(&task.task_id, Role::Government, TaskStatus::Pending, &actor("gov@x"));
        assert!(matches!(result, Err(LedgerError::InvalidTransition { .. })));
    }

    #[test]
    fn terminal_states_never_change_again() {
        let (ledger, store, _dir) = setup();
        let task = seed_task(&store, TaskStatus::Pending, vec![Role::Government]);

        ledger
            .advance(&task.task_id, Role::Government, TaskStatus::Cancel, &actor("gov@x"))
            .unwrap();

        for target in [TaskStatus::Pending, TaskStatus::Complete, TaskStatus::Cancel] {
            let result = ledger.advance(&task.task_id, Role::Government, target, &actor("gov@x"));
            assert!(matches!(result, Err(LedgerError::InvalidTransition { .. })));
        }
    }

    #[test]
    fn missing_task_is_not_found() {
        let (ledger, _store, _dir) = setup();
        let result = ledger.advance(
            &TaskId::generate(),
            Role::Government,
            TaskStatus::Complete,
            &actor("gov@x"),
        );
        assert!(matches!(result, Err(LedgerError::TaskNotFound(_))));
    }

    #[test]
    fn racing_terminal_advances_admit_exactly_one_winner() {
        use std::sync::Barrier;
        use std::thread;

        let (ledger, store, _dir) = setup();
        let ledger = Arc::new(ledger);

        for _ in 0..100 {
            let task = seed_task(&store, TaskStatus::Pending, vec![Role::Government]);
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = [TaskStatus::Complete, TaskStatus::Cancel]
                .into_iter()
                .map(|target| {
                    let ledger = Arc::clone(&ledger);
                    let barrier = Arc::clone(&barrier);
                    let task_id = task.task_id;
                    thread::spawn(move || {
                        barrier.wait();
                        ledger.advance(&task_id, Role::Government, target, &actor("gov@x"))
                    })
                })
                .collect();
            let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            // One requester wins, the loser sees the terminal state it
            // raced against, and the persisted record never leaves it.
            assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
            assert!(matches!(
                outcomes.iter().find(|r| r.is_err()).unwrap(),
                Err(LedgerError::InvalidTransition { .. })
            ));
            let persisted = ledger.get(&task.task_id).unwrap();
            assert!(transitions::is_terminal(persisted.status));
            assert_eq!(
                Some(&persisted.status),
                outcomes.iter().find_map(|r| r.as_ref().ok()).map(|t| &t.status)
            );
        }
    }
}
