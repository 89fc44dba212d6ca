use std::collections::{BTreeMap, HashMap, HashSet};

use rand::RngCore;
use tracing::{info, warn};

use medshift_core::{
    plan_redistribution, ClinicId, LeaveSets, LogEntryId, RedistributionLogEntry, StaffId,
    TaskAssignment, TaskId,
};
use medshift_storage::Storage;

use crate::{now_unix, RedistributeError};

/// Leave input for one redistribution run, as classified by the
/// leave-approval workflow.
#[derive(Clone, Debug, Default)]
pub struct RedistributionRequest {
    pub leave_full: Vec<StaffId>,
    pub leave_half: Vec<StaffId>,
    /// Scopes the audit entry only; the roster/task read is unscoped.
    pub clinic_id: Option<ClinicId>,
}

#[derive(Clone, Debug, Default)]
pub struct RedistributionReport {
    pub moved_task_count: usize,
    /// Tasks that had to move but had no eligible destination. Their
    /// assignee is unchanged in the store.
    pub unmoved_task_ids: Vec<TaskId>,
    pub staff_load_after: BTreeMap<StaffId, u32>,
}

/// One end-to-end redistribution run: read current state, plan the new
/// assignment, commit it as one atomic batch, then append the audit entry.
///
/// Every failure comes back as a `RedistributeError` variant rather than a
/// panic; in particular a committed batch with a failed audit append is the
/// distinct `Log` variant, because the moves are already durable.
pub fn redistribute_tasks(
    storage: &dyn Storage,
    req: &RedistributionRequest,
    rng: &mut dyn RngCore,
) -> Result<RedistributionReport, RedistributeError> {
    // No leave input means nothing can be selected: skip the run entirely,
    // touching no tasks and appending no audit entry.
    if req.leave_full.is_empty() && req.leave_half.is_empty() {
        info!("redistribution requested with empty leave sets, nothing to do");
        return Ok(RedistributionReport::default());
    }

    let full_set: HashSet<&StaffId> = req.leave_full.iter().collect();
    for id in &req.leave_half {
        if full_set.contains(id) {
            warn!(staff = id.as_str(), "staff listed for both full and half leave, treating as full");
        }
    }
    let leave = LeaveSets::new(req.leave_full.iter().cloned(), req.leave_half.iter().cloned());

    let now = now_unix();
    let snapshot = storage
        .load_snapshot(now)
        .map_err(RedistributeError::Read)?;
    info!(
        staff = snapshot.staff.len(),
        tasks = snapshot.tasks.len(),
        full = req.leave_full.len(),
        half = req.leave_half.len(),
        "starting task redistribution"
    );

    let plan = plan_redistribution(&snapshot, &leave, rng);
    for task_id in &plan.unmoved {
        warn!(task = task_id.as_str(), "no eligible staff, task left unmoved");
    }

    if !plan.reassignments.is_empty() {
        storage
            .apply_reassignments(&plan.reassignments, now)
            .map_err(RedistributeError::Write)?;
        info!(moved = plan.reassignments.len(), "reassignment batch committed");
    }

    // Full post-run task -> staff mapping, moved tasks updated, the rest
    // carrying their pre-run assignee.
    let new_owner: HashMap<&TaskId, &StaffId> = plan
        .reassignments
        .iter()
        .map(|r| (&r.task_id, &r.to))
        .collect();
    let tasks_after: Vec<TaskAssignment> = snapshot
        .tasks
        .iter()
        .map(|t| TaskAssignment {
            task_id: t.id.clone(),
            staff_id: new_owner.get(&t.id).cloned().cloned().unwrap_or_else(|| t.staff_id.clone()),
            priority: t.priority,
        })
        .collect();

    let moved = plan.reassignments.len();
    let entry = RedistributionLogEntry {
        id: LogEntryId::new(),
        timestamp_unix: now,
        clinic_id: req.clinic_id.clone().unwrap_or_else(ClinicId::default_clinic),
        leave_full_ids: leave.full_ids_sorted(),
        leave_half_ids: leave.half_ids_sorted(),
        tasks_after,
        staff_load_after: plan.load_after.clone(),
    };
    storage
        .append_log_entry(entry)
        .map_err(|source| RedistributeError::Log { moved, source })?;
    info!(moved, "redistribution run logged");

    Ok(RedistributionReport {
        moved_task_count: moved,
        unmoved_task_ids: plan.unmoved,
        staff_load_after: plan.load_after,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use medshift_core::{Priority, Role, StaffMember, Task, TaskStatus};
    use medshift_storage::InMemoryStorage;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded_storage() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        for id in ["a", "b", "c"] {
            storage
                .insert_staff(StaffMember {
                    id: StaffId::from_str(id),
                    name: id.to_string(),
                    role: Role::Staff,
                })
                .unwrap();
        }
        for (id, owner, priority) in [
            ("t1", "a", Priority::High),
            ("t2", "a", Priority::High),
            ("t3", "a", Priority::High),
            ("t4", "b", Priority::Low),
        ] {
            storage
                .insert_task(Task {
                    id: TaskId::from_str(id),
                    title: id.to_string(),
                    staff_id: StaffId::from_str(owner),
                    priority: Some(priority),
                    status: TaskStatus::Pending,
                    created_at_unix: 0,
                    updated_at_unix: 0,
                })
                .unwrap();
        }
        storage
    }

    fn full_leave_request(id: &str) -> RedistributionRequest {
        RedistributionRequest {
            leave_full: vec![StaffId::from_str(id)],
            leave_half: vec![],
            clinic_id: None,
        }
    }

    #[test]
    fn full_run_moves_tasks_and_logs_once() {
        let storage = seeded_storage();
        let mut rng = StdRng::seed_from_u64(0);
        let report = redistribute_tasks(&storage, &full_leave_request("a"), &mut rng).unwrap();

        assert_eq!(report.moved_task_count, 3);
        assert!(report.unmoved_task_ids.is_empty());
        assert!(storage.tasks_assigned_to(&StaffId::from_str("a")).is_empty());

        let logs = storage.log_entries().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].clinic_id, ClinicId::default_clinic());
        assert_eq!(logs[0].leave_full_ids, vec![StaffId::from_str("a")]);
        // Full post-run mapping covers every task, moved or not.
        assert_eq!(logs[0].tasks_after.len(), 4);
    }

    #[test]
    fn report_matches_worked_example() {
        let storage = seeded_storage();
        let mut rng = StdRng::seed_from_u64(0);
        let report = redistribute_tasks(&storage, &full_leave_request("a"), &mut rng).unwrap();
        assert_eq!(report.staff_load_after.get(&StaffId::from_str("b")), Some(&4));
        assert_eq!(report.staff_load_after.get(&StaffId::from_str("c")), Some(&6));
        assert_eq!(report.staff_load_after.get(&StaffId::from_str("a")), None);
    }

    #[test]
    fn empty_leave_sets_are_a_no_op() {
        let storage = seeded_storage();
        let mut rng = StdRng::seed_from_u64(0);
        let report =
            redistribute_tasks(&storage, &RedistributionRequest::default(), &mut rng).unwrap();
        assert_eq!(report.moved_task_count, 0);
        assert!(storage.log_entries().unwrap().is_empty());
        assert_eq!(storage.tasks_assigned_to(&StaffId::from_str("a")).len(), 3);
    }

    #[test]
    fn read_failure_stops_the_run() {
        let storage = seeded_storage();
        storage.fail_next_read();
        let mut rng = StdRng::seed_from_u64(0);
        let err = redistribute_tasks(&storage, &full_leave_request("a"), &mut rng).unwrap_err();
        assert!(matches!(err, RedistributeError::Read(_)));
        assert!(storage.log_entries().unwrap().is_empty());
    }

    #[test]
    fn write_failure_leaves_store_untouched() {
        let storage = seeded_storage();
        storage.fail_next_batch();
        let mut rng = StdRng::seed_from_u64(0);
        let err = redistribute_tasks(&storage, &full_leave_request("a"), &mut rng).unwrap_err();
        assert!(matches!(err, RedistributeError::Write(_)));
        assert_eq!(storage.tasks_assigned_to(&StaffId::from_str("a")).len(), 3);
        assert!(storage.log_entries().unwrap().is_empty());
    }

    #[test]
    fn log_failure_is_reported_as_partial_success() {
        let storage = seeded_storage();
        storage.fail_next_log();
        let mut rng = StdRng::seed_from_u64(0);
        let err = redistribute_tasks(&storage, &full_leave_request("a"), &mut rng).unwrap_err();
        match err {
            RedistributeError::Log { moved, .. } => assert_eq!(moved, 3),
            other => panic!("expected Log error, got {other:?}"),
        }
        // The batch is durable even though the trail is missing.
        assert!(storage.tasks_assigned_to(&StaffId::from_str("a")).is_empty());
        assert!(storage.log_entries().unwrap().is_empty());
    }

    #[test]
    fn leave_input_with_no_moves_still_logs_the_run() {
        let storage = InMemoryStorage::new();
        for id in ["h", "x"] {
            storage
                .insert_staff(StaffMember {
                    id: StaffId::from_str(id),
                    name: id.to_string(),
                    role: Role::Staff,
                })
                .unwrap();
        }
        // One task: floor(1 / 2) = 0 selected for a half-day member.
        storage
            .insert_task(Task {
                id: TaskId::from_str("t1"),
                title: "t1".to_string(),
                staff_id: StaffId::from_str("h"),
                priority: None,
                status: TaskStatus::Pending,
                created_at_unix: 0,
                updated_at_unix: 0,
            })
            .unwrap();

        let req = RedistributionRequest {
            leave_full: vec![],
            leave_half: vec![StaffId::from_str("h")],
            clinic_id: Some(ClinicId::from_str("clinic-2")),
        };
        let mut rng = StdRng::seed_from_u64(0);
        let report = redistribute_tasks(&storage, &req, &mut rng).unwrap();
        assert_eq!(report.moved_task_count, 0);

        let logs = storage.log_entries().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].clinic_id.as_str(), "clinic-2");
        assert_eq!(logs[0].leave_half_ids, vec![StaffId::from_str("h")]);
    }

    #[test]
    fn staff_in_both_sets_is_treated_as_full_leave() {
        let storage = seeded_storage();
        let req = RedistributionRequest {
            leave_full: vec![StaffId::from_str("a")],
            leave_half: vec![StaffId::from_str("a")],
            clinic_id: None,
        };
        let mut rng = StdRng::seed_from_u64(0);
        let report = redistribute_tasks(&storage, &req, &mut rng).unwrap();
        assert_eq!(report.moved_task_count, 3);
        let logs = storage.log_entries().unwrap();
        assert_eq!(logs[0].leave_full_ids, vec![StaffId::from_str("a")]);
        assert!(logs[0].leave_half_ids.is_empty());
    }
}
