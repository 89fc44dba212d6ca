use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{ClinicId, LogEntryId, Priority, Role, StaffId, TaskId, TaskStatus};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaffMember {
    pub id: StaffId,
    pub name: String,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub staff_id: StaffId,
    pub priority: Option<Priority>,
    pub status: TaskStatus,
    pub created_at_unix: i64,
    pub updated_at_unix: i64,
}

impl Task {
    pub fn weight(&self) -> u32 {
        crate::priority_weight(self.priority)
    }
}

/// Leave input for one run, normalized so the two sets are disjoint.
/// An ID listed in both sets resolves to full leave.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeaveSets {
    full: HashSet<StaffId>,
    half: HashSet<StaffId>,
}

impl LeaveSets {
    pub fn new(full: impl IntoIterator<Item = StaffId>, half: impl IntoIterator<Item = StaffId>) -> Self {
        let full: HashSet<StaffId> = full.into_iter().collect();
        let half = half.into_iter().filter(|id| !full.contains(id)).collect();
        Self { full, half }
    }

    pub fn is_empty(&self) -> bool {
        self.full.is_empty() && self.half.is_empty()
    }

    pub fn is_full(&self, id: &StaffId) -> bool {
        self.full.contains(id)
    }

    pub fn is_half(&self, id: &StaffId) -> bool {
        self.half.contains(id)
    }

    pub fn full_ids(&self) -> impl Iterator<Item = &StaffId> {
        self.full.iter()
    }

    /// Half-leave IDs in a stable order, so the selection step is
    /// deterministic for a given RNG seed.
    pub fn half_ids_sorted(&self) -> Vec<StaffId> {
        let mut ids: Vec<StaffId> = self.half.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn full_ids_sorted(&self) -> Vec<StaffId> {
        let mut ids: Vec<StaffId> = self.full.iter().cloned().collect();
        ids.sort();
        ids
    }
}

/// One task move decided by the planner. `from` is the pre-run assignee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reassignment {
    pub task_id: TaskId,
    pub from: StaffId,
    pub to: StaffId,
    pub weight: u32,
}

/// Output of the pure planning step, before anything is written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RedistributionPlan {
    pub reassignments: Vec<Reassignment>,
    /// Tasks that had to move but had no eligible destination.
    pub unmoved: Vec<TaskId>,
    /// Post-run weighted load per staff member. Full-leave staff are
    /// removed from the map entirely, not zero-weighted.
    pub load_after: BTreeMap<StaffId, u32>,
}

/// Post-run assignment of one task, as recorded in the audit log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task_id: TaskId,
    pub staff_id: StaffId,
    pub priority: Option<Priority>,
}

/// Append-only audit record, one per successful redistribution run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RedistributionLogEntry {
    pub id: LogEntryId,
    pub timestamp_unix: i64,
    pub clinic_id: ClinicId,
    pub leave_full_ids: Vec<StaffId>,
    pub leave_half_ids: Vec<StaffId>,
    pub tasks_after: Vec<TaskAssignment>,
    pub staff_load_after: BTreeMap<StaffId, u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_leave_takes_precedence_over_half() {
        let a = StaffId::from_str("a");
        let sets = LeaveSets::new([a.clone()], [a.clone(), StaffId::from_str("b")]);
        assert!(sets.is_full(&a));
        assert!(!sets.is_half(&a));
        assert!(sets.is_half(&StaffId::from_str("b")));
    }

    #[test]
    fn empty_sets_are_empty() {
        assert!(LeaveSets::default().is_empty());
        assert!(!LeaveSets::new([StaffId::from_str("a")], []).is_empty());
    }
}
