use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::RngCore;

use crate::{
    Availability, LeaveSets, Reassignment, RedistributionPlan, Role, Snapshot, StaffId, StaffMember,
    Task,
};

/// Weighted load per staff member: sum of priority weights of the tasks
/// currently assigned to them. Only members with role `Staff` get an entry;
/// doctors and admins never participate in the pool even if they hold tasks.
pub fn compute_loads(staff: &[StaffMember], tasks: &[Task]) -> HashMap<StaffId, u32> {
    staff
        .iter()
        .filter(|s| s.role == Role::Staff)
        .map(|s| {
            let total = tasks
                .iter()
                .filter(|t| t.staff_id == s.id)
                .map(Task::weight)
                .sum();
            (s.id.clone(), total)
        })
        .collect()
}

pub fn availability_of(id: &StaffId, leave: &LeaveSets) -> Availability {
    if leave.is_full(id) {
        Availability::Absent
    } else if leave.is_half(id) {
        Availability::HalfDay
    } else {
        Availability::Available
    }
}

/// Pick the tasks that must change hands this run:
/// - every task of a full-leave staff member;
/// - for each half-day staff member, a uniform shuffle of their tasks and
///   then the first `floor(n / 2)` of it (so 0 or 1 tasks contribute none).
///
/// Tasks of staff on no leave list are never selected. The RNG is injected
/// so tests can pin the shuffle.
pub fn select_tasks_to_move<'a>(
    tasks: &'a [Task],
    leave: &LeaveSets,
    rng: &mut dyn RngCore,
) -> Vec<&'a Task> {
    let mut to_move: Vec<&Task> = tasks.iter().filter(|t| leave.is_full(&t.staff_id)).collect();

    for sid in leave.half_ids_sorted() {
        let mut theirs: Vec<&Task> = tasks.iter().filter(|t| t.staff_id == sid).collect();
        let take = theirs.len() / 2;
        theirs.shuffle(rng);
        to_move.extend(theirs.into_iter().take(take));
    }

    to_move
}

fn effective_load(load: u32, avail: Availability) -> f64 {
    f64::from(load) / avail.fraction()
}

/// Plan one redistribution run over a snapshot. Pure: nothing is written,
/// the returned plan is what the shell commits.
///
/// Must-move tasks are processed heaviest first (stable on ties) and each
/// one goes to the eligible staff member with the lowest effective load
/// (`load / availability`), ties broken by roster order. The winner's load
/// is bumped immediately so the next pick sees it. A task with no eligible
/// destination keeps its assignee and is reported in `unmoved`.
pub fn plan_redistribution(
    snapshot: &Snapshot,
    leave: &LeaveSets,
    rng: &mut dyn RngCore,
) -> RedistributionPlan {
    let staff: Vec<&StaffMember> = snapshot
        .staff
        .iter()
        .filter(|s| s.role == Role::Staff)
        .collect();

    let mut load = compute_loads(&snapshot.staff, &snapshot.tasks);
    let avail: HashMap<StaffId, Availability> = staff
        .iter()
        .map(|s| (s.id.clone(), availability_of(&s.id, leave)))
        .collect();

    let mut to_move = select_tasks_to_move(&snapshot.tasks, leave, rng);
    to_move.sort_by(|a, b| b.weight().cmp(&a.weight()));

    // Full-leave staff are dropped from the load map, not zero-weighted:
    // whatever could not be moved off them no longer counts as pool load.
    for id in leave.full_ids() {
        load.remove(id);
    }

    // Roster order here is what makes the tie-break deterministic.
    let eligible: Vec<&StaffMember> = staff
        .iter()
        .copied()
        .filter(|s| {
            avail
                .get(&s.id)
                .map(|a| a.fraction() > 0.0)
                .unwrap_or(false)
        })
        .collect();

    let mut plan = RedistributionPlan::default();

    for task in to_move {
        let target = eligible.iter().min_by(|a, b| {
            let ea = effective_load(load.get(&a.id).copied().unwrap_or(0), avail[&a.id]);
            let eb = effective_load(load.get(&b.id).copied().unwrap_or(0), avail[&b.id]);
            ea.partial_cmp(&eb).unwrap_or(std::cmp::Ordering::Equal)
        });

        match target {
            Some(s) => {
                *load.entry(s.id.clone()).or_insert(0) += task.weight();
                plan.reassignments.push(Reassignment {
                    task_id: task.id.clone(),
                    from: task.staff_id.clone(),
                    to: s.id.clone(),
                    weight: task.weight(),
                });
            }
            // Everyone is on full leave (or there is no staff at all):
            // the task stays where it was, but the caller gets to see it.
            None => plan.unmoved.push(task.id.clone()),
        }
    }

    plan.load_after = load.into_iter().collect();
    plan
}
