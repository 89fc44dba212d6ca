use crate::{StaffMember, Task};

/// Read-only view of state used by the planner. The imperative shell is
/// responsible for producing this snapshot from storage in one read, so a
/// whole run plans against a single consistent picture.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub now_unix: i64,
    pub staff: Vec<StaffMember>,
    pub tasks: Vec<Task>,
}
