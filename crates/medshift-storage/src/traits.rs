use medshift_core::{
    Reassignment, RedistributionLogEntry, Snapshot, StaffMember, Task, TaskId, TaskStatus,
};

pub trait Storage: Send + Sync {
    fn load_snapshot(&self, now_unix: i64) -> anyhow::Result<Snapshot>;

    fn insert_staff(&self, staff: StaffMember) -> anyhow::Result<()>;
    fn insert_task(&self, task: Task) -> anyhow::Result<()>;
    fn set_task_status(&self, task_id: &TaskId, status: TaskStatus) -> anyhow::Result<()>;

    /// Apply every reassignment as one batch, updating `staff_id` and
    /// `updated_at`. Either all of them land or none do; an error means the
    /// store still holds the pre-run assignments.
    fn apply_reassignments(&self, changes: &[Reassignment], now_unix: i64) -> anyhow::Result<()>;

    /// Append one immutable audit record. Entries are never updated or
    /// deleted through this interface.
    fn append_log_entry(&self, entry: RedistributionLogEntry) -> anyhow::Result<()>;

    fn log_entries(&self) -> anyhow::Result<Vec<RedistributionLogEntry>>;
}
