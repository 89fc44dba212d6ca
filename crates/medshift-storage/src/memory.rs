use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail};
use medshift_core::{
    Reassignment, RedistributionLogEntry, Snapshot, StaffId, StaffMember, Task, TaskId, TaskStatus,
};

use crate::traits::Storage;

/// In-memory storage for tests. Not durable, but good enough for unit and
/// small scenario tests, and it carries failpoints so the shell's Write/Log
/// error paths can be exercised without a real backend.
#[derive(Default)]
pub struct InMemoryStorage {
    inner: Mutex<Inner>,
    fail_next_read: AtomicBool,
    fail_next_batch: AtomicBool,
    fail_next_log: AtomicBool,
}

#[derive(Default)]
struct Inner {
    staff: Vec<StaffMember>,
    tasks: HashMap<String, Task>,
    task_order: Vec<TaskId>,
    logs: Vec<RedistributionLogEntry>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_read(&self) {
        self.fail_next_read.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_batch(&self) {
        self.fail_next_batch.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_log(&self) {
        self.fail_next_log.store(true, Ordering::SeqCst);
    }

    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.inner.lock().unwrap().tasks.get(id.as_str()).cloned()
    }

    pub fn tasks_assigned_to(&self, staff_id: &StaffId) -> Vec<Task> {
        let inner = self.inner.lock().unwrap();
        inner
            .task_order
            .iter()
            .filter_map(|id| inner.tasks.get(id.as_str()))
            .filter(|t| &t.staff_id == staff_id)
            .cloned()
            .collect()
    }
}

impl Storage for InMemoryStorage {
    fn load_snapshot(&self, now_unix: i64) -> anyhow::Result<Snapshot> {
        if self.fail_next_read.swap(false, Ordering::SeqCst) {
            bail!("injected read failure");
        }
        let inner = self.inner.lock().unwrap();
        Ok(Snapshot {
            now_unix,
            staff: inner.staff.clone(),
            tasks: inner
                .task_order
                .iter()
                .filter_map(|id| inner.tasks.get(id.as_str()))
                .cloned()
                .collect(),
        })
    }

    fn insert_staff(&self, staff: StaffMember) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.staff.push(staff);
        Ok(())
    }

    fn insert_task(&self, task: Task) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.task_order.push(task.id.clone());
        inner.tasks.insert(task.id.0.clone(), task);
        Ok(())
    }

    fn set_task_status(&self, task_id: &TaskId, status: TaskStatus) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(t) = inner.tasks.get_mut(task_id.as_str()) {
            t.status = status;
        }
        Ok(())
    }

    fn apply_reassignments(&self, changes: &[Reassignment], now_unix: i64) -> anyhow::Result<()> {
        if self.fail_next_batch.swap(false, Ordering::SeqCst) {
            bail!("injected batch failure");
        }
        let mut inner = self.inner.lock().unwrap();
        // Validate the whole batch before touching anything, so a bad
        // reassignment never leaves a half-applied batch behind.
        for c in changes {
            if !inner.tasks.contains_key(c.task_id.as_str()) {
                return Err(anyhow!("unknown task in batch: {}", c.task_id.as_str()));
            }
        }
        for c in changes {
            if let Some(t) = inner.tasks.get_mut(c.task_id.as_str()) {
                t.staff_id = c.to.clone();
                t.updated_at_unix = now_unix;
            }
        }
        Ok(())
    }

    fn append_log_entry(&self, entry: RedistributionLogEntry) -> anyhow::Result<()> {
        if self.fail_next_log.swap(false, Ordering::SeqCst) {
            bail!("injected log failure");
        }
        let mut inner = self.inner.lock().unwrap();
        inner.logs.push(entry);
        Ok(())
    }

    fn log_entries(&self) -> anyhow::Result<Vec<RedistributionLogEntry>> {
        Ok(self.inner.lock().unwrap().logs.clone())
    }
}
