use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};

use medshift_core::{
    ClinicId, LogEntryId, Priority, Reassignment, RedistributionLogEntry, Role, Snapshot, StaffId,
    StaffMember, Task, TaskAssignment, TaskId, TaskStatus,
};
use medshift_storage::Storage;

pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("open sqlite db {}", db_path.display()))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let init_sql = include_str!("../migrations/0001_init.sql");
        conn.execute_batch(init_sql)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn role_to_str(r: &Role) -> &'static str {
        match r {
            Role::Staff => "staff",
            Role::Doctor => "doctor",
            Role::ClinicAdmin => "clinic_admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    fn str_to_role(s: &str) -> Role {
        match s {
            "doctor" => Role::Doctor,
            "clinic_admin" => Role::ClinicAdmin,
            "super_admin" => Role::SuperAdmin,
            _ => Role::Staff,
        }
    }

    fn status_to_str(s: &TaskStatus) -> &'static str {
        match s {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }

    fn str_to_status(s: &str) -> TaskStatus {
        match s {
            "completed" => TaskStatus::Completed,
            _ => TaskStatus::Pending,
        }
    }
}

impl Storage for SqliteStorage {
    fn load_snapshot(&self, now_unix: i64) -> Result<Snapshot> {
        let conn = self.conn.lock().unwrap();

        let mut staff = vec![];
        {
            let mut stmt = conn.prepare("SELECT id, name, role FROM staff ORDER BY rowid")?;
            let rows = stmt.query_map([], |r| {
                Ok(StaffMember {
                    id: StaffId::from_str(r.get::<_, String>(0)?),
                    name: r.get(1)?,
                    role: Self::str_to_role(&r.get::<_, String>(2)?),
                })
            })?;
            for row in rows {
                staff.push(row?);
            }
        }

        let mut tasks = vec![];
        {
            let mut stmt = conn.prepare(
                "SELECT id, title, staff_id, priority, status, created_at, updated_at
                 FROM tasks ORDER BY rowid",
            )?;
            let rows = stmt.query_map([], |r| {
                let priority: Option<String> = r.get(3)?;
                Ok(Task {
                    id: TaskId::from_str(r.get::<_, String>(0)?),
                    title: r.get(1)?,
                    staff_id: StaffId::from_str(r.get::<_, String>(2)?),
                    priority: priority.as_deref().and_then(Priority::parse),
                    status: Self::str_to_status(&r.get::<_, String>(4)?),
                    created_at_unix: r.get(5)?,
                    updated_at_unix: r.get(6)?,
                })
            })?;
            for row in rows {
                tasks.push(row?);
            }
        }

        Ok(Snapshot {
            now_unix,
            staff,
            tasks,
        })
    }

    fn insert_staff(&self, staff: StaffMember) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO staff(id, name, role) VALUES (?1, ?2, ?3)",
            params![staff.id.0, staff.name, Self::role_to_str(&staff.role)],
        )?;
        Ok(())
    }

    fn insert_task(&self, task: Task) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tasks(id, title, staff_id, priority, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.id.0,
                task.title,
                task.staff_id.0,
                task.priority.map(Priority::as_str),
                Self::status_to_str(&task.status),
                task.created_at_unix,
                task.updated_at_unix
            ],
        )?;
        Ok(())
    }

    fn set_task_status(&self, task_id: &TaskId, status: TaskStatus) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE tasks SET status=?1 WHERE id=?2",
            params![Self::status_to_str(&status), task_id.0],
        )?;
        Ok(())
    }

    fn apply_reassignments(&self, changes: &[Reassignment], now_unix: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        for c in changes {
            let updated = tx.execute(
                "UPDATE tasks SET staff_id=?1, updated_at=?2 WHERE id=?3",
                params![c.to.0, now_unix, c.task_id.0],
            )?;
            if updated == 0 {
                // Rolls back the whole batch; partial application is
                // never visible.
                return Err(anyhow!("unknown task in batch: {}", c.task_id.as_str()));
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn append_log_entry(&self, entry: RedistributionLogEntry) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO redistribution_logs(id, created_at, clinic_id, leave_full_json, leave_half_json, tasks_after_json, staff_load_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id.0,
                entry.timestamp_unix,
                entry.clinic_id.0,
                serde_json::to_string(&entry.leave_full_ids)?,
                serde_json::to_string(&entry.leave_half_ids)?,
                serde_json::to_string(&entry.tasks_after)?,
                serde_json::to_string(&entry.staff_load_after)?,
            ],
        )?;
        Ok(())
    }

    fn log_entries(&self) -> Result<Vec<RedistributionLogEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, created_at, clinic_id, leave_full_json, leave_half_json, tasks_after_json, staff_load_json
             FROM redistribution_logs ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, i64>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, String>(5)?,
                r.get::<_, String>(6)?,
            ))
        })?;

        let mut entries = vec![];
        for row in rows {
            let (id, created_at, clinic_id, full_json, half_json, tasks_json, load_json) = row?;
            let leave_full_ids: Vec<StaffId> = serde_json::from_str(&full_json)?;
            let leave_half_ids: Vec<StaffId> = serde_json::from_str(&half_json)?;
            let tasks_after: Vec<TaskAssignment> = serde_json::from_str(&tasks_json)?;
            let staff_load_after: BTreeMap<StaffId, u32> = serde_json::from_str(&load_json)?;
            entries.push(RedistributionLogEntry {
                id: LogEntryId::from_str(id),
                timestamp_unix: created_at,
                clinic_id: ClinicId::from_str(clinic_id),
                leave_full_ids,
                leave_half_ids,
                tasks_after,
                staff_load_after,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_task(id: &str, staff_id: &str, priority: Option<Priority>) -> Task {
        Task {
            id: TaskId::from_str(id),
            title: "t".to_string(),
            staff_id: StaffId::from_str(staff_id),
            priority,
            status: TaskStatus::Pending,
            created_at_unix: 100,
            updated_at_unix: 100,
        }
    }

    #[test]
    fn sqlite_open_and_migrate() {
        let dir = tempdir().unwrap();
        let _ = SqliteStorage::open(&dir.path().join("medshift.db")).unwrap();
        // Reopening runs the migration again without complaint.
        let _ = SqliteStorage::open(&dir.path().join("medshift.db")).unwrap();
    }

    #[test]
    fn roundtrips_staff_and_tasks() {
        let dir = tempdir().unwrap();
        let store = SqliteStorage::open(&dir.path().join("medshift.db")).unwrap();

        store
            .insert_staff(StaffMember {
                id: StaffId::from_str("s1"),
                name: "Asha".to_string(),
                role: Role::Staff,
            })
            .unwrap();
        store
            .insert_task(sample_task("t1", "s1", Some(Priority::High)))
            .unwrap();
        store.insert_task(sample_task("t2", "s1", None)).unwrap();

        let snap = store.load_snapshot(200).unwrap();
        assert_eq!(snap.staff.len(), 1);
        assert_eq!(snap.staff[0].role, Role::Staff);
        assert_eq!(snap.tasks.len(), 2);
        assert_eq!(snap.tasks[0].priority, Some(Priority::High));
        assert_eq!(snap.tasks[1].priority, None);
    }

    #[test]
    fn unrecognized_priority_decodes_as_none() {
        let dir = tempdir().unwrap();
        let store = SqliteStorage::open(&dir.path().join("medshift.db")).unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO tasks(id, title, staff_id, priority, status, created_at, updated_at)
                 VALUES ('t1', 't', 's1', 'urgent!!', 'pending', 0, 0)",
                [],
            )
            .unwrap();
        }
        let snap = store.load_snapshot(0).unwrap();
        assert_eq!(snap.tasks[0].priority, None);
        assert_eq!(snap.tasks[0].weight(), 1);
    }

    #[test]
    fn batch_is_atomic_on_unknown_task() {
        let dir = tempdir().unwrap();
        let store = SqliteStorage::open(&dir.path().join("medshift.db")).unwrap();
        store
            .insert_task(sample_task("t1", "a", Some(Priority::Low)))
            .unwrap();

        let res = store.apply_reassignments(
            &[
                Reassignment {
                    task_id: TaskId::from_str("t1"),
                    from: StaffId::from_str("a"),
                    to: StaffId::from_str("b"),
                    weight: 1,
                },
                Reassignment {
                    task_id: TaskId::from_str("missing"),
                    from: StaffId::from_str("a"),
                    to: StaffId::from_str("b"),
                    weight: 1,
                },
            ],
            999,
        );
        assert!(res.is_err());

        // The first update rolled back with the failed one.
        let snap = store.load_snapshot(0).unwrap();
        assert_eq!(snap.tasks[0].staff_id.as_str(), "a");
        assert_eq!(snap.tasks[0].updated_at_unix, 100);
    }

    #[test]
    fn batch_updates_assignee_and_timestamp() {
        let dir = tempdir().unwrap();
        let store = SqliteStorage::open(&dir.path().join("medshift.db")).unwrap();
        store
            .insert_task(sample_task("t1", "a", Some(Priority::Low)))
            .unwrap();

        store
            .apply_reassignments(
                &[Reassignment {
                    task_id: TaskId::from_str("t1"),
                    from: StaffId::from_str("a"),
                    to: StaffId::from_str("b"),
                    weight: 1,
                }],
                999,
            )
            .unwrap();

        let snap = store.load_snapshot(0).unwrap();
        assert_eq!(snap.tasks[0].staff_id.as_str(), "b");
        assert_eq!(snap.tasks[0].updated_at_unix, 999);
    }

    #[test]
    fn log_entry_roundtrips_json_columns() {
        let dir = tempdir().unwrap();
        let store = SqliteStorage::open(&dir.path().join("medshift.db")).unwrap();

        let mut load = BTreeMap::new();
        load.insert(StaffId::from_str("b"), 4u32);
        let entry = RedistributionLogEntry {
            id: LogEntryId::from_str("l1"),
            timestamp_unix: 500,
            clinic_id: ClinicId::from_str("clinic-9"),
            leave_full_ids: vec![StaffId::from_str("a")],
            leave_half_ids: vec![],
            tasks_after: vec![TaskAssignment {
                task_id: TaskId::from_str("t1"),
                staff_id: StaffId::from_str("b"),
                priority: Some(Priority::High),
            }],
            staff_load_after: load,
        };
        store.append_log_entry(entry.clone()).unwrap();

        let entries = store.log_entries().unwrap();
        assert_eq!(entries, vec![entry]);
    }
}
