use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use medshift_core::{Priority, Role, StaffId, StaffMember, Task, TaskId, TaskStatus};
use medshift_runner::{now_unix, RedistributeError, RedistributionRequest, Runner};
use medshift_storage::Storage;

#[derive(Parser)]
#[command(name = "medshift", version)]
struct Cli {
    /// Clinic data directory (holds medshift.toml and the database)
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a clinic data directory (config + database)
    Init {
        #[arg(long, default_value = "default-clinic")]
        clinic: String,
    },

    /// Show the roster, per-staff load, and task counts
    Status,

    /// Add a staff member to the roster
    StaffAdd {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: String,
        /// staff | doctor | clinic-admin | super-admin
        #[arg(long, default_value = "staff")]
        role: String,
    },

    /// Assign a task to a staff member
    TaskAdd {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        title: String,
        #[arg(long)]
        staff: String,
        /// high | medium | low
        #[arg(long, default_value = "medium")]
        priority: String,
    },

    /// Mark a task completed
    TaskComplete {
        #[arg(long)]
        id: String,
    },

    /// Approve a leave request and rebalance that staff member's tasks
    LeaveApprove {
        #[arg(long)]
        staff: String,
        /// "Full day" or "Half day"; anything else approves without rebalancing
        #[arg(long)]
        leave_type: String,
    },

    /// Run a redistribution directly from explicit leave sets
    Redistribute {
        #[arg(long)]
        full: Vec<String>,
        #[arg(long)]
        half: Vec<String>,
        /// Pin the half-day task shuffle for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the redistribution audit log
    Log,
}

fn parse_role(s: &str) -> anyhow::Result<Role> {
    Ok(match s {
        "staff" => Role::Staff,
        "doctor" => Role::Doctor,
        "clinic-admin" => Role::ClinicAdmin,
        "super-admin" => Role::SuperAdmin,
        other => anyhow::bail!("unknown role: {other}"),
    })
}

fn print_report(res: Result<medshift_runner::RedistributionReport, RedistributeError>) {
    match res {
        Ok(report) => {
            println!("Moved {} task(s)", report.moved_task_count);
            for id in &report.unmoved_task_ids {
                println!("! no eligible staff for task {}, left unmoved", id.as_str());
            }
            for (staff, load) in &report.staff_load_after {
                println!("- {} load {}", staff.as_str(), load);
            }
        }
        Err(RedistributeError::Log { moved, source }) => {
            // The batch committed; only the audit trail is missing.
            println!("Moved {moved} task(s), but the audit log write failed: {source}");
        }
        Err(err) => {
            println!("Redistribution failed, tasks unchanged: {err}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Init { clinic } => {
            Runner::init_dir(&cli.data_dir, &clinic)?;
            println!("Initialized clinic {} in {}", clinic, cli.data_dir.display());
        }
        Command::Status => {
            let r = Runner::open(cli.data_dir)?;
            let snap = r.storage.load_snapshot(now_unix())?;
            println!("Clinic: {}", r.cfg.clinic.id);
            println!("Staff: {}", snap.staff.len());
            for s in &snap.staff {
                let load: u32 = snap
                    .tasks
                    .iter()
                    .filter(|t| t.staff_id == s.id)
                    .map(Task::weight)
                    .sum();
                println!("- {} [{:?}] {} (load {})", s.id.as_str(), s.role, s.name, load);
            }
            println!("Tasks: {}", snap.tasks.len());
        }
        Command::StaffAdd { id, name, role } => {
            let r = Runner::open(cli.data_dir)?;
            let id = id.map(StaffId::from_str).unwrap_or_else(StaffId::new);
            r.storage.insert_staff(StaffMember {
                id: id.clone(),
                name,
                role: parse_role(&role)?,
            })?;
            println!("Added staff {}", id.as_str());
        }
        Command::TaskAdd {
            id,
            title,
            staff,
            priority,
        } => {
            let r = Runner::open(cli.data_dir)?;
            let id = id.map(TaskId::from_str).unwrap_or_else(TaskId::new);
            let now = now_unix();
            r.storage.insert_task(Task {
                id: id.clone(),
                title,
                staff_id: StaffId::from_str(staff),
                priority: Priority::parse(&priority),
                status: TaskStatus::Pending,
                created_at_unix: now,
                updated_at_unix: now,
            })?;
            println!("Added task {}", id.as_str());
        }
        Command::TaskComplete { id } => {
            let r = Runner::open(cli.data_dir)?;
            r.storage
                .set_task_status(&TaskId::from_str(id.clone()), TaskStatus::Completed)?;
            println!("Completed task {id}");
        }
        Command::LeaveApprove { staff, leave_type } => {
            let r = Runner::open(cli.data_dir)?;
            print_report(r.approve_leave(&StaffId::from_str(staff), &leave_type));
        }
        Command::Redistribute { full, half, seed } => {
            let r = Runner::open(cli.data_dir)?;
            let req = RedistributionRequest {
                leave_full: full.into_iter().map(StaffId::from_str).collect(),
                leave_half: half.into_iter().map(StaffId::from_str).collect(),
                clinic_id: None,
            };
            let res = match seed {
                Some(seed) => r.redistribute_seeded(&req, seed),
                None => r.redistribute(&req),
            };
            print_report(res);
        }
        Command::Log => {
            let r = Runner::open(cli.data_dir)?;
            let entries = r.storage.log_entries()?;
            println!("Redistribution runs: {}", entries.len());
            for e in entries {
                println!(
                    "- {} at {} clinic {} full {:?} half {:?} ({} tasks tracked)",
                    e.id.as_str(),
                    e.timestamp_unix,
                    e.clinic_id.as_str(),
                    e.leave_full_ids.iter().map(StaffId::as_str).collect::<Vec<_>>(),
                    e.leave_half_ids.iter().map(StaffId::as_str).collect::<Vec<_>>(),
                    e.tasks_after.len()
                );
            }
        }
    }

    Ok(())
}
