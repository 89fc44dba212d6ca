use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use medshift_core::StaffId;
use medshift_storage_sqlite::SqliteStorage;

use crate::{
    redistribute_tasks, Config, RedistributeError, RedistributionReport, RedistributionRequest,
};

/// How an approved leave request classifies for redistribution purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaveKind {
    FullDay,
    HalfDay,
}

/// Classify a leave-type label the way the approval screen does: exactly
/// "Full day" / "Half day" (case-insensitive). Anything else triggers no
/// redistribution at all.
pub fn classify_leave_type(leave_type: &str) -> Option<LeaveKind> {
    match leave_type.to_ascii_lowercase().as_str() {
        "full day" => Some(LeaveKind::FullDay),
        "half day" => Some(LeaveKind::HalfDay),
        _ => None,
    }
}

pub struct Runner {
    pub data_dir: PathBuf,
    pub cfg: Config,
    pub storage: SqliteStorage,
    // Serializes redistribution runs within this process, so two approvals
    // cannot plan against the same pre-run snapshot.
    run_lock: Mutex<()>,
}

impl Runner {
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        let cfg_path = Config::config_path(&data_dir);
        let cfg = if cfg_path.exists() {
            Config::load_from(&cfg_path)?
        } else {
            let cfg = Config::default_for_clinic("default-clinic");
            cfg.save_to(&cfg_path)?;
            cfg
        };

        let storage = SqliteStorage::open(&cfg.db_path(&data_dir))?;
        Ok(Self {
            data_dir,
            cfg,
            storage,
            run_lock: Mutex::new(()),
        })
    }

    pub fn init_dir(data_dir: &Path, clinic_id: &str) -> Result<()> {
        let cfg_path = Config::config_path(data_dir);
        if !cfg_path.exists() {
            Config::default_for_clinic(clinic_id).save_to(&cfg_path)?;
        }
        let cfg = Config::load_from(&cfg_path)?;
        let _ = SqliteStorage::open(&cfg.db_path(data_dir))?;
        Ok(())
    }

    /// Run one redistribution with a fresh RNG. Runs are serialized behind
    /// the per-process lock.
    pub fn redistribute(
        &self,
        req: &RedistributionRequest,
    ) -> Result<RedistributionReport, RedistributeError> {
        self.redistribute_with_rng(req, &mut StdRng::from_entropy())
    }

    /// Seeded variant so operators (and tests) can reproduce the half-day
    /// task selection.
    pub fn redistribute_seeded(
        &self,
        req: &RedistributionRequest,
        seed: u64,
    ) -> Result<RedistributionReport, RedistributeError> {
        self.redistribute_with_rng(req, &mut StdRng::seed_from_u64(seed))
    }

    fn redistribute_with_rng(
        &self,
        req: &RedistributionRequest,
        rng: &mut StdRng,
    ) -> Result<RedistributionReport, RedistributeError> {
        let _guard = self.run_lock.lock().unwrap();
        let mut req = req.clone();
        if req.clinic_id.is_none() {
            req.clinic_id = Some(self.cfg.clinic_id());
        }
        redistribute_tasks(&self.storage, &req, rng)
    }

    /// Leave-approval hook: the approval workflow has already persisted the
    /// request's approved status; this classifies its type and rebalances.
    pub fn approve_leave(
        &self,
        staff_id: &StaffId,
        leave_type: &str,
    ) -> Result<RedistributionReport, RedistributeError> {
        let (full, half) = match classify_leave_type(leave_type) {
            Some(LeaveKind::FullDay) => (vec![staff_id.clone()], vec![]),
            Some(LeaveKind::HalfDay) => (vec![], vec![staff_id.clone()]),
            None => {
                info!(leave_type, "leave type does not trigger redistribution");
                (vec![], vec![])
            }
        };
        self.redistribute(&RedistributionRequest {
            leave_full: full,
            leave_half: half,
            clinic_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leave_type_classification() {
        assert_eq!(classify_leave_type("Full day"), Some(LeaveKind::FullDay));
        assert_eq!(classify_leave_type("half day"), Some(LeaveKind::HalfDay));
        assert_eq!(classify_leave_type("Sick leave"), None);
        assert_eq!(classify_leave_type(""), None);
    }
}
