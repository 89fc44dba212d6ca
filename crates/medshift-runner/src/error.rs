use thiserror::Error;

/// Failure taxonomy of one redistribution run. Everything is caught at the
/// entry-point boundary and handed back as a value; callers branch on the
/// variant to tell the operator what actually happened.
#[derive(Debug, Error)]
pub enum RedistributeError {
    /// Roster or task read failed; nothing was computed or written.
    #[error("reading staff roster and tasks: {0}")]
    Read(#[source] anyhow::Error),

    /// The atomic batch commit failed. The batch rolled back, so task
    /// assignments are still the pre-run ones and no audit entry exists.
    #[error("committing reassignment batch: {0}")]
    Write(#[source] anyhow::Error),

    /// The batch committed but the audit entry did not. Reassignment of
    /// `moved` tasks is durable; only the trail is missing. Reported
    /// distinctly from `Write` so operators know the moves took effect.
    #[error("{moved} reassignments committed but audit log append failed: {source}")]
    Log {
        moved: usize,
        #[source]
        source: anyhow::Error,
    },
}
