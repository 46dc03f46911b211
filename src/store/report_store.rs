use std::path::Path;

use chrono::Utc;
use tracing::{debug, warn};

use crate::engine::stats::{self, Achievement, AggregateStats, ALL_ACHIEVEMENTS};
use crate::error::{BeastError, Result};
use crate::session::report::Report;
use crate::session::war::WarSession;
use crate::store::json_store::{JsonStore, read_json, write_json};
use crate::store::schema::{BattleSnapshot, EXPORT_VERSION, ExportData};

/// Append-only report history plus the live war state, snapshotted to disk
/// on every mutation. The in-memory copy stays authoritative when a write
/// fails.
pub struct ReportStore {
    backend: JsonStore,
    snapshot: BattleSnapshot,
}

impl ReportStore {
    /// Load the snapshot. A missing file starts fresh; an unreadable or
    /// stale one is moved aside and also starts fresh.
    pub fn open(backend: JsonStore) -> Self {
        let snapshot = match backend.load_snapshot() {
            Some(snapshot) if !snapshot.needs_reset() => snapshot,
            _ => {
                match backend.quarantine_snapshot() {
                    Ok(aside) => warn!(
                        path = %aside.display(),
                        "unreadable battle store moved aside, starting fresh"
                    ),
                    Err(e) => warn!("unreadable battle store could not be moved aside: {e}"),
                }
                BattleSnapshot::default()
            }
        };
        debug!(reports = snapshot.reports.len(), "battle store loaded");
        Self { backend, snapshot }
    }

    /// Prepend `report` to the history and persist. The report's id is
    /// bumped if needed so ids stay strictly increasing.
    pub fn append(&mut self, mut report: Report) -> Result<&Report> {
        if let Some(newest) = self.snapshot.reports.first() {
            report.id = report.id.max(newest.id + 1);
        }
        debug!(id = report.id, mode = report.config.mode(), "report appended");
        self.snapshot.reports.insert(0, report);
        let saved = self.persist();
        saved.map(|()| &self.snapshot.reports[0])
    }

    /// History, newest first.
    pub fn all(&self) -> &[Report] {
        &self.snapshot.reports
    }

    pub fn aggregate_stats(&self) -> AggregateStats {
        stats::aggregate(&self.snapshot.reports)
    }

    pub fn achievements(&self) -> Vec<(Achievement, u32, bool)> {
        let stats = self.aggregate_stats();
        ALL_ACHIEVEMENTS
            .iter()
            .map(|a| (*a, a.progress(&stats), a.is_unlocked(&stats)))
            .collect()
    }

    /// War session as it was when last saved.
    pub fn war_session(&self) -> WarSession {
        let s = &self.snapshot;
        WarSession::restore(
            s.config.clone(),
            s.phase,
            s.time_left,
            s.total_duration,
            s.start_time,
        )
    }

    pub fn save_war_session(&mut self, war: &WarSession) -> Result<()> {
        let s = &mut self.snapshot;
        s.config = war.config().cloned();
        s.phase = war.phase();
        s.time_left = war.time_left();
        s.total_duration = war.total_duration();
        s.is_active = war.is_active();
        s.start_time = war.started_at();
        self.persist()
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        let data = ExportData {
            beastmode_export_version: EXPORT_VERSION,
            exported_at: Utc::now(),
            reports: self.snapshot.reports.clone(),
        };
        write_json(path, &data).map_err(storage_failure)
    }

    /// Replace the history with an exported one. Nothing changes if the
    /// file is unreadable or from another export version.
    pub fn import(&mut self, path: &Path) -> Result<usize> {
        let data: ExportData = read_json(path).map_err(storage_failure)?;
        if data.beastmode_export_version != EXPORT_VERSION {
            return Err(BeastError::StorageFailure(format!(
                "Unsupported export version: {} (expected {})",
                data.beastmode_export_version, EXPORT_VERSION
            )));
        }

        let mut next = self.snapshot.clone();
        next.reports = data.reports;
        next.reports.sort_by(|a, b| b.id.cmp(&a.id));
        self.backend.save_snapshot(&next).map_err(storage_failure)?;
        self.snapshot = next;
        Ok(self.snapshot.reports.len())
    }

    pub fn snapshot(&self) -> &BattleSnapshot {
        &self.snapshot
    }

    fn persist(&self) -> Result<()> {
        self.backend.save_snapshot(&self.snapshot).map_err(|e| {
            warn!("failed to write battle store: {e:#}");
            storage_failure(e)
        })
    }
}

fn storage_failure(err: anyhow::Error) -> BeastError {
    BeastError::StorageFailure(format!("{err:#}"))
}
