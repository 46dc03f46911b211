use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::report::Report;
use crate::session::war::{WarConfig, WarPhase};

pub const SCHEMA_VERSION: u32 = 1;

/// The single persisted blob: war configuration, report history
/// (newest-first), phase tag and live timer values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    pub schema_version: u32,
    pub config: Option<WarConfig>,
    pub reports: Vec<Report>,
    pub phase: WarPhase,
    pub time_left: u32,
    pub total_duration: u32,
    pub is_active: bool,
    pub start_time: Option<DateTime<Utc>>,
}

impl Default for BattleSnapshot {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            config: None,
            reports: Vec::new(),
            phase: WarPhase::Config,
            time_left: 0,
            total_duration: 0,
            is_active: false,
            start_time: None,
        }
    }
}

impl BattleSnapshot {
    /// Check if loaded data has a stale schema version and needs reset.
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }
}

pub const EXPORT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub beastmode_export_version: u32,
    pub exported_at: DateTime<Utc>,
    pub reports: Vec<Report>,
}
