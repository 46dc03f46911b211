use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::battle::BattlePlan;
use crate::session::war::WarConfig;

/// Configuration the session ran with, tagged by flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SessionConfig {
    Attack(BattlePlan),
    War(WarConfig),
}

impl SessionConfig {
    pub fn mode(&self) -> &'static str {
        match self {
            SessionConfig::Attack(_) => "attack",
            SessionConfig::War(_) => "war",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub duration_minutes: u32,
    pub accuracy: u32,
    #[serde(default)]
    pub focus_health: u32,
    #[serde(default)]
    pub focus_score: u32,
    #[serde(default)]
    pub tab_switches: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectTally {
    pub attempted: u32,
    pub correct: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performance {
    pub total_questions: u32,
    pub attempted: u32,
    pub correct: u32,
    pub subjects: BTreeMap<String, SubjectTally>,
    #[serde(default)]
    pub reflection: String,
}

impl Performance {
    /// Recompute the headline totals from the per-subject tallies.
    pub fn from_subjects(
        total_questions: u32,
        subjects: BTreeMap<String, SubjectTally>,
        reflection: String,
    ) -> Self {
        let attempted = subjects.values().map(|t| t.attempted).sum();
        let correct = subjects.values().map(|t| t.correct).sum();
        Self {
            total_questions,
            attempted,
            correct,
            subjects,
            reflection,
        }
    }
}

/// Historical record of one completed session. Never mutated after it is
/// appended to the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub config: SessionConfig,
    pub session_stats: SessionStats,
    pub performance: Performance,
    pub timestamp: i64,
}

impl Report {
    pub fn new(
        config: SessionConfig,
        session_stats: SessionStats,
        performance: Performance,
        created_at: DateTime<Utc>,
    ) -> Self {
        let millis = created_at.timestamp_millis();
        Self {
            id: millis,
            date: created_at,
            config,
            session_stats,
            performance,
            timestamp: millis,
        }
    }
}

/// `round(100 * correct / total)`, 0 when `total` is 0.
pub fn percent(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(correct) * 100.0 / f64::from(total)).round() as u32
}
