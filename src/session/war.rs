use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::timer::{Countdown, Tick};
use crate::error::{BeastError, Result};
use crate::session::report::{
    Performance, Report, SessionConfig, SessionStats, SubjectTally, percent,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestType {
    #[default]
    FullLength,
    SubjectWise,
}

impl TestType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "full-length" | "full" => Some(TestType::FullLength),
            "subject-wise" | "subject" => Some(TestType::SubjectWise),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestType::FullLength => "full-length",
            TestType::SubjectWise => "subject-wise",
        }
    }
}

pub const MAX_WAR_MINUTES: u32 = 600;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarConfig {
    pub student_id: String,
    pub test_type: TestType,
    pub duration_minutes: u32,
}

impl WarConfig {
    pub fn validate(&self) -> Result<()> {
        if self.student_id.trim().is_empty() {
            return Err(BeastError::IncompleteConfiguration(
                "enter a student id".to_string(),
            ));
        }
        if !(1..=MAX_WAR_MINUTES).contains(&self.duration_minutes) {
            return Err(BeastError::IncompleteConfiguration(format!(
                "duration must be between 1 and {MAX_WAR_MINUTES} minutes"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarPhase {
    #[default]
    Config,
    Active,
    Paused,
    Completed,
}

impl WarPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            WarPhase::Config => "config",
            WarPhase::Active => "active",
            WarPhase::Paused => "paused",
            WarPhase::Completed => "completed",
        }
    }
}

/// Mock-exam session: a long countdown plus the phase tag that survives
/// process restarts.
#[derive(Clone, Debug, Default)]
pub struct WarSession {
    config: Option<WarConfig>,
    phase: WarPhase,
    timer: Countdown,
    started_at: Option<DateTime<Utc>>,
}

impl WarSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted values.
    pub fn restore(
        config: Option<WarConfig>,
        phase: WarPhase,
        time_left: u32,
        total_duration: u32,
        started_at: Option<DateTime<Utc>>,
    ) -> Self {
        let running = matches!(phase, WarPhase::Active | WarPhase::Paused);
        Self {
            config,
            phase,
            timer: Countdown::restore(
                total_duration,
                time_left,
                running,
                phase == WarPhase::Paused,
            ),
            started_at,
        }
    }

    pub fn set_config(&mut self, config: WarConfig) -> Result<()> {
        if matches!(self.phase, WarPhase::Active | WarPhase::Paused) {
            return Err(BeastError::NotActive("a war is in progress"));
        }
        config.validate()?;
        self.config = Some(config);
        self.phase = WarPhase::Config;
        Ok(())
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.phase != WarPhase::Config {
            return Err(BeastError::NotActive("the war has already started"));
        }
        let config = self.config.as_ref().ok_or_else(|| {
            BeastError::IncompleteConfiguration("configure the war first".to_string())
        })?;
        self.timer.start(config.duration_minutes * 60);
        self.started_at = Some(now);
        self.phase = WarPhase::Active;
        debug!(student = %config.student_id, secs = self.timer.total(), "war started");
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.phase != WarPhase::Active {
            return Err(BeastError::NotActive("the war is not running"));
        }
        self.timer.pause();
        self.phase = WarPhase::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.phase != WarPhase::Paused {
            return Err(BeastError::NotActive("the war is not paused"));
        }
        self.timer.resume();
        self.phase = WarPhase::Active;
        Ok(())
    }

    /// Returns true on the tick that runs the clock out.
    pub fn tick(&mut self) -> bool {
        if self.phase != WarPhase::Active {
            return false;
        }
        match self.timer.tick() {
            Tick::Expired => {
                debug!("war timer expired");
                self.phase = WarPhase::Completed;
                true
            }
            Tick::Running(_) | Tick::Idle => false,
        }
    }

    pub fn end(&mut self) -> Result<()> {
        if !matches!(self.phase, WarPhase::Active | WarPhase::Paused) {
            return Err(BeastError::NotActive("the war is not running"));
        }
        self.timer.stop();
        self.phase = WarPhase::Completed;
        Ok(())
    }

    /// Back to the config phase with zeroed timers; the config is kept.
    pub fn reset(&mut self) {
        self.phase = WarPhase::Config;
        self.timer = Countdown::default();
        self.started_at = None;
    }

    /// Whole minutes spent: `floor((total - remaining) / 60)`.
    pub fn duration_minutes(&self) -> u32 {
        self.timer.elapsed() / 60
    }

    pub fn report(&self, card: &ReportCard, now: DateTime<Utc>) -> Result<Report> {
        if self.phase != WarPhase::Completed {
            return Err(BeastError::NotActive("the war has not ended"));
        }
        let config = self.config.clone().ok_or_else(|| {
            BeastError::IncompleteConfiguration("no war configuration".to_string())
        })?;
        let performance = Performance::from_subjects(
            card.total_marks,
            card.subjects.clone(),
            card.reflection.clone(),
        );
        Ok(Report::new(
            SessionConfig::War(config),
            SessionStats {
                duration_minutes: self.duration_minutes(),
                accuracy: percent(performance.correct, performance.attempted),
                focus_health: card.focus_health,
                focus_score: card.focus_score,
                tab_switches: card.tab_switches,
            },
            performance,
            now,
        ))
    }

    pub fn config(&self) -> Option<&WarConfig> {
        self.config.as_ref()
    }

    pub fn phase(&self) -> WarPhase {
        self.phase
    }

    pub fn time_left(&self) -> u32 {
        self.timer.remaining()
    }

    pub fn total_duration(&self) -> u32 {
        self.timer.total()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, WarPhase::Active | WarPhase::Paused)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }
}

pub const DEFAULT_SUBJECTS: &[&str] = &["math", "english", "reasoning", "gk"];

/// Self-reported results of a mock exam.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportCard {
    pub total_marks: u32,
    pub subjects: BTreeMap<String, SubjectTally>,
    pub reflection: String,
    pub focus_health: u32,
    pub focus_score: u32,
    pub tab_switches: u32,
}

impl Default for ReportCard {
    fn default() -> Self {
        Self {
            total_marks: 0,
            subjects: DEFAULT_SUBJECTS
                .iter()
                .map(|s| (s.to_string(), SubjectTally::default()))
                .collect(),
            reflection: String::new(),
            focus_health: 0,
            focus_score: 0,
            tab_switches: 0,
        }
    }
}

impl ReportCard {
    pub fn record(&mut self, subject: &str, attempted: u32, correct: u32) -> Result<()> {
        let subject = subject.trim().to_ascii_lowercase();
        if subject.is_empty() {
            return Err(BeastError::IncompleteConfiguration(
                "name the subject".to_string(),
            ));
        }
        if correct > attempted {
            return Err(BeastError::IncompleteConfiguration(format!(
                "{subject}: correct ({correct}) exceeds attempted ({attempted})"
            )));
        }
        self.subjects
            .insert(subject, SubjectTally { attempted, correct });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(minutes: u32) -> WarConfig {
        WarConfig {
            student_id: "STU-42".to_string(),
            test_type: TestType::FullLength,
            duration_minutes: minutes,
        }
    }

    #[test]
    fn test_start_requires_config() {
        let mut war = WarSession::new();
        assert!(matches!(
            war.start(Utc::now()),
            Err(BeastError::IncompleteConfiguration(_))
        ));
        assert_eq!(war.phase(), WarPhase::Config);
    }

    #[test]
    fn test_config_rejects_blank_student() {
        let mut war = WarSession::new();
        let mut cfg = config(10);
        cfg.student_id = String::new();
        assert!(war.set_config(cfg).is_err());
        assert!(war.config().is_none());
    }

    #[test]
    fn test_config_rejects_out_of_range_duration() {
        let mut war = WarSession::new();
        assert!(matches!(
            war.set_config(config(100_000_000)),
            Err(BeastError::IncompleteConfiguration(_))
        ));
        assert!(war.config().is_none());
        war.set_config(config(MAX_WAR_MINUTES)).unwrap();
        war.start(Utc::now()).unwrap();
        assert_eq!(war.time_left(), MAX_WAR_MINUTES * 60);
    }

    #[test]
    fn test_lifecycle_pause_resume_end() {
        let mut war = WarSession::new();
        war.set_config(config(2)).unwrap();
        war.start(Utc::now()).unwrap();
        assert_eq!(war.time_left(), 120);
        war.tick();
        war.pause().unwrap();
        war.tick();
        assert_eq!(war.time_left(), 119);
        assert_eq!(war.phase(), WarPhase::Paused);
        war.resume().unwrap();
        for _ in 0..60 {
            war.tick();
        }
        war.end().unwrap();
        assert_eq!(war.phase(), WarPhase::Completed);
        assert_eq!(war.duration_minutes(), 1);
        assert!(war.end().is_err());
    }

    #[test]
    fn test_expiry_completes_once() {
        let mut war = WarSession::new();
        war.set_config(config(1)).unwrap();
        war.start(Utc::now()).unwrap();
        let expiries = (0..100).filter(|_| war.tick()).count();
        assert_eq!(expiries, 1);
        assert_eq!(war.phase(), WarPhase::Completed);
        assert_eq!(war.duration_minutes(), 1);
    }

    #[test]
    fn test_reset_zeroes_timers_and_keeps_config() {
        let mut war = WarSession::new();
        war.set_config(config(5)).unwrap();
        war.start(Utc::now()).unwrap();
        war.end().unwrap();
        war.reset();
        assert_eq!(war.phase(), WarPhase::Config);
        assert_eq!(war.time_left(), 0);
        assert_eq!(war.total_duration(), 0);
        assert!(war.config().is_some());
        assert!(war.started_at().is_none());
    }

    #[test]
    fn test_restore_mid_session() {
        let mut war = WarSession::restore(Some(config(3)), WarPhase::Paused, 100, 180, None);
        assert!(!war.tick());
        assert_eq!(war.time_left(), 100);
        war.resume().unwrap();
        war.tick();
        assert_eq!(war.time_left(), 99);
    }

    #[test]
    fn test_report_from_card() {
        let mut war = WarSession::new();
        war.set_config(config(3)).unwrap();
        war.start(Utc::now()).unwrap();
        assert!(war.report(&ReportCard::default(), Utc::now()).is_err());
        for _ in 0..130 {
            war.tick();
        }
        war.end().unwrap();

        let mut card = ReportCard::default();
        card.total_marks = 100;
        card.record("Math", 20, 15).unwrap();
        card.record("english", 10, 9).unwrap();
        card.reflection = "ran out of time on DI".to_string();
        assert!(card.record("gk", 3, 4).is_err());

        let report = war.report(&card, Utc::now()).unwrap();
        assert_eq!(report.session_stats.duration_minutes, 2);
        assert_eq!(report.session_stats.accuracy, 80);
        assert_eq!(report.performance.attempted, 30);
        assert_eq!(report.performance.correct, 24);
        assert_eq!(report.performance.subjects.len(), 4);
        assert_eq!(report.performance.subjects["math"].correct, 15);
    }

    #[test]
    fn test_test_type_names() {
        assert_eq!(TestType::from_name("Subject-Wise"), Some(TestType::SubjectWise));
        assert_eq!(TestType::from_name("full"), Some(TestType::FullLength));
        assert_eq!(TestType::from_name("sprint"), None);
    }
}
