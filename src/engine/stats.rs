use chrono::NaiveDate;

use crate::session::report::Report;

/// Numbers derived from the report history on every read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub total_battles: usize,
    pub total_study_minutes: u32,
    pub average_accuracy: u32,
    pub average_session_minutes: u32,
    pub current_streak_days: u32,
    pub total_tab_switches: u32,
}

pub fn aggregate(reports: &[Report]) -> AggregateStats {
    if reports.is_empty() {
        return AggregateStats::default();
    }
    let count = reports.len();
    let total_minutes: u32 = reports.iter().map(|r| r.session_stats.duration_minutes).sum();
    let total_accuracy: u32 = reports.iter().map(|r| r.session_stats.accuracy).sum();

    AggregateStats {
        total_battles: count,
        total_study_minutes: total_minutes,
        average_accuracy: rounded_mean(total_accuracy, count),
        average_session_minutes: rounded_mean(total_minutes, count),
        current_streak_days: current_streak_days(reports),
        total_tab_switches: reports.iter().map(|r| r.session_stats.tab_switches).sum(),
    }
}

fn rounded_mean(total: u32, count: usize) -> u32 {
    (f64::from(total) / count as f64).round() as u32
}

/// Consecutive-day run starting from the most recent report. Only a gap
/// of exactly one calendar day (UTC) extends the run; a same-day repeat or
/// a longer gap ends it.
pub fn current_streak_days(reports: &[Report]) -> u32 {
    let mut days: Vec<NaiveDate> = reports.iter().map(|r| r.date.date_naive()).collect();
    if days.is_empty() {
        return 0;
    }
    days.sort_by(|a, b| b.cmp(a));

    let mut streak = 1;
    for pair in days.windows(2) {
        if (pair[0] - pair[1]).num_days() == 1 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Achievement {
    FirstBlood,
    VeteranWarrior,
    WeekWarrior,
}

pub const ALL_ACHIEVEMENTS: &[Achievement] = &[
    Achievement::FirstBlood,
    Achievement::VeteranWarrior,
    Achievement::WeekWarrior,
];

impl Achievement {
    pub fn name(self) -> &'static str {
        match self {
            Achievement::FirstBlood => "First Blood",
            Achievement::VeteranWarrior => "Veteran Warrior",
            Achievement::WeekWarrior => "Week Warrior",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Achievement::FirstBlood => "Complete your first battle",
            Achievement::VeteranWarrior => "Complete 10 battles",
            Achievement::WeekWarrior => "7-day battle streak",
        }
    }

    pub fn target(self) -> u32 {
        match self {
            Achievement::FirstBlood => 1,
            Achievement::VeteranWarrior => 10,
            Achievement::WeekWarrior => 7,
        }
    }

    pub fn progress(self, stats: &AggregateStats) -> u32 {
        match self {
            Achievement::FirstBlood | Achievement::VeteranWarrior => stats.total_battles as u32,
            Achievement::WeekWarrior => stats.current_streak_days,
        }
    }

    pub fn is_unlocked(self, stats: &AggregateStats) -> bool {
        self.progress(stats) >= self.target()
    }
}
