use serde::{Deserialize, Serialize};

use crate::error::{BeastError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopicStatus {
    Mastered,
    NeedsRevision,
    Confused,
}

impl TopicStatus {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mastered" => Some(TopicStatus::Mastered),
            "needs-revision" | "revise" => Some(TopicStatus::NeedsRevision),
            "confused" => Some(TopicStatus::Confused),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TopicStatus::Mastered => "mastered",
            TopicStatus::NeedsRevision => "needs-revision",
            TopicStatus::Confused => "confused",
        }
    }
}

/// The mission chosen before a study ritual.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefensePlan {
    pub subject: String,
    pub unit: String,
    pub topic: String,
    pub target_hours: u32,
    /// How often the topic shows up in previous-year questions, 1..=5.
    pub pyq_relevance: u8,
    /// Self-rated energy, 0..=100.
    pub energy_level: u8,
}

impl DefensePlan {
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("subject", &self.subject),
            ("unit", &self.unit),
            ("topic", &self.topic),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(BeastError::IncompleteConfiguration(format!(
                "missing {}",
                missing.join(", ")
            )));
        }
        if self.target_hours == 0 {
            return Err(BeastError::IncompleteConfiguration(
                "target hours must be at least 1".to_string(),
            ));
        }
        if !(1..=5).contains(&self.pyq_relevance) {
            return Err(BeastError::IncompleteConfiguration(
                "PYQ relevance must be between 1 and 5".to_string(),
            ));
        }
        if self.energy_level > 100 {
            return Err(BeastError::IncompleteConfiguration(
                "energy level must be between 0 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyLog {
    pub resources: Vec<String>,
    pub study_secs: u32,
    pub learnings: String,
    pub confusions: String,
    pub review_items: Vec<String>,
    pub topic_status: Option<TopicStatus>,
}

/// One Defense run. Study time counts up while the study clock runs.
#[derive(Clone, Debug, Default)]
pub struct DefenseSession {
    plan: Option<DefensePlan>,
    log: StudyLog,
    studying: bool,
}

impl DefenseSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mission(&mut self, plan: DefensePlan) -> Result<()> {
        plan.validate()?;
        self.plan = Some(plan);
        Ok(())
    }

    pub fn require_mission(&self) -> Result<&DefensePlan> {
        self.plan.as_ref().ok_or_else(|| {
            BeastError::IncompleteConfiguration("set a mission first".to_string())
        })
    }

    pub fn add_resource(&mut self, resource: &str) {
        let resource = resource.trim();
        if !resource.is_empty() {
            self.log.resources.push(resource.to_string());
        }
    }

    pub fn start_study(&mut self) -> Result<()> {
        self.require_mission()?;
        self.studying = true;
        Ok(())
    }

    pub fn stop_study(&mut self) {
        self.studying = false;
    }

    pub fn tick(&mut self) {
        if self.studying {
            self.log.study_secs += 1;
        }
    }

    pub fn note_learning(&mut self, text: &str) {
        append_line(&mut self.log.learnings, text);
    }

    pub fn note_confusion(&mut self, text: &str) {
        append_line(&mut self.log.confusions, text);
    }

    pub fn add_review_item(&mut self, item: &str) {
        let item = item.trim();
        if !item.is_empty() {
            self.log.review_items.push(item.to_string());
        }
    }

    pub fn set_topic_status(&mut self, status: TopicStatus) {
        self.log.topic_status = Some(status);
    }

    /// The log is complete once the topic has a status.
    pub fn require_log(&self) -> Result<()> {
        match self.log.topic_status {
            Some(_) => Ok(()),
            None => Err(BeastError::IncompleteConfiguration(
                "mark the topic as mastered, needs-revision or confused".to_string(),
            )),
        }
    }

    pub fn study_minutes(&self) -> u32 {
        self.log.study_secs / 60
    }

    /// Share of the target hours already studied, in percent.
    pub fn target_progress(&self) -> u32 {
        match &self.plan {
            Some(plan) => {
                let target_secs = plan.target_hours * 3600;
                (self.log.study_secs * 100 / target_secs).min(100)
            }
            None => 0,
        }
    }

    pub fn plan(&self) -> Option<&DefensePlan> {
        self.plan.as_ref()
    }

    pub fn log(&self) -> &StudyLog {
        &self.log
    }

    pub fn is_studying(&self) -> bool {
        self.studying
    }
}

fn append_line(buf: &mut String, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !buf.is_empty() {
        buf.push('\n');
    }
    buf.push_str(text);
}
