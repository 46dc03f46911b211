use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::session::battle::{
    BattlePlan, MAX_TARGET_QUESTIONS, MAX_TIME_LIMIT_MINUTES, ReflectionPolicy,
};
use crate::session::question::DifficultyMix;
use crate::session::war::MAX_WAR_MINUTES;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_time_limit_minutes")]
    pub time_limit_minutes: u32,
    #[serde(default = "default_target_questions")]
    pub target_questions: usize,
    #[serde(default = "default_war_duration_minutes")]
    pub war_duration_minutes: u32,
    #[serde(default)]
    pub reflection_policy: ReflectionPolicy,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    // Kept last: TOML tables must follow plain keys.
    #[serde(default)]
    pub difficulty_mix: DifficultyMix,
}

fn default_time_limit_minutes() -> u32 {
    30
}
fn default_target_questions() -> usize {
    20
}
fn default_war_duration_minutes() -> u32 {
    180
}
fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("beastmode")
        .to_string_lossy()
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_limit_minutes: default_time_limit_minutes(),
            target_questions: default_target_questions(),
            war_duration_minutes: default_war_duration_minutes(),
            reflection_policy: ReflectionPolicy::default(),
            data_dir: default_data_dir(),
            difficulty_mix: DifficultyMix::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("beastmode")
            .join("config.toml")
    }

    /// Clamp values into supported ranges. Call after deserialization or
    /// after applying command-line overrides.
    pub fn validate(&mut self) {
        self.time_limit_minutes = self.time_limit_minutes.clamp(5, MAX_TIME_LIMIT_MINUTES);
        self.target_questions = self.target_questions.clamp(1, MAX_TARGET_QUESTIONS);
        self.war_duration_minutes = self.war_duration_minutes.clamp(1, MAX_WAR_MINUTES);
        if self.difficulty_mix.total() == 0 {
            self.difficulty_mix = DifficultyMix::default();
        }
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir();
        }
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// A battle plan pre-filled with the configured defaults.
    pub fn battle_plan(&self) -> BattlePlan {
        BattlePlan {
            subject: String::new(),
            topic: String::new(),
            time_limit_minutes: self.time_limit_minutes,
            target_questions: self.target_questions,
            difficulty_mix: self.difficulty_mix,
        }
    }
}
