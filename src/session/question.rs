use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn weight(self) -> u32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyMix {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl Default for DifficultyMix {
    fn default() -> Self {
        Self {
            easy: 6,
            medium: 10,
            hard: 4,
        }
    }
}

impl DifficultyMix {
    pub fn total(&self) -> u32 {
        self.easy + self.medium + self.hard
    }

    /// Scale the mix to `count` questions using largest remainders, so the
    /// result always has exactly `count` entries. An empty mix yields all
    /// medium.
    pub fn distribute(&self, count: usize) -> Vec<Difficulty> {
        let total = self.total() as usize;
        if total == 0 {
            return vec![Difficulty::Medium; count];
        }

        let weights = [
            (Difficulty::Easy, self.easy as usize),
            (Difficulty::Medium, self.medium as usize),
            (Difficulty::Hard, self.hard as usize),
        ];
        let mut out = Vec::with_capacity(count);
        let mut remainders = Vec::with_capacity(weights.len());
        for (difficulty, weight) in weights {
            let exact = count * weight;
            out.extend(std::iter::repeat_n(difficulty, exact / total));
            remainders.push((exact % total, difficulty));
        }
        remainders.sort_by(|a, b| b.0.cmp(&a.0));
        let missing = count - out.len();
        out.extend(remainders.iter().take(missing).map(|(_, d)| *d));
        out
    }
}

/// One multiple-choice question. Immutable once supplied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub subject: String,
    pub topic: String,
}

/// Source of battle questions. The session only checks that it receives
/// the requested number of records.
pub trait QuestionSupply {
    fn questions(
        &mut self,
        subject: &str,
        topic: &str,
        count: usize,
        mix: &DifficultyMix,
    ) -> Vec<Question>;
}

/// Placeholder question generator used until a real question bank exists.
pub struct PracticeSupply {
    rng: SmallRng,
}

impl PracticeSupply {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl Default for PracticeSupply {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionSupply for PracticeSupply {
    fn questions(
        &mut self,
        subject: &str,
        topic: &str,
        count: usize,
        mix: &DifficultyMix,
    ) -> Vec<Question> {
        let mut difficulties = mix.distribute(count);
        difficulties.shuffle(&mut self.rng);

        difficulties
            .into_iter()
            .enumerate()
            .map(|(i, difficulty)| {
                let n = i + 1;
                Question {
                    id: format!("q{n}"),
                    prompt: format!("{subject} - {topic}: practice question {n}?"),
                    options: ["A", "B", "C", "D"]
                        .iter()
                        .map(|label| format!("Option {label} for question {n}"))
                        .collect(),
                    correct_answer: self.rng.gen_range(0..4),
                    explanation: format!(
                        "Worked explanation for question {n} ({}).",
                        difficulty.as_str()
                    ),
                    difficulty,
                    subject: subject.to_string(),
                    topic: topic.to_string(),
                }
            })
            .collect()
    }
}
