use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::scoring::{Confidence, beast_score};
use crate::engine::timer::{Countdown, Tick};
use crate::error::{BeastError, Result};
use crate::session::question::{Difficulty, DifficultyMix, Question, QuestionSupply};
use crate::session::report::{
    Performance, Report, SessionConfig, SessionStats, SubjectTally, percent,
};

/// Whether a reflection must be written before leaving a missed question.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReflectionPolicy {
    #[default]
    Advisory,
    Required,
}

pub const MAX_TIME_LIMIT_MINUTES: u32 = 180;
pub const MAX_TARGET_QUESTIONS: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattlePlan {
    pub subject: String,
    pub topic: String,
    pub time_limit_minutes: u32,
    pub target_questions: usize,
    pub difficulty_mix: DifficultyMix,
}

impl BattlePlan {
    pub fn validate(&self) -> Result<()> {
        if self.subject.trim().is_empty() || self.topic.trim().is_empty() {
            return Err(BeastError::IncompleteConfiguration(
                "pick a subject and a topic".to_string(),
            ));
        }
        if !(1..=MAX_TARGET_QUESTIONS).contains(&self.target_questions) {
            return Err(BeastError::IncompleteConfiguration(format!(
                "target question count must be between 1 and {MAX_TARGET_QUESTIONS}"
            )));
        }
        if !(1..=MAX_TIME_LIMIT_MINUTES).contains(&self.time_limit_minutes) {
            return Err(BeastError::IncompleteConfiguration(format!(
                "time limit must be between 1 and {MAX_TIME_LIMIT_MINUTES} minutes"
            )));
        }
        Ok(())
    }
}

/// One committed answer. Only `confidence_after` and `reflection` may be
/// filled in after submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub selected: usize,
    pub confidence_before: Confidence,
    pub confidence_after: Option<Confidence>,
    pub elapsed_secs: u32,
    pub is_correct: bool,
    pub reflection: Option<String>,
    pub points: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Planning,
    Active,
    Finalized,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub correct_option: usize,
    pub points: u32,
    pub streak: u32,
}

/// Where the battle goes after the review of an answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Progress {
    Next(usize),
    Finished(BattleTotals),
}

/// Totals fixed at finalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BattleTotals {
    pub total_time_secs: u32,
    pub correct_count: usize,
    pub answered: usize,
    pub accuracy: u32,
    pub score: u32,
    pub best_streak: u32,
    pub timed_out: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mastery {
    Excellent,
    Good,
    Developing,
}

impl Mastery {
    pub fn from_accuracy(accuracy: u32) -> Self {
        match accuracy {
            80.. => Mastery::Excellent,
            60.. => Mastery::Good,
            _ => Mastery::Developing,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mastery::Excellent => "excellent",
            Mastery::Good => "good",
            Mastery::Developing => "developing",
        }
    }
}

/// Post-battle reflection numbers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleReflection {
    pub totals: BattleTotals,
    pub mastery: Mastery,
    /// Percentage of answers where high confidence matched correctness.
    pub calibration: u32,
    pub missed: usize,
    pub unreflected_misses: usize,
}

/// Revision sheet built from a finished battle.
#[derive(Debug)]
pub struct Arsenal<'a> {
    pub wrong: Vec<(&'a Question, &'a Answer)>,
    pub hard_questions: Vec<&'a Question>,
    pub overreach: Vec<(&'a Question, &'a Answer)>,
}

/// One Attack run: questions, answers, streak and score, driven by a
/// countdown that pauses while an answer is being reviewed.
#[derive(Clone, Debug)]
pub struct BattleSession {
    plan: BattlePlan,
    policy: ReflectionPolicy,
    state: SessionState,
    questions: Vec<Question>,
    answers: Vec<Answer>,
    streak: u32,
    best_streak: u32,
    score: u32,
    timer: Countdown,
    pending_confidence: Option<Confidence>,
    reviewing: bool,
    presented_at_remaining: u32,
    started_at: Option<DateTime<Utc>>,
    totals: Option<BattleTotals>,
}

impl BattleSession {
    pub fn new(plan: BattlePlan, policy: ReflectionPolicy) -> Self {
        Self {
            plan,
            policy,
            state: SessionState::Planning,
            questions: Vec::new(),
            answers: Vec::new(),
            streak: 0,
            best_streak: 0,
            score: 0,
            timer: Countdown::default(),
            pending_confidence: None,
            reviewing: false,
            presented_at_remaining: 0,
            started_at: None,
            totals: None,
        }
    }

    /// Validate the plan, pull questions from `supply`, and start.
    pub fn start_with(
        &mut self,
        supply: &mut dyn QuestionSupply,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.plan.validate()?;
        let questions = supply.questions(
            &self.plan.subject,
            &self.plan.topic,
            self.plan.target_questions,
            &self.plan.difficulty_mix,
        );
        self.start(questions, now)
    }

    pub fn start(&mut self, questions: Vec<Question>, now: DateTime<Utc>) -> Result<()> {
        if self.state != SessionState::Planning {
            return Err(BeastError::NotActive("the battle has already started"));
        }
        self.plan.validate()?;
        if questions.len() != self.plan.target_questions {
            return Err(BeastError::IncompleteConfiguration(format!(
                "expected {} questions, got {}",
                self.plan.target_questions,
                questions.len()
            )));
        }

        self.questions = questions;
        self.timer.start(self.plan.time_limit_minutes * 60);
        self.presented_at_remaining = self.timer.remaining();
        self.started_at = Some(now);
        self.state = SessionState::Active;
        debug!(
            subject = %self.plan.subject,
            topic = %self.plan.topic,
            questions = self.questions.len(),
            "battle started"
        );
        Ok(())
    }

    pub fn rate_confidence(&mut self, value: u8) -> Result<Confidence> {
        self.require_answering()?;
        let confidence = Confidence::new(value)?;
        self.pending_confidence = Some(confidence);
        Ok(confidence)
    }

    /// Commit an answer for question `index`. Requires a prior confidence
    /// rating and `index` equal to current progress.
    pub fn submit_answer(&mut self, index: usize, selected: usize) -> Result<AnswerOutcome> {
        self.require_answering()?;
        let expected = self.answers.len();
        if index != expected {
            return Err(BeastError::OutOfOrder {
                expected,
                got: index,
            });
        }
        let confidence = self
            .pending_confidence
            .ok_or(BeastError::MissingConfidence)?;
        let question = &self.questions[index];
        if selected >= question.options.len() {
            return Err(BeastError::InvalidOption {
                selected,
                available: question.options.len(),
            });
        }

        let is_correct = selected == question.correct_answer;
        self.streak = if is_correct { self.streak + 1 } else { 0 };
        self.best_streak = self.best_streak.max(self.streak);
        let points = beast_score(is_correct, confidence, question.difficulty, self.streak);
        self.score += points;

        self.answers.push(Answer {
            question_id: question.id.clone(),
            selected,
            confidence_before: confidence,
            confidence_after: None,
            elapsed_secs: self.presented_at_remaining - self.timer.remaining(),
            is_correct,
            reflection: None,
            points,
        });
        let correct_option = question.correct_answer;

        self.pending_confidence = None;
        self.reviewing = true;
        self.timer.pause();

        Ok(AnswerOutcome {
            is_correct,
            correct_option,
            points,
            streak: self.streak,
        })
    }

    pub fn rate_confidence_after(&mut self, index: usize, value: u8) -> Result<()> {
        let confidence = Confidence::new(value)?;
        self.answer_mut(index)?.confidence_after = Some(confidence);
        Ok(())
    }

    /// Record why an answer went the way it did. Only while the battle
    /// runs; the report is built from the finalized answers.
    pub fn reflect(&mut self, index: usize, text: &str) -> Result<()> {
        if self.state != SessionState::Active {
            return Err(BeastError::NotActive("the battle is not running"));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(BeastError::IncompleteConfiguration(
                "a reflection needs some text".to_string(),
            ));
        }
        self.answer_mut(index)?.reflection = Some(text.to_string());
        Ok(())
    }

    /// Leave the review of the last answer. Finalizes once every question
    /// has been answered.
    pub fn next_question(&mut self) -> Result<Progress> {
        if self.state != SessionState::Active {
            return Err(BeastError::NotActive("the battle is not running"));
        }
        if !self.reviewing {
            return Err(BeastError::NotActive("no answer is being reviewed"));
        }
        if self.policy == ReflectionPolicy::Required
            && let Some(last) = self.answers.last()
            && !last.is_correct
            && last.reflection.is_none()
        {
            return Err(BeastError::ReflectionRequired);
        }

        self.reviewing = false;
        if self.answers.len() >= self.questions.len() {
            return self.finalize().map(Progress::Finished);
        }
        self.timer.resume();
        self.presented_at_remaining = self.timer.remaining();
        Ok(Progress::Next(self.answers.len()))
    }

    /// Advance the countdown by one second. Returns the totals on the tick
    /// that expires the battle, `None` otherwise.
    pub fn tick(&mut self) -> Option<BattleTotals> {
        if self.state != SessionState::Active {
            return None;
        }
        match self.timer.tick() {
            Tick::Expired => {
                debug!("battle timer expired");
                self.finalize().ok()
            }
            Tick::Running(_) | Tick::Idle => None,
        }
    }

    /// Fix the totals. Calling this again returns the same values.
    pub fn finalize(&mut self) -> Result<BattleTotals> {
        if let Some(totals) = self.totals {
            return Ok(totals);
        }
        if self.state == SessionState::Planning {
            return Err(BeastError::NotActive("the battle has not started"));
        }

        let timed_out = self.timer.is_expired() && self.answers.len() < self.questions.len();
        self.timer.stop();
        self.reviewing = false;
        self.pending_confidence = None;

        let totals = BattleTotals {
            total_time_secs: self.timer.elapsed(),
            correct_count: self.correct_count(),
            answered: self.answers.len(),
            accuracy: self.accuracy(),
            score: self.score,
            best_streak: self.best_streak,
            timed_out,
        };
        self.totals = Some(totals);
        self.state = SessionState::Finalized;
        debug!(
            correct = totals.correct_count,
            answered = totals.answered,
            score = totals.score,
            "battle finalized"
        );
        Ok(totals)
    }

    pub fn accuracy(&self) -> u32 {
        percent(self.correct_count() as u32, self.answers.len() as u32)
    }

    pub fn correct_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_correct).count()
    }

    pub fn reflection(&self) -> Option<BattleReflection> {
        let totals = self.totals?;
        let calibrated = self
            .answers
            .iter()
            .filter(|a| a.confidence_before.is_high() == a.is_correct)
            .count();
        let missed: Vec<&Answer> = self.answers.iter().filter(|a| !a.is_correct).collect();
        Some(BattleReflection {
            totals,
            mastery: Mastery::from_accuracy(totals.accuracy),
            calibration: percent(calibrated as u32, self.answers.len() as u32),
            missed: missed.len(),
            unreflected_misses: missed.iter().filter(|a| a.reflection.is_none()).count(),
        })
    }

    pub fn arsenal(&self) -> Arsenal<'_> {
        let answered: Vec<(&Question, &Answer)> =
            self.questions.iter().zip(self.answers.iter()).collect();
        Arsenal {
            wrong: answered.iter().copied().filter(|(_, a)| !a.is_correct).collect(),
            hard_questions: self
                .questions
                .iter()
                .filter(|q| q.difficulty == Difficulty::Hard)
                .collect(),
            overreach: answered
                .iter()
                .copied()
                .filter(|(_, a)| !a.is_correct && a.confidence_before.is_high())
                .collect(),
        }
    }

    /// Summarize a finalized battle as a history record.
    pub fn to_report(&self, now: DateTime<Utc>) -> Result<Report> {
        let totals = self
            .totals
            .ok_or(BeastError::NotActive("the battle has not been finalized"))?;

        let mut subjects = BTreeMap::new();
        subjects.insert(
            self.plan.subject.clone(),
            SubjectTally {
                attempted: totals.answered as u32,
                correct: totals.correct_count as u32,
            },
        );
        let reflection = self
            .answers
            .iter()
            .filter_map(|a| a.reflection.as_deref().map(|r| format!("{}: {r}", a.question_id)))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Report::new(
            SessionConfig::Attack(self.plan.clone()),
            SessionStats {
                duration_minutes: totals.total_time_secs / 60,
                accuracy: totals.accuracy,
                ..SessionStats::default()
            },
            Performance::from_subjects(self.questions.len() as u32, subjects, reflection),
            now,
        ))
    }

    fn require_answering(&self) -> Result<()> {
        match self.state {
            SessionState::Planning => Err(BeastError::NotActive("the battle has not started")),
            SessionState::Finalized => Err(BeastError::NotActive("the battle is over")),
            SessionState::Active if self.reviewing => {
                Err(BeastError::NotActive("reviewing the previous answer"))
            }
            SessionState::Active => Ok(()),
        }
    }

    fn answer_mut(&mut self, index: usize) -> Result<&mut Answer> {
        let expected = self.answers.len();
        self.answers.get_mut(index).ok_or(BeastError::OutOfOrder {
            expected,
            got: index,
        })
    }

    pub fn plan(&self) -> &BattlePlan {
        &self.plan
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn remaining_secs(&self) -> u32 {
        self.timer.remaining()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn is_reviewing(&self) -> bool {
        self.reviewing
    }

    /// Index of the question on screen (the reviewed one while reviewing).
    pub fn current_index(&self) -> usize {
        if self.reviewing {
            self.answers.len() - 1
        } else {
            self.answers.len()
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::Active => self.questions.get(self.current_index()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::question::PracticeSupply;

    fn plan(count: usize) -> BattlePlan {
        BattlePlan {
            subject: "Physics".to_string(),
            topic: "Optics".to_string(),
            time_limit_minutes: 1,
            target_questions: count,
            difficulty_mix: DifficultyMix::default(),
        }
    }

    fn question(n: usize, correct: usize, difficulty: Difficulty) -> Question {
        Question {
            id: format!("q{n}"),
            prompt: format!("Question {n}"),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: correct,
            explanation: String::new(),
            difficulty,
            subject: "Physics".to_string(),
            topic: "Optics".to_string(),
        }
    }

    /// Battle whose correct option is always 0.
    fn started(count: usize) -> BattleSession {
        let mut session = BattleSession::new(plan(count), ReflectionPolicy::Advisory);
        let questions = (1..=count).map(|n| question(n, 0, Difficulty::Medium)).collect();
        session.start(questions, Utc::now()).unwrap();
        session
    }

    fn answer(session: &mut BattleSession, correct: bool) -> AnswerOutcome {
        let index = session.current_index();
        session.rate_confidence(3).unwrap();
        let outcome = session
            .submit_answer(index, if correct { 0 } else { 1 })
            .unwrap();
        if index + 1 < session.questions().len() {
            session.next_question().unwrap();
        }
        outcome
    }

    #[test]
    fn test_start_requires_subject_and_topic() {
        let mut p = plan(2);
        p.topic = "  ".to_string();
        let mut session = BattleSession::new(p, ReflectionPolicy::Advisory);
        let err = session
            .start_with(&mut PracticeSupply::with_seed(1), Utc::now())
            .unwrap_err();
        assert!(matches!(err, BeastError::IncompleteConfiguration(_)));
        assert_eq!(session.state(), SessionState::Planning);
    }

    #[test]
    fn test_start_requires_target_question_count() {
        let mut session = BattleSession::new(plan(3), ReflectionPolicy::Advisory);
        let err = session
            .start(vec![question(1, 0, Difficulty::Easy)], Utc::now())
            .unwrap_err();
        assert!(matches!(err, BeastError::IncompleteConfiguration(_)));
        assert!(session.questions().is_empty());
    }

    #[test]
    fn test_start_with_supply() {
        let mut session = BattleSession::new(plan(5), ReflectionPolicy::Advisory);
        session
            .start_with(&mut PracticeSupply::with_seed(3), Utc::now())
            .unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.questions().len(), 5);
        assert_eq!(session.remaining_secs(), 60);
    }

    #[test]
    fn test_submit_without_confidence_is_rejected() {
        let mut session = started(3);
        let err = session.submit_answer(0, 0).unwrap_err();
        assert_eq!(err, BeastError::MissingConfidence);
        assert!(session.answers().is_empty());
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn test_confidence_is_consumed_by_each_answer() {
        let mut session = started(3);
        answer(&mut session, true);
        assert_eq!(
            session.submit_answer(1, 0).unwrap_err(),
            BeastError::MissingConfidence
        );
        assert_eq!(session.answers().len(), 1);
    }

    #[test]
    fn test_out_of_order_and_duplicate_submission() {
        let mut session = started(3);
        session.rate_confidence(4).unwrap();
        assert_eq!(
            session.submit_answer(2, 0).unwrap_err(),
            BeastError::OutOfOrder { expected: 0, got: 2 }
        );
        session.submit_answer(0, 0).unwrap();
        assert!(session.submit_answer(0, 0).is_err());
        assert_eq!(session.answers().len(), 1);
    }

    #[test]
    fn test_invalid_option_keeps_confidence() {
        let mut session = started(2);
        session.rate_confidence(2).unwrap();
        assert_eq!(
            session.submit_answer(0, 4).unwrap_err(),
            BeastError::InvalidOption {
                selected: 4,
                available: 4
            }
        );
        assert!(session.submit_answer(0, 0).is_ok());
    }

    #[test]
    fn test_streak_increments_and_resets() {
        let mut session = started(6);
        assert_eq!(answer(&mut session, true).streak, 1);
        assert_eq!(answer(&mut session, true).streak, 2);
        assert_eq!(answer(&mut session, true).streak, 3);
        assert_eq!(answer(&mut session, false).streak, 0);
        assert_eq!(session.streak(), 0);
        assert_eq!(answer(&mut session, true).streak, 1);
        assert_eq!(session.best_streak, 3);
    }

    #[test]
    fn test_score_uses_streak_including_current_answer() {
        let mut session = started(2);
        // medium (2) + confidence 3 + streak 1 * 0.5
        assert_eq!(answer(&mut session, true).points, 55);
        assert_eq!(answer(&mut session, true).points, 60);
        assert_eq!(session.score(), 115);
    }

    #[test]
    fn test_accuracy_without_answers_is_zero() {
        let session = started(4);
        assert_eq!(session.accuracy(), 0);
        let planning = BattleSession::new(plan(4), ReflectionPolicy::Advisory);
        assert_eq!(planning.accuracy(), 0);
    }

    #[test]
    fn test_last_answer_finalizes_on_next() {
        let mut session = started(2);
        answer(&mut session, true);
        answer(&mut session, false);
        let progress = session.next_question().unwrap();
        let Progress::Finished(totals) = progress else {
            panic!("expected finished battle");
        };
        assert_eq!(totals.correct_count, 1);
        assert_eq!(totals.answered, 2);
        assert_eq!(totals.accuracy, 50);
        assert!(!totals.timed_out);
        assert_eq!(session.state(), SessionState::Finalized);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut session = started(3);
        answer(&mut session, true);
        session.tick();
        session.tick();
        let first = session.finalize().unwrap();
        for _ in 0..5 {
            session.tick();
        }
        let second = session.finalize().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.total_time_secs, second.total_time_secs);
        assert_eq!(first.correct_count, second.correct_count);
    }

    #[test]
    fn test_finalize_before_start_fails() {
        let mut session = BattleSession::new(plan(2), ReflectionPolicy::Advisory);
        assert!(session.finalize().is_err());
    }

    #[test]
    fn test_timer_expiry_finalizes_once() {
        let mut session = started(3);
        answer(&mut session, true);
        let mut fired = 0;
        let mut last = None;
        for _ in 0..120 {
            if let Some(totals) = session.tick() {
                fired += 1;
                last = Some(totals);
            }
        }
        assert_eq!(fired, 1);
        let totals = last.unwrap();
        assert!(totals.timed_out);
        assert_eq!(totals.total_time_secs, 60);
        assert_eq!(totals.answered, 1);
        assert_eq!(session.state(), SessionState::Finalized);
        assert!(session.rate_confidence(3).is_err());
    }

    #[test]
    fn test_timer_pauses_during_review() {
        let mut session = started(2);
        session.tick();
        session.tick();
        session.rate_confidence(3).unwrap();
        session.submit_answer(0, 0).unwrap();
        assert_eq!(session.answers()[0].elapsed_secs, 2);
        let before = session.remaining_secs();
        session.tick();
        assert_eq!(session.remaining_secs(), before);
        session.next_question().unwrap();
        session.tick();
        session.rate_confidence(3).unwrap();
        session.submit_answer(1, 0).unwrap();
        assert_eq!(session.answers()[1].elapsed_secs, 1);
    }

    #[test]
    fn test_required_reflection_blocks_next() {
        let mut session = BattleSession::new(plan(2), ReflectionPolicy::Required);
        let questions = vec![
            question(1, 0, Difficulty::Easy),
            question(2, 0, Difficulty::Easy),
        ];
        session.start(questions, Utc::now()).unwrap();
        session.rate_confidence(5).unwrap();
        session.submit_answer(0, 3).unwrap();
        assert_eq!(
            session.next_question().unwrap_err(),
            BeastError::ReflectionRequired
        );
        session.reflect(0, "misread the sign convention").unwrap();
        assert_eq!(session.next_question().unwrap(), Progress::Next(1));
    }

    #[test]
    fn test_confidence_after_is_only_late_mutation() {
        let mut session = started(2);
        answer(&mut session, false);
        session.rate_confidence_after(0, 2).unwrap();
        session.reflect(0, "guessed").unwrap();
        let a = &session.answers()[0];
        assert_eq!(a.confidence_after.map(|c| c.value()), Some(2));
        assert_eq!(a.reflection.as_deref(), Some("guessed"));
        assert!(session.rate_confidence_after(5, 2).is_err());
    }

    #[test]
    fn test_reflection_and_arsenal() {
        let mut session = BattleSession::new(plan(3), ReflectionPolicy::Advisory);
        let questions = vec![
            question(1, 0, Difficulty::Hard),
            question(2, 0, Difficulty::Easy),
            question(3, 0, Difficulty::Hard),
        ];
        session.start(questions, Utc::now()).unwrap();

        session.rate_confidence(5).unwrap();
        session.submit_answer(0, 0).unwrap();
        session.next_question().unwrap();
        session.rate_confidence(5).unwrap();
        session.submit_answer(1, 2).unwrap();
        session.next_question().unwrap();
        session.rate_confidence(1).unwrap();
        session.submit_answer(2, 2).unwrap();
        session.next_question().unwrap();

        let reflection = session.reflection().unwrap();
        assert_eq!(reflection.totals.accuracy, 33);
        assert_eq!(reflection.mastery, Mastery::Developing);
        // q1 sure+right, q2 sure+wrong, q3 unsure+wrong
        assert_eq!(reflection.calibration, 67);
        assert_eq!(reflection.missed, 2);
        assert_eq!(reflection.unreflected_misses, 2);

        let arsenal = session.arsenal();
        assert_eq!(arsenal.wrong.len(), 2);
        assert_eq!(arsenal.hard_questions.len(), 2);
        assert_eq!(arsenal.overreach.len(), 1);
        assert_eq!(arsenal.overreach[0].0.id, "q2");
    }

    #[test]
    fn test_to_report_requires_finalized() {
        let mut session = started(1);
        assert!(session.to_report(Utc::now()).is_err());
        answer(&mut session, true);
        session.reflect(0, "solid").unwrap();
        session.next_question().unwrap();
        let report = session.to_report(Utc::now()).unwrap();
        assert_eq!(report.session_stats.accuracy, 100);
        assert_eq!(report.performance.attempted, 1);
        assert_eq!(report.performance.subjects["Physics"].correct, 1);
        assert_eq!(report.performance.reflection, "q1: solid");
        assert_eq!(report.config.mode(), "attack");
    }

    #[test]
    fn test_plan_rejects_out_of_range_limits() {
        let mut long = plan(2);
        long.time_limit_minutes = 100_000_000;
        let mut session = BattleSession::new(long, ReflectionPolicy::Advisory);
        let err = session
            .start_with(&mut PracticeSupply::with_seed(3), Utc::now())
            .unwrap_err();
        assert!(matches!(err, BeastError::IncompleteConfiguration(_)));
        assert_eq!(session.state(), SessionState::Planning);

        let mut many = plan(MAX_TARGET_QUESTIONS + 1);
        many.time_limit_minutes = MAX_TIME_LIMIT_MINUTES;
        assert!(many.validate().is_err());
        many.target_questions = MAX_TARGET_QUESTIONS;
        assert!(many.validate().is_ok());
    }

    #[test]
    fn test_reflect_rejects_blank_and_finalized() {
        let mut session = started(2);
        answer(&mut session, false);
        session.reflect(0, "rushed").unwrap();
        assert!(matches!(
            session.reflect(0, "   "),
            Err(BeastError::IncompleteConfiguration(_))
        ));
        assert_eq!(session.answers()[0].reflection.as_deref(), Some("rushed"));

        session.finalize().unwrap();
        assert!(matches!(
            session.reflect(0, "rewritten"),
            Err(BeastError::NotActive(_))
        ));
        assert_eq!(session.answers()[0].reflection.as_deref(), Some("rushed"));
    }

    #[test]
    fn test_mastery_bands() {
        assert_eq!(Mastery::from_accuracy(80), Mastery::Excellent);
        assert_eq!(Mastery::from_accuracy(79), Mastery::Good);
        assert_eq!(Mastery::from_accuracy(60), Mastery::Good);
        assert_eq!(Mastery::from_accuracy(0), Mastery::Developing);
    }
}
