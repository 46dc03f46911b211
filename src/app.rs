use chrono::Utc;
use tracing::warn;

use crate::config::Config;
use crate::engine::sequencer::{AttackStep, DefenseStep, Sequencer, Step, WarScreen};
use crate::engine::timer::format_clock;
use crate::error::{BeastError, Result};
use crate::session::battle::{BattlePlan, BattleSession, Progress};
use crate::session::defense::{DefensePlan, DefenseSession, TopicStatus};
use crate::session::question::QuestionSupply;
use crate::session::war::{ReportCard, TestType, WarConfig, WarPhase, WarSession};
use crate::store::report_store::ReportStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Attack,
    Defense,
    War,
}

struct AttackFlow {
    steps: Sequencer<AttackStep>,
    plan: BattlePlan,
    battle: Option<BattleSession>,
    /// Set once the running battle's report is in the store.
    reported: bool,
}

struct DefenseFlow {
    steps: Sequencer<DefenseStep>,
    session: DefenseSession,
}

struct WarFlow {
    steps: Sequencer<WarScreen>,
    draft: WarConfig,
    war: WarSession,
    card: ReportCard,
}

enum Flow {
    Attack(AttackFlow),
    Defense(DefenseFlow),
    War(WarFlow),
}

/// Owns the store and the running flow. Every input line and every clock
/// tick goes through `&mut self`, one at a time.
pub struct App {
    pub config: Config,
    pub store: ReportStore,
    pub should_quit: bool,
    flow: Flow,
    supply: Box<dyn QuestionSupply>,
}

type Lines = Vec<String>;

impl App {
    pub fn new(
        config: Config,
        store: ReportStore,
        mode: Mode,
        supply: Box<dyn QuestionSupply>,
    ) -> Self {
        let flow = match mode {
            Mode::Attack => Flow::Attack(AttackFlow {
                steps: Sequencer::new(),
                plan: config.battle_plan(),
                battle: None,
                reported: false,
            }),
            Mode::Defense => Flow::Defense(DefenseFlow {
                steps: Sequencer::new(),
                session: DefenseSession::new(),
            }),
            Mode::War => {
                let war = store.war_session();
                let mut steps = Sequencer::new();
                // Pick up a war interrupted by a restart where it left off.
                let resume_at = match war.phase() {
                    WarPhase::Active | WarPhase::Paused => Some(WarScreen::Battle),
                    WarPhase::Completed => Some(WarScreen::ReportCard),
                    WarPhase::Config => None,
                };
                if let Some(screen) = resume_at
                    && let Err(e) = steps.go_to(screen)
                {
                    warn!("could not resume war screen: {e}");
                }
                let draft = war.config().cloned().unwrap_or(WarConfig {
                    student_id: String::new(),
                    test_type: TestType::FullLength,
                    duration_minutes: config.war_duration_minutes,
                });
                Flow::War(WarFlow {
                    steps,
                    draft,
                    war,
                    card: ReportCard::default(),
                })
            }
        };
        Self {
            config,
            store,
            should_quit: false,
            flow,
            supply,
        }
    }

    /// Text for the screen the flow is currently on.
    pub fn screen(&self) -> Lines {
        match &self.flow {
            Flow::Attack(f) => attack_screen(f),
            Flow::Defense(f) => defense_screen(f),
            Flow::War(f) => war_screen(f),
        }
    }

    pub fn current_step(&self) -> &'static str {
        match &self.flow {
            Flow::Attack(f) => f.steps.current().as_str(),
            Flow::Defense(f) => f.steps.current().as_str(),
            Flow::War(f) => f.steps.current().as_str(),
        }
    }

    pub fn handle_line(&mut self, line: &str) -> Lines {
        let line = line.trim();
        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd.to_ascii_lowercase(), rest.trim()),
            None => (line.to_ascii_lowercase(), ""),
        };

        match cmd.as_str() {
            "quit" | "q" => {
                self.shutdown();
                self.should_quit = true;
                return vec!["Leaving the battlefield.".to_string()];
            }
            "help" | "?" => return self.screen(),
            "goto" => {
                return match self.jump(rest) {
                    Ok(mut lines) => {
                        lines.extend(self.screen());
                        lines
                    }
                    Err(e) => vec![e.to_string()],
                };
            }
            _ => {}
        }

        let result = match &mut self.flow {
            Flow::Attack(f) => attack_command(f, &cmd, rest, &self.config, &mut *self.supply, &mut self.store),
            Flow::Defense(f) => defense_command(f, &cmd, rest),
            Flow::War(f) => war_command(f, &cmd, rest, &mut self.store),
        };
        match result {
            Ok(lines) => lines,
            Err(e) => vec![e.to_string()],
        }
    }

    /// One second of wall time.
    pub fn tick(&mut self) -> Lines {
        match &mut self.flow {
            Flow::Attack(f) => {
                if f.steps.current() != AttackStep::Battle {
                    return Vec::new();
                }
                let expired = f.battle.as_mut().and_then(|b| b.tick()).is_some();
                if !expired {
                    return Vec::new();
                }
                let mut lines = vec!["Time's up! The battle is over.".to_string()];
                lines.extend(finish_battle(f, &mut self.store));
                lines
            }
            Flow::Defense(f) => {
                f.session.tick();
                Vec::new()
            }
            Flow::War(f) => {
                if f.steps.current() != WarScreen::Battle {
                    return Vec::new();
                }
                if f.war.tick() {
                    let mut lines = vec!["Time's up! Pens down.".to_string()];
                    lines.extend(save_war(&f.war, &mut self.store));
                    f.steps.advance();
                    lines.extend(war_screen(f));
                    return lines;
                }
                if f.war.phase() != WarPhase::Active {
                    return Vec::new();
                }
                // Keep the stored clock current so a crash loses at most a second.
                if let Err(e) = self.store.save_war_session(&f.war) {
                    warn!("could not save war clock: {e}");
                }
                let left = f.war.time_left();
                if left > 0 && left % 300 == 0 {
                    return vec![format!("{} left", format_clock(left))];
                }
                Vec::new()
            }
        }
    }

    /// Persist whatever live state must survive a restart.
    pub fn shutdown(&mut self) {
        if let Flow::War(f) = &self.flow
            && let Err(e) = self.store.save_war_session(&f.war)
        {
            warn!("could not save war state on exit: {e}");
        }
    }

    fn jump(&mut self, name: &str) -> Result<Lines> {
        match &mut self.flow {
            Flow::Attack(f) => {
                jump_back(&mut f.steps, name, AttackStep::Plan)?;
                f.battle = None;
                f.reported = false;
                Ok(Vec::new())
            }
            Flow::Defense(f) => {
                jump_back(&mut f.steps, name, DefenseStep::Study)?;
                f.session.start_study()?;
                Ok(Vec::new())
            }
            Flow::War(f) => {
                jump_back(&mut f.steps, name, WarScreen::Config)?;
                f.war.reset();
                f.card = ReportCard::default();
                Ok(save_war(&f.war, &mut self.store))
            }
        }
    }
}

/// Jump from a flow's final screen back to its one re-entry point.
fn jump_back<S: Step>(steps: &mut Sequencer<S>, name: &str, allowed: S) -> Result<S> {
    let mut next = steps.clone();
    let target = next.go_to_name(name)?;
    if !steps.is_terminal() {
        return Err(BeastError::NotActive("away from the final screen"));
    }
    if target != allowed {
        return Err(BeastError::InvalidStep {
            flow: S::FLOW,
            step: target.as_str().to_string(),
        });
    }
    *steps = next;
    Ok(target)
}

fn parse_number<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
    text.trim()
        .parse()
        .map_err(|_| BeastError::IncompleteConfiguration(format!("{what} must be a number")))
}

fn unknown(cmd: &str) -> Result<Lines> {
    Ok(vec![format!("Unknown command '{cmd}'. Type 'help' for options.")])
}

// --- Attack ---------------------------------------------------------------

fn attack_command(
    f: &mut AttackFlow,
    cmd: &str,
    rest: &str,
    config: &Config,
    supply: &mut dyn QuestionSupply,
    store: &mut ReportStore,
) -> Result<Lines> {
    match (f.steps.current(), cmd) {
        (AttackStep::Welcome, "next" | "") => {
            f.steps.advance();
            Ok(attack_screen(f))
        }
        (AttackStep::Plan, "subject") => {
            f.plan.subject = rest.to_string();
            Ok(vec![format!("Subject: {rest}")])
        }
        (AttackStep::Plan, "topic") => {
            f.plan.topic = rest.to_string();
            Ok(vec![format!("Topic: {rest}")])
        }
        (AttackStep::Plan, "minutes") => {
            f.plan.time_limit_minutes = parse_number(rest, "minutes")?;
            Ok(vec![format!("Time limit: {} min", f.plan.time_limit_minutes)])
        }
        (AttackStep::Plan, "questions") => {
            f.plan.target_questions = parse_number(rest, "questions")?;
            Ok(vec![format!("Questions: {}", f.plan.target_questions)])
        }
        (AttackStep::Plan, "start") => {
            let mut battle = BattleSession::new(f.plan.clone(), config.reflection_policy);
            battle.start_with(supply, Utc::now())?;
            f.battle = Some(battle);
            f.reported = false;
            f.steps.advance();
            Ok(attack_screen(f))
        }
        (AttackStep::Battle, _) => battle_command(f, cmd, rest, store),
        (AttackStep::Reflect, "next" | "") => {
            f.steps.advance();
            Ok(attack_screen(f))
        }
        _ => unknown(cmd),
    }
}

fn battle_command(
    f: &mut AttackFlow,
    cmd: &str,
    rest: &str,
    store: &mut ReportStore,
) -> Result<Lines> {
    let battle = f
        .battle
        .as_mut()
        .ok_or(BeastError::NotActive("no battle is running"))?;
    match cmd {
        "c" | "confidence" => {
            let c = battle.rate_confidence(parse_number(rest, "confidence")?)?;
            Ok(vec![format!("Confidence locked at {}/5.", c.value())])
        }
        "a" | "answer" => {
            let choice: usize = parse_number(rest, "answer")?;
            let index = battle.current_index();
            // Options are numbered from 1 on screen.
            let selected = choice.checked_sub(1).ok_or(BeastError::InvalidOption {
                selected: choice,
                available: battle.current_question().map_or(0, |q| q.options.len()),
            })?;
            let outcome = battle.submit_answer(index, selected)?;
            let question = &battle.questions()[index];
            let mut lines = if outcome.is_correct {
                vec![format!(
                    "Correct! +{} points, streak {}.",
                    outcome.points, outcome.streak
                )]
            } else {
                vec![format!(
                    "Wrong. The answer was {}. Streak reset.",
                    outcome.correct_option + 1
                )]
            };
            lines.push(question.explanation.clone());
            if !outcome.is_correct {
                lines.push("Why were you wrong? Record it with 'why <text>'.".to_string());
            }
            lines.push("Rate confidence again with 'after 1-5', then 'next'.".to_string());
            Ok(lines)
        }
        "after" => {
            let index = battle.current_index();
            battle.rate_confidence_after(index, parse_number(rest, "confidence")?)?;
            Ok(vec!["Noted.".to_string()])
        }
        "why" => {
            let index = battle.current_index();
            battle.reflect(index, rest)?;
            Ok(vec!["Reflection saved.".to_string()])
        }
        "next" | "n" => match battle.next_question()? {
            Progress::Next(_) => Ok(attack_screen(f)),
            Progress::Finished(_) => Ok(finish_battle(f, store)),
        },
        "end" => {
            battle.finalize()?;
            Ok(finish_battle(f, store))
        }
        _ => unknown(cmd),
    }
}

/// Record the finalized battle and move on to the reflection screen.
fn finish_battle(f: &mut AttackFlow, store: &mut ReportStore) -> Lines {
    let mut lines = Vec::new();
    if let Some(battle) = &f.battle
        && !f.reported
    {
        match battle.to_report(Utc::now()) {
            Ok(report) => {
                f.reported = true;
                if let Err(e) = store.append(report) {
                    lines.push(format!("warning: {e}"));
                }
            }
            Err(e) => lines.push(e.to_string()),
        }
    }
    f.steps.advance();
    lines.extend(attack_screen(f));
    lines
}

fn attack_screen(f: &AttackFlow) -> Lines {
    let (pos, total) = f.steps.position();
    let mut lines = vec![format!("[attack {pos}/{total}: {}]", f.steps.current().as_str())];
    match f.steps.current() {
        AttackStep::Welcome => {
            lines.push("ATTACK MODE: timed MCQ battle.".to_string());
            lines.push("Rate your confidence before every answer. Press enter to plan.".to_string());
        }
        AttackStep::Plan => {
            let p = &f.plan;
            lines.push(format!(
                "subject: {}  topic: {}  minutes: {}  questions: {}",
                or_dash(&p.subject),
                or_dash(&p.topic),
                p.time_limit_minutes,
                p.target_questions
            ));
            lines.push("Set with 'subject <s>', 'topic <t>', 'minutes <n>', 'questions <n>', then 'start'.".to_string());
        }
        AttackStep::Battle => {
            if let Some(b) = &f.battle
                && let Some(q) = b.current_question()
            {
                lines.push(format!(
                    "Question {}/{} [{}]  time {}  streak {}  score {}",
                    b.current_index() + 1,
                    b.questions().len(),
                    q.difficulty.as_str(),
                    format_clock(b.remaining_secs()),
                    b.streak(),
                    b.score()
                ));
                lines.push(q.prompt.clone());
                for (i, option) in q.options.iter().enumerate() {
                    lines.push(format!("  {}) {option}", i + 1));
                }
                if b.is_reviewing() {
                    lines.push("'after <1-5>', 'why <text>', then 'next'.".to_string());
                } else {
                    lines.push("'c <1-5>' to rate confidence, 'a <n>' to answer.".to_string());
                }
            }
        }
        AttackStep::Reflect => {
            if let Some(r) = f.battle.as_ref().and_then(|b| b.reflection()) {
                let t = r.totals;
                lines.push(format!(
                    "{} of {} correct ({}%), {} mastery.",
                    t.correct_count,
                    t.answered,
                    t.accuracy,
                    r.mastery.as_str()
                ));
                lines.push(format!(
                    "Time {}  score {}  best streak {}  calibration {}%",
                    format_clock(t.total_time_secs),
                    t.score,
                    t.best_streak,
                    r.calibration
                ));
                if t.best_streak >= 3 {
                    lines.push(format!("Beast mode: a {}-question streak!", t.best_streak));
                }
                if r.unreflected_misses > 0 {
                    lines.push(format!("{} missed questions have no reflection yet.", r.unreflected_misses));
                }
            }
            lines.push("Press enter for your arsenal.".to_string());
        }
        AttackStep::Arsenal => {
            if let Some(b) = &f.battle {
                let arsenal = b.arsenal();
                if arsenal.wrong.is_empty() {
                    lines.push("Perfect battle! Nothing to review.".to_string());
                } else {
                    lines.push(format!("{} questions to review:", arsenal.wrong.len()));
                    for (q, a) in &arsenal.wrong {
                        lines.push(format!(
                            "  {} {} (picked {}, answer {})",
                            q.id,
                            q.prompt,
                            a.selected + 1,
                            q.correct_answer + 1
                        ));
                    }
                }
                lines.push(format!("{} hard questions faced.", arsenal.hard_questions.len()));
                for (q, _) in &arsenal.overreach {
                    lines.push(format!("  overconfident on {}", q.id));
                }
            }
            lines.push("'goto plan' for another battle, 'quit' to leave.".to_string());
        }
    }
    lines
}

// --- Defense --------------------------------------------------------------

fn defense_command(f: &mut DefenseFlow, cmd: &str, rest: &str) -> Result<Lines> {
    match (f.steps.current(), cmd) {
        (DefenseStep::Mission, "mission") => {
            f.session.set_mission(parse_mission(rest)?)?;
            Ok(vec!["Mission accepted. 'next' to gather resources.".to_string()])
        }
        (DefenseStep::Mission, "next" | "") => {
            f.session.require_mission()?;
            f.steps.advance();
            Ok(defense_screen(f))
        }
        (DefenseStep::Resources, "add") => {
            f.session.add_resource(rest);
            Ok(vec![format!("{} resources ready.", f.session.log().resources.len())])
        }
        (DefenseStep::Ritual, "next" | "") => {
            f.session.start_study()?;
            f.steps.advance();
            Ok(defense_screen(f))
        }
        (DefenseStep::Study, "pause") => {
            f.session.stop_study();
            Ok(vec!["Study clock paused.".to_string()])
        }
        (DefenseStep::Study, "resume") => {
            f.session.start_study()?;
            Ok(vec!["Study clock running.".to_string()])
        }
        (DefenseStep::Study, "status") => Ok(vec![format!(
            "Studied {} ({}% of target), clock {}.",
            format_clock(f.session.log().study_secs),
            f.session.target_progress(),
            if f.session.is_studying() { "running" } else { "paused" }
        )]),
        (DefenseStep::Study, "next" | "") => {
            f.session.stop_study();
            f.steps.advance();
            Ok(defense_screen(f))
        }
        (DefenseStep::Log, "learned") => {
            f.session.note_learning(rest);
            Ok(vec!["Noted.".to_string()])
        }
        (DefenseStep::Log, "confused") => {
            f.session.note_confusion(rest);
            Ok(vec!["Noted.".to_string()])
        }
        (DefenseStep::Log, "review") => {
            f.session.add_review_item(rest);
            Ok(vec!["Added to review list.".to_string()])
        }
        (DefenseStep::Log, "status") => {
            let status = TopicStatus::from_name(rest).ok_or_else(|| {
                BeastError::IncompleteConfiguration(
                    "status is mastered, needs-revision or confused".to_string(),
                )
            })?;
            f.session.set_topic_status(status);
            Ok(vec![format!("Topic marked {}.", status.as_str())])
        }
        (DefenseStep::Log, "next" | "") => {
            f.session.require_log()?;
            f.steps.advance();
            Ok(defense_screen(f))
        }
        (DefenseStep::Welcome | DefenseStep::Resources, "next" | "") => {
            f.steps.advance();
            Ok(defense_screen(f))
        }
        _ => unknown(cmd),
    }
}

/// `subject; unit; topic; hours; pyq 1-5; energy 0-100`
fn parse_mission(text: &str) -> Result<DefensePlan> {
    let parts: Vec<&str> = text.split(';').map(str::trim).collect();
    if parts.len() != 6 {
        return Err(BeastError::IncompleteConfiguration(
            "mission is 'subject; unit; topic; hours; pyq 1-5; energy 0-100'".to_string(),
        ));
    }
    Ok(DefensePlan {
        subject: parts[0].to_string(),
        unit: parts[1].to_string(),
        topic: parts[2].to_string(),
        target_hours: parse_number(parts[3], "hours")?,
        pyq_relevance: parse_number(parts[4], "PYQ relevance")?,
        energy_level: parse_number(parts[5], "energy level")?,
    })
}

fn defense_screen(f: &DefenseFlow) -> Lines {
    let (pos, total) = f.steps.position();
    let mut lines = vec![format!("[defense {pos}/{total}: {}]", f.steps.current().as_str())];
    match f.steps.current() {
        DefenseStep::Welcome => {
            lines.push("DEFENSE MODE: foundation over speed.".to_string());
            lines.push("Press enter to set your mission.".to_string());
        }
        DefenseStep::Mission => {
            lines.push("'mission subject; unit; topic; hours; pyq 1-5; energy 0-100'".to_string());
        }
        DefenseStep::Resources => {
            lines.push("'add <book, notes, video...>' for each resource, then enter.".to_string());
        }
        DefenseStep::Ritual => {
            lines.push("Phone away. Water nearby. One tab. Breathe.".to_string());
            lines.push("Press enter to start the study clock.".to_string());
        }
        DefenseStep::Study => {
            if let Some(plan) = f.session.plan() {
                lines.push(format!(
                    "Studying {} / {} / {}. Target {}h.",
                    plan.subject, plan.unit, plan.topic, plan.target_hours
                ));
            }
            lines.push("'pause', 'resume', 'status', enter when done.".to_string());
        }
        DefenseStep::Log => {
            lines.push("'learned <text>', 'confused <text>', 'review <item>'.".to_string());
            lines.push("'status mastered|needs-revision|confused', then enter.".to_string());
        }
        DefenseStep::Exit => {
            let log = f.session.log();
            lines.push(format!(
                "Session complete: {} minutes studied, topic {}.",
                f.session.study_minutes(),
                log.topic_status.map_or("-", |s| s.as_str())
            ));
            if !log.review_items.is_empty() {
                lines.push(format!("Review later: {}", log.review_items.join(", ")));
            }
            lines.push("'goto study' to keep defending, 'quit' to leave.".to_string());
        }
    }
    lines
}

// --- War ------------------------------------------------------------------

fn war_command(
    f: &mut WarFlow,
    cmd: &str,
    rest: &str,
    store: &mut ReportStore,
) -> Result<Lines> {
    match (f.steps.current(), cmd) {
        (WarScreen::Config, "student") => {
            f.draft.student_id = rest.to_string();
            Ok(vec![format!("Student: {rest}")])
        }
        (WarScreen::Config, "type") => {
            f.draft.test_type = TestType::from_name(rest).ok_or_else(|| {
                BeastError::IncompleteConfiguration(
                    "type is full-length or subject-wise".to_string(),
                )
            })?;
            Ok(vec![format!("Test type: {}", f.draft.test_type.as_str())])
        }
        (WarScreen::Config, "minutes") => {
            f.draft.duration_minutes = parse_number(rest, "minutes")?;
            Ok(vec![format!("Duration: {} min", f.draft.duration_minutes)])
        }
        (WarScreen::Config, "start") => {
            f.war.set_config(f.draft.clone())?;
            f.war.start(Utc::now())?;
            let mut lines = save_war(&f.war, store);
            f.steps.advance();
            lines.extend(war_screen(f));
            Ok(lines)
        }
        (WarScreen::Battle, "pause") => {
            f.war.pause()?;
            let mut lines = save_war(&f.war, store);
            lines.push("Paused.".to_string());
            Ok(lines)
        }
        (WarScreen::Battle, "resume") => {
            f.war.resume()?;
            let mut lines = save_war(&f.war, store);
            lines.push("Back to war.".to_string());
            Ok(lines)
        }
        (WarScreen::Battle, "status") => Ok(vec![format!(
            "{} left ({})",
            format_clock(f.war.time_left()),
            f.war.phase().as_str()
        )]),
        (WarScreen::Battle, "end") => {
            f.war.end()?;
            let mut lines = save_war(&f.war, store);
            f.steps.advance();
            lines.extend(war_screen(f));
            Ok(lines)
        }
        (WarScreen::ReportCard, "marks") => {
            f.card.total_marks = parse_number(rest, "marks")?;
            Ok(vec![format!("Total marks: {}", f.card.total_marks)])
        }
        (WarScreen::ReportCard, "score") => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let [subject, attempted, correct] = parts[..] else {
                return Err(BeastError::IncompleteConfiguration(
                    "score is 'score <subject> <attempted> <correct>'".to_string(),
                ));
            };
            f.card.record(
                subject,
                parse_number(attempted, "attempted")?,
                parse_number(correct, "correct")?,
            )?;
            Ok(vec![format!("{subject}: {correct}/{attempted}")])
        }
        (WarScreen::ReportCard, "focus") => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let [health, score, switches] = parts[..] else {
                return Err(BeastError::IncompleteConfiguration(
                    "focus is 'focus <health> <score> <tab switches>'".to_string(),
                ));
            };
            f.card.focus_health = parse_number(health, "focus health")?;
            f.card.focus_score = parse_number(score, "focus score")?;
            f.card.tab_switches = parse_number(switches, "tab switches")?;
            Ok(vec!["Focus recorded.".to_string()])
        }
        (WarScreen::ReportCard, "reflect") => {
            f.card.reflection = rest.to_string();
            Ok(vec!["Reflection saved.".to_string()])
        }
        (WarScreen::ReportCard, "save") => {
            let report = f.war.report(&f.card, Utc::now())?;
            let mut lines = Vec::new();
            if let Err(e) = store.append(report) {
                lines.push(format!("warning: {e}"));
            }
            f.war.reset();
            f.card = ReportCard::default();
            lines.extend(save_war(&f.war, store));
            f.steps.advance();
            lines.extend(war_screen(f));
            lines.extend(render_stats(store));
            Ok(lines)
        }
        _ => unknown(cmd),
    }
}

fn save_war(war: &WarSession, store: &mut ReportStore) -> Lines {
    match store.save_war_session(war) {
        Ok(()) => Vec::new(),
        Err(e) => vec![format!("warning: {e}")],
    }
}

fn war_screen(f: &WarFlow) -> Lines {
    let (pos, total) = f.steps.position();
    let mut lines = vec![format!("[war {pos}/{total}: {}]", f.steps.current().as_str())];
    match f.steps.current() {
        WarScreen::Config => {
            lines.push(format!(
                "student: {}  type: {}  minutes: {}",
                or_dash(&f.draft.student_id),
                f.draft.test_type.as_str(),
                f.draft.duration_minutes
            ));
            lines.push("Set with 'student <id>', 'type <t>', 'minutes <n>', then 'start'.".to_string());
        }
        WarScreen::Battle => {
            lines.push(format!(
                "WAR IN PROGRESS: {} left ({}).",
                format_clock(f.war.time_left()),
                f.war.phase().as_str()
            ));
            lines.push("'pause', 'resume', 'status', 'end'.".to_string());
        }
        WarScreen::ReportCard => {
            lines.push(format!("Exam took {} minutes.", f.war.duration_minutes()));
            for (subject, tally) in &f.card.subjects {
                lines.push(format!("  {subject}: {}/{}", tally.correct, tally.attempted));
            }
            lines.push("'marks <n>', 'score <subject> <attempted> <correct>',".to_string());
            lines.push("'focus <health> <score> <tab switches>', 'reflect <text>', then 'save'.".to_string());
        }
        WarScreen::WarReport => {
            lines.push("Report saved. 'goto config' for a new battle, 'quit' to leave.".to_string());
        }
    }
    lines
}

// --- Reports --------------------------------------------------------------

pub fn render_stats(store: &ReportStore) -> Lines {
    let stats = store.aggregate_stats();
    let mut lines = vec![
        format!("Battles:          {}", stats.total_battles),
        format!("Study minutes:    {}", stats.total_study_minutes),
        format!("Average accuracy: {}%", stats.average_accuracy),
        format!("Average session:  {}m", stats.average_session_minutes),
        format!("Current streak:   {} days", stats.current_streak_days),
        format!("Tab switches:     {}", stats.total_tab_switches),
        "Achievements:".to_string(),
    ];
    for (achievement, progress, unlocked) in store.achievements() {
        let state = if unlocked {
            "UNLOCKED".to_string()
        } else {
            format!("{progress}/{}", achievement.target())
        };
        lines.push(format!(
            "  {:<16} {:<28} {state}",
            achievement.name(),
            achievement.description()
        ));
    }
    lines
}

pub fn render_history(store: &ReportStore, limit: usize) -> Lines {
    if store.all().is_empty() {
        return vec!["No battles yet. Your first battle awaits.".to_string()];
    }
    store
        .all()
        .iter()
        .take(limit)
        .map(|r| {
            format!(
                "{}  {:<6} {:>3}%  {:>4}m  {}/{} correct",
                r.date.format("%Y-%m-%d %H:%M"),
                r.config.mode(),
                r.session_stats.accuracy,
                r.session_stats.duration_minutes,
                r.performance.correct,
                r.performance.attempted
            )
        })
        .collect()
}

fn or_dash(s: &str) -> &str {
    if s.trim().is_empty() { "-" } else { s }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::session::question::PracticeSupply;
    use crate::store::json_store::JsonStore;

    fn make_app(mode: Mode) -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::open(JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap());
        let app = App::new(
            Config::default(),
            store,
            mode,
            Box::new(PracticeSupply::with_seed(11)),
        );
        (dir, app)
    }

    fn run(app: &mut App, lines: &[&str]) -> Lines {
        lines.iter().flat_map(|l| app.handle_line(l)).collect()
    }

    #[test]
    fn test_attack_plan_requires_subject_and_topic() {
        let (_dir, mut app) = make_app(Mode::Attack);
        run(&mut app, &["next"]);
        let out = run(&mut app, &["start"]);
        assert!(out[0].contains("Incomplete configuration"));
        assert_eq!(app.current_step(), "plan");
    }

    #[test]
    fn test_attack_full_battle_appends_report() {
        let (_dir, mut app) = make_app(Mode::Attack);
        run(
            &mut app,
            &["", "subject Physics", "topic Optics", "questions 3", "start"],
        );
        assert_eq!(app.current_step(), "battle");

        let out = run(&mut app, &["a 1"]);
        assert!(out[0].contains("Rate your confidence"));

        for _ in 0..3 {
            run(&mut app, &["c 4", "a 2", "why rushed it", "next"]);
        }
        assert_eq!(app.current_step(), "reflect");
        assert_eq!(app.store.all().len(), 1);
        assert_eq!(app.store.all()[0].performance.attempted, 3);

        run(&mut app, &[""]);
        assert_eq!(app.current_step(), "arsenal");
        run(&mut app, &["goto plan"]);
        assert_eq!(app.current_step(), "plan");
    }

    #[test]
    fn test_attack_timeout_finishes_battle() {
        let (_dir, mut app) = make_app(Mode::Attack);
        run(
            &mut app,
            &["", "subject Math", "topic Algebra", "minutes 1", "questions 5", "start"],
        );
        let mut expired = Vec::new();
        for _ in 0..61 {
            expired.extend(app.tick());
        }
        assert!(expired.iter().any(|l| l.contains("Time's up")));
        assert_eq!(app.current_step(), "reflect");
        assert_eq!(app.store.all().len(), 1);
        assert_eq!(app.store.all()[0].session_stats.duration_minutes, 1);
    }

    #[test]
    fn test_goto_rejected_before_final_screen() {
        let (_dir, mut app) = make_app(Mode::Attack);
        run(&mut app, &[""]);
        let out = run(&mut app, &["goto welcome"]);
        assert!(out[0].contains("not allowed"));
        let out = run(&mut app, &["goto nowhere"]);
        assert!(out[0].contains("Unknown step"));
        assert_eq!(app.current_step(), "plan");
    }

    #[test]
    fn test_defense_flow_walkthrough() {
        let (_dir, mut app) = make_app(Mode::Defense);
        run(&mut app, &["", "next"]);
        assert_eq!(app.current_step(), "mission");
        run(&mut app, &["mission Chemistry; Organic; Aldehydes; 2; 4; 80", "next"]);
        run(&mut app, &["add NCERT", "", ""]);
        assert_eq!(app.current_step(), "study");
        for _ in 0..120 {
            app.tick();
        }
        run(&mut app, &["", "learned aldol", "next"]);
        assert_eq!(app.current_step(), "log");
        run(&mut app, &["status mastered", ""]);
        assert_eq!(app.current_step(), "exit");
        let out = run(&mut app, &["help"]);
        assert!(out.iter().any(|l| l.contains("2 minutes studied")));
        run(&mut app, &["goto study"]);
        assert_eq!(app.current_step(), "study");
    }

    #[test]
    fn test_war_flow_saves_report_and_resets() {
        let (dir, mut app) = make_app(Mode::War);
        run(&mut app, &["student S-1", "minutes 2", "start"]);
        assert_eq!(app.current_step(), "battle");
        for _ in 0..70 {
            app.tick();
        }
        run(&mut app, &["pause"]);
        assert_eq!(app.store.snapshot().phase, WarPhase::Paused);
        run(&mut app, &["resume", "end"]);
        assert_eq!(app.current_step(), "report-card");
        run(
            &mut app,
            &["marks 120", "score math 10 8", "score gk 10 6", "reflect steady", "save"],
        );
        assert_eq!(app.current_step(), "war-report");
        let report = &app.store.all()[0];
        assert_eq!(report.session_stats.accuracy, 70);
        assert_eq!(report.session_stats.duration_minutes, 1);
        assert_eq!(app.store.snapshot().phase, WarPhase::Config);

        let reopened = ReportStore::open(JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap());
        assert_eq!(reopened.all(), app.store.all());
    }

    #[test]
    fn test_war_resumes_after_restart() {
        let (dir, mut app) = make_app(Mode::War);
        run(&mut app, &["student S-2", "minutes 5", "start"]);
        for _ in 0..10 {
            app.tick();
        }
        run(&mut app, &["quit"]);
        assert!(app.should_quit);

        let store = ReportStore::open(JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap());
        let app = App::new(
            Config::default(),
            store,
            Mode::War,
            Box::new(PracticeSupply::with_seed(1)),
        );
        assert_eq!(app.current_step(), "battle");
        assert!(app.screen().iter().any(|l| l.contains("4:50")));
    }

    #[test]
    fn test_arsenal_only_returns_to_plan() {
        let (_dir, mut app) = make_app(Mode::Attack);
        run(
            &mut app,
            &["", "subject Bio", "topic Cells", "questions 1", "start", "c 3", "a 1", "next", ""],
        );
        assert_eq!(app.current_step(), "arsenal");
        assert_eq!(app.store.all().len(), 1);

        let out = run(&mut app, &["goto battle"]);
        assert!(out[0].contains("Unknown step 'battle'"));
        run(&mut app, &["end"]);
        assert_eq!(app.current_step(), "arsenal");
        assert_eq!(app.store.all().len(), 1);

        run(&mut app, &["goto plan", "start", "c 3", "a 1", "next"]);
        assert_eq!(app.current_step(), "reflect");
        assert_eq!(app.store.all().len(), 2);
    }

    #[test]
    fn test_defense_exit_only_returns_to_study() {
        let (_dir, mut app) = make_app(Mode::Defense);
        run(
            &mut app,
            &["", "mission Math; Calculus; Limits; 1; 3; 50", "", "", "", "", "status confused", ""],
        );
        assert_eq!(app.current_step(), "exit");
        let out = run(&mut app, &["goto log"]);
        assert!(out[0].contains("Unknown step 'log'"));
        assert_eq!(app.current_step(), "exit");
    }

    #[test]
    fn test_huge_durations_are_rejected() {
        let (_dir, mut app) = make_app(Mode::Attack);
        let out = run(
            &mut app,
            &["", "subject P", "topic O", "minutes 100000000", "start"],
        );
        assert!(out.last().unwrap().contains("Incomplete configuration"));
        assert_eq!(app.current_step(), "plan");
        let out = run(&mut app, &["minutes 30", "questions 5000", "start"]);
        assert!(out.last().unwrap().contains("Incomplete configuration"));
        assert_eq!(app.current_step(), "plan");

        let (_dir, mut app) = make_app(Mode::War);
        let out = run(&mut app, &["student S", "minutes 100000000", "start"]);
        assert!(out.last().unwrap().contains("Incomplete configuration"));
        assert_eq!(app.current_step(), "config");
    }

    #[test]
    fn test_war_clock_survives_unclean_exit() {
        let (dir, mut app) = make_app(Mode::War);
        run(&mut app, &["student S-3", "minutes 5", "start"]);
        for _ in 0..120 {
            app.tick();
        }
        drop(app);

        let store = ReportStore::open(JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap());
        assert_eq!(store.snapshot().time_left, 180);
        assert_eq!(store.snapshot().phase, WarPhase::Active);
        let app = App::new(
            Config::default(),
            store,
            Mode::War,
            Box::new(PracticeSupply::with_seed(1)),
        );
        assert_eq!(app.current_step(), "battle");
        assert!(app.screen().iter().any(|l| l.contains("3:00")));
    }

    #[test]
    fn test_render_history_and_stats() {
        let (_dir, mut app) = make_app(Mode::Attack);
        assert_eq!(render_history(&app.store, 10).len(), 1);
        run(
            &mut app,
            &["", "subject Bio", "topic Cells", "questions 1", "start", "c 3", "a 1", "next"],
        );
        assert_eq!(render_history(&app.store, 10).len(), 1);
        assert!(render_history(&app.store, 10)[0].contains("attack"));
        let stats = render_stats(&app.store);
        assert!(stats.iter().any(|l| l.contains("Battles:          1")));
        assert!(stats.iter().any(|l| l.contains("First Blood") && l.contains("UNLOCKED")));
    }
}
