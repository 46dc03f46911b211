use std::fmt;
use std::marker::PhantomData;

use crate::error::{BeastError, Result};

/// A fixed, ordered list of named screens that one flow walks through.
pub trait Step: Copy + Eq + fmt::Debug + 'static {
    /// Flow name used in error messages.
    const FLOW: &'static str;
    /// Every step of the flow, first to terminal.
    const ORDER: &'static [Self];

    fn as_str(self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ORDER
            .iter()
            .copied()
            .find(|s| s.as_str().eq_ignore_ascii_case(name))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttackStep {
    Welcome,
    Plan,
    Battle,
    Reflect,
    Arsenal,
}

impl Step for AttackStep {
    const FLOW: &'static str = "attack";
    const ORDER: &'static [Self] = &[
        AttackStep::Welcome,
        AttackStep::Plan,
        AttackStep::Battle,
        AttackStep::Reflect,
        AttackStep::Arsenal,
    ];

    fn as_str(self) -> &'static str {
        match self {
            AttackStep::Welcome => "welcome",
            AttackStep::Plan => "plan",
            AttackStep::Battle => "battle",
            AttackStep::Reflect => "reflect",
            AttackStep::Arsenal => "arsenal",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefenseStep {
    Welcome,
    Mission,
    Resources,
    Ritual,
    Study,
    Log,
    Exit,
}

impl Step for DefenseStep {
    const FLOW: &'static str = "defense";
    const ORDER: &'static [Self] = &[
        DefenseStep::Welcome,
        DefenseStep::Mission,
        DefenseStep::Resources,
        DefenseStep::Ritual,
        DefenseStep::Study,
        DefenseStep::Log,
        DefenseStep::Exit,
    ];

    fn as_str(self) -> &'static str {
        match self {
            DefenseStep::Welcome => "welcome",
            DefenseStep::Mission => "mission",
            DefenseStep::Resources => "resources",
            DefenseStep::Ritual => "ritual",
            DefenseStep::Study => "study",
            DefenseStep::Log => "log",
            DefenseStep::Exit => "exit",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WarScreen {
    Config,
    Battle,
    ReportCard,
    WarReport,
}

impl Step for WarScreen {
    const FLOW: &'static str = "war";
    const ORDER: &'static [Self] = &[
        WarScreen::Config,
        WarScreen::Battle,
        WarScreen::ReportCard,
        WarScreen::WarReport,
    ];

    fn as_str(self) -> &'static str {
        match self {
            WarScreen::Config => "config",
            WarScreen::Battle => "battle",
            WarScreen::ReportCard => "report-card",
            WarScreen::WarReport => "war-report",
        }
    }
}

/// Cursor over a flow's step list. Moves forward one step at a time and
/// never past the terminal step; `go_to` is the only way to move backwards.
#[derive(Clone, Debug)]
pub struct Sequencer<S: Step> {
    index: usize,
    _flow: PhantomData<S>,
}

impl<S: Step> Default for Sequencer<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Step> Sequencer<S> {
    pub fn new() -> Self {
        Self {
            index: 0,
            _flow: PhantomData,
        }
    }

    pub fn current(&self) -> S {
        S::ORDER[self.index]
    }

    /// Move to the next step. At the terminal step this is a no-op.
    pub fn advance(&mut self) -> S {
        if !self.is_terminal() {
            self.index += 1;
        }
        self.current()
    }

    pub fn go_to(&mut self, step: S) -> Result<S> {
        match S::ORDER.iter().position(|s| *s == step) {
            Some(index) => {
                self.index = index;
                Ok(step)
            }
            None => Err(BeastError::InvalidStep {
                flow: S::FLOW,
                step: step.as_str().to_string(),
            }),
        }
    }

    /// Jump by name, as typed by the user. Unknown names leave the cursor
    /// where it was.
    pub fn go_to_name(&mut self, name: &str) -> Result<S> {
        let step = S::from_name(name).ok_or_else(|| BeastError::InvalidStep {
            flow: S::FLOW,
            step: name.trim().to_string(),
        })?;
        self.go_to(step)
    }

    pub fn is_terminal(&self) -> bool {
        self.index + 1 >= S::ORDER.len()
    }

    /// 1-based position and total step count, for progress display.
    pub fn position(&self) -> (usize, usize) {
        (self.index + 1, S::ORDER.len())
    }
}
