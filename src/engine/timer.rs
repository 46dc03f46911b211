/// Result of a single one-second tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Not running (inactive, paused, or expiry already signalled).
    Idle,
    /// Still running with this many seconds left.
    Running(u32),
    /// Reached zero on this tick. Reported exactly once per countdown.
    Expired,
}

/// Countdown driven by an external one-second scheduler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Countdown {
    total: u32,
    remaining: u32,
    active: bool,
    paused: bool,
    expiry_signalled: bool,
}

impl Countdown {
    pub fn start(&mut self, total_secs: u32) {
        *self = Self {
            total: total_secs,
            remaining: total_secs,
            active: true,
            paused: false,
            expiry_signalled: false,
        };
    }

    /// Rebuild a countdown persisted mid-session. A countdown that was
    /// already at zero does not signal expiry again.
    pub fn restore(total_secs: u32, remaining_secs: u32, active: bool, paused: bool) -> Self {
        let remaining = remaining_secs.min(total_secs);
        Self {
            total: total_secs,
            remaining,
            active: active && remaining > 0,
            paused,
            expiry_signalled: remaining == 0,
        }
    }

    pub fn tick(&mut self) -> Tick {
        if !self.active || self.paused || self.expiry_signalled {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.expiry_signalled = true;
            self.active = false;
            Tick::Expired
        } else {
            Tick::Running(self.remaining)
        }
    }

    pub fn pause(&mut self) {
        if self.active {
            self.paused = true;
        }
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Stop without expiring, e.g. when the user ends early.
    pub fn stop(&mut self) {
        self.active = false;
        self.paused = false;
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Seconds consumed so far: configured duration minus remaining.
    pub fn elapsed(&self) -> u32 {
        self.total - self.remaining
    }
}

/// Render seconds as `H:MM:SS`, or `M:SS` under an hour.
pub fn format_clock(secs: u32) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
