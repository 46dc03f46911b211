use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub enum AppEvent {
    Input(String),
    Tick,
    Eof,
}

/// Merges stdin lines and a periodic tick into one channel, so the single
/// consumer applies user commands and clock ticks one at a time.
pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    _tx: mpsc::Sender<AppEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let _tx = tx.clone();

        let input_tx = tx.clone();
        thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if input_tx.send(AppEvent::Input(line)).is_err() {
                    return;
                }
            }
            let _ = input_tx.send(AppEvent::Eof);
        });

        thread::spawn(move || {
            loop {
                thread::sleep(tick_rate);
                if tx.send(AppEvent::Tick).is_err() {
                    return;
                }
            }
        });

        Self { rx, _tx }
    }

    pub fn next(&self) -> anyhow::Result<AppEvent> {
        Ok(self.rx.recv()?)
    }
}
