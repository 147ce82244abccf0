//! Operator controls.
//!
//! Two inputs are recognized: capture and quit. Commands arrive on stdin (one
//! per line) and from Ctrl-C, on helper threads, and are handed to the capture
//! loop over a channel that the loop drains once per cycle.

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    None,
    Capture,
    Quit,
}

/// Map one line of operator input to an event. Unknown input yields `None`.
pub fn parse_command(line: &str) -> Option<ControlEvent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "c" | "space" => Some(ControlEvent::Capture),
        "q" | "quit" | "esc" => Some(ControlEvent::Quit),
        _ => None,
    }
}

/// Receiving end of the operator event channel.
pub struct Controls {
    rx: Receiver<ControlEvent>,
}

impl Controls {
    pub fn channel() -> (Sender<ControlEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }

    /// Next pending event, or `None` if nothing arrived since the last cycle.
    ///
    /// At most one event is taken per cycle. A closed channel is treated as quit.
    pub fn poll(&self) -> ControlEvent {
        match self.rx.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Empty) => ControlEvent::None,
            Err(TryRecvError::Disconnected) => ControlEvent::Quit,
        }
    }
}

/// Forward stdin commands to `tx`. End of input sends quit.
pub fn spawn_stdin_reader(tx: Sender<ControlEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(event) => {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
                None => log::warn!("ignoring unknown command {:?} (capture: Enter, quit: q)", line),
            }
        }
        let _ = tx.send(ControlEvent::Quit);
    })
}
