// THEORY:
// Console controls. The station has no window to catch key presses, so the
// operator types one key per line on stdin. A plain thread reads the lines and
// forwards them over a channel; the tick loop turns each into at most one
// `Command` for the current mode. Unknown keys are ignored.

use chip_vision::{ChipClass, Command, RunMode};
use log::debug;
use std::io::BufRead;
use tokio::sync::mpsc;

pub fn key_command(mode: RunMode, key: char, burst_size: usize) -> Option<Command> {
    let key = key.to_ascii_lowercase();
    match (mode, key) {
        (_, 'q') => Some(Command::Quit),
        (_, 'r') => Some(Command::ResetStats),
        (_, 'p') => Some(Command::TogglePause),
        (RunMode::Camera, ' ') => Some(Command::TogglePause),
        (RunMode::Camera, _) => None,
        (_, 'c') => Some(Command::Clear),
        (RunMode::Conveyor, 's') => Some(Command::Spawn(None)),
        (RunMode::Conveyor, 'b') => Some(Command::Burst(burst_size)),
        (RunMode::Interactive, '1') => Some(Command::Spawn(Some(ChipClass::Gold))),
        (RunMode::Interactive, '2') => Some(Command::Spawn(Some(ChipClass::Silver))),
        (RunMode::Interactive, '3') => Some(Command::Spawn(Some(ChipClass::Bronze))),
        _ => None,
    }
}

/// The command typed on one console line. A line holding only spaces is the space key.
pub fn line_command(mode: RunMode, line: &str, burst_size: usize) -> Option<Command> {
    let line = line.trim_end_matches(['\r', '\n']);
    let key = match line.trim().chars().next() {
        Some(key) => key,
        None if !line.is_empty() => ' ',
        None => return None,
    };
    let command = key_command(mode, key, burst_size);
    if command.is_none() {
        debug!("Ignoring key {:?} in {} mode", key, mode);
    }
    command
}

pub fn help(mode: RunMode) -> &'static str {
    match mode {
        RunMode::Conveyor => "s spawn | b burst | c clear | p pause | r reset | q quit",
        RunMode::Interactive => "1 gold | 2 silver | 3 bronze | c clear | p pause | r reset | q quit",
        RunMode::Camera => "space/p pause | r reset | q quit",
    }
}

/// Forwards stdin lines until EOF. The reader thread is detached; it never
/// holds up shutdown.
pub fn spawn_console_reader() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel(16);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if sender.blocking_send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conveyor_keys() {
        let m = RunMode::Conveyor;
        assert_eq!(line_command(m, "s\n", 5), Some(Command::Spawn(None)));
        assert_eq!(line_command(m, "B", 5), Some(Command::Burst(5)));
        assert_eq!(line_command(m, "c", 5), Some(Command::Clear));
        assert_eq!(line_command(m, "p", 5), Some(Command::TogglePause));
        assert_eq!(line_command(m, "r", 5), Some(Command::ResetStats));
        assert_eq!(line_command(m, "q", 5), Some(Command::Quit));
        assert_eq!(line_command(m, "1", 5), None);
        assert_eq!(line_command(m, "", 5), None);
    }

    #[test]
    fn interactive_keys_pick_the_class() {
        let m = RunMode::Interactive;
        assert_eq!(line_command(m, "1", 5), Some(Command::Spawn(Some(ChipClass::Gold))));
        assert_eq!(line_command(m, "2", 5), Some(Command::Spawn(Some(ChipClass::Silver))));
        assert_eq!(line_command(m, "3", 5), Some(Command::Spawn(Some(ChipClass::Bronze))));
        assert_eq!(line_command(m, "s", 5), None);
        assert_eq!(line_command(m, "c", 5), Some(Command::Clear));
    }

    #[test]
    fn camera_accepts_space_for_pause() {
        let m = RunMode::Camera;
        assert_eq!(line_command(m, " ", 5), Some(Command::TogglePause));
        assert_eq!(line_command(m, "p", 5), Some(Command::TogglePause));
        assert_eq!(line_command(m, "r", 5), Some(Command::ResetStats));
        assert_eq!(line_command(m, "c", 5), None);
        assert_eq!(line_command(m, "s", 5), None);
    }
}
