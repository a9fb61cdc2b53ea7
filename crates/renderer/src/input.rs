use std::io::{self, BufRead};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, TryRecvError};
use winit::keyboard::{Key, NamedKey};

/// The two things an operator can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorCommand {
    Advance,
    Exit,
}

/// Source of operator commands polled once per frame.
pub trait InputPoller {
    /// Non-blocking; consumes at most one pending advance per call.
    fn poll_advance_requested(&mut self) -> bool;
    fn exit_requested(&mut self) -> bool;
}

pub fn command_for_key(key: &Key) -> Option<OperatorCommand> {
    match key {
        Key::Named(NamedKey::Space) => Some(OperatorCommand::Advance),
        Key::Named(NamedKey::Escape) => Some(OperatorCommand::Exit),
        Key::Character(value) if value.as_str() == " " => Some(OperatorCommand::Advance),
        _ => None,
    }
}

/// Interprets one line typed on the console.
///
/// An empty line or any line containing a space advances; `q`, `quit`,
/// `exit` or an ESC byte exit.
pub fn parse_console_line(line: &str) -> Option<OperatorCommand> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.contains('\u{1b}') {
        return Some(OperatorCommand::Exit);
    }
    match line.trim().to_ascii_lowercase().as_str() {
        "q" | "quit" | "exit" => return Some(OperatorCommand::Exit),
        _ => {}
    }
    if line.is_empty() || line.contains(' ') {
        Some(OperatorCommand::Advance)
    } else {
        None
    }
}

/// Spawns the thread that turns stdin lines into commands.
///
/// The thread ends on EOF or once the receiver is dropped.
pub fn spawn_console_reader() -> io::Result<Receiver<OperatorCommand>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        tracing::debug!(error = %err, "console input closed");
                        break;
                    }
                };
                match parse_console_line(&line) {
                    Some(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    None => tracing::debug!(input = %line, "ignoring console input"),
                }
            }
        })?;
    Ok(rx)
}

/// Merges window keyboard events and console commands.
#[derive(Debug, Default)]
pub struct OperatorInput {
    pending_advances: u32,
    exit: bool,
    console: Option<Receiver<OperatorCommand>>,
}

impl OperatorInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyboard input plus a console reader thread. Falls back to keyboard
    /// only when the thread cannot be spawned.
    pub fn with_console() -> Self {
        match spawn_console_reader() {
            Ok(rx) => Self::from_receiver(rx),
            Err(err) => {
                tracing::warn!(error = %err, "console input unavailable");
                Self::new()
            }
        }
    }

    pub fn from_receiver(console: Receiver<OperatorCommand>) -> Self {
        Self {
            console: Some(console),
            ..Self::default()
        }
    }

    pub fn apply(&mut self, command: OperatorCommand) {
        match command {
            OperatorCommand::Advance => self.pending_advances += 1,
            OperatorCommand::Exit => self.exit = true,
        }
    }

    pub fn handle_key(&mut self, key: &Key) {
        if let Some(command) = command_for_key(key) {
            self.apply(command);
        }
    }

    fn drain_console(&mut self) {
        let Some(console) = self.console.as_ref() else {
            return;
        };
        let mut received = Vec::new();
        let disconnected = loop {
            match console.try_recv() {
                Ok(command) => received.push(command),
                Err(TryRecvError::Empty) => break false,
                Err(TryRecvError::Disconnected) => break true,
            }
        };
        if disconnected {
            tracing::debug!("console reader finished");
            self.console = None;
        }
        for command in received {
            self.apply(command);
        }
    }
}

impl InputPoller for OperatorInput {
    fn poll_advance_requested(&mut self) -> bool {
        self.drain_console();
        if self.pending_advances > 0 {
            self.pending_advances -= 1;
            true
        } else {
            false
        }
    }

    fn exit_requested(&mut self) -> bool {
        self.drain_console();
        self.exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_lines_map_to_commands() {
        assert_eq!(parse_console_line(""), Some(OperatorCommand::Advance));
        assert_eq!(parse_console_line("\r\n"), Some(OperatorCommand::Advance));
        assert_eq!(parse_console_line(" "), Some(OperatorCommand::Advance));
        assert_eq!(parse_console_line("next one"), Some(OperatorCommand::Advance));
        assert_eq!(parse_console_line("q"), Some(OperatorCommand::Exit));
        assert_eq!(parse_console_line("QUIT"), Some(OperatorCommand::Exit));
        assert_eq!(parse_console_line("exit\n"), Some(OperatorCommand::Exit));
        assert_eq!(parse_console_line("\u{1b}"), Some(OperatorCommand::Exit));
        assert_eq!(parse_console_line("x"), None);
    }

    #[test]
    fn named_keys_map_to_commands() {
        assert_eq!(
            command_for_key(&Key::Named(NamedKey::Space)),
            Some(OperatorCommand::Advance)
        );
        assert_eq!(
            command_for_key(&Key::Named(NamedKey::Escape)),
            Some(OperatorCommand::Exit)
        );
        assert_eq!(command_for_key(&Key::Named(NamedKey::Enter)), None);
    }

    #[test]
    fn each_poll_consumes_one_advance() {
        let mut input = OperatorInput::new();
        input.handle_key(&Key::Named(NamedKey::Space));
        input.handle_key(&Key::Named(NamedKey::Space));
        assert!(input.poll_advance_requested());
        assert!(input.poll_advance_requested());
        assert!(!input.poll_advance_requested());
        assert!(!input.exit_requested());
    }

    #[test]
    fn console_commands_are_drained_without_blocking() {
        let (tx, rx) = unbounded();
        let mut input = OperatorInput::from_receiver(rx);
        assert!(!input.poll_advance_requested());

        tx.send(OperatorCommand::Advance).unwrap();
        assert!(input.poll_advance_requested());
        assert!(!input.poll_advance_requested());

        tx.send(OperatorCommand::Exit).unwrap();
        drop(tx);
        assert!(input.exit_requested());
        assert!(input.console.is_none());
    }
}
