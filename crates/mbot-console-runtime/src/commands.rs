//! Operator commands read line by line from stdin.
//!
//! The reader runs on its own OS thread and hands each command to the
//! event loop, then waits for the loop to finish with it before reading the
//! next line. While it waits it does not touch stdin, so a confirmation
//! prompt raised by the command can read the terminal.

use std::io;
use std::str::FromStr;
use std::thread;

use mbot_console_core::SlamMode;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

pub const HELP: &str = "commands: localize, map, reset-map, mode <idle|localize|map>, save-map, \
robot, lasers, particles, click <px> <py>, click, status, quit";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatorCommand {
    ToggleLocalization,
    ToggleMapping,
    ResetMap,
    /// Ask for a specific SLAM mode instead of toggling.
    SetSlamMode(SlamMode),
    SaveMap,
    ToggleRobot,
    ToggleLasers,
    ToggleParticles,
    /// `None` clears the selection.
    Click(Option<(f64, f64)>),
    Status,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("usage: click <px> <py>")]
    ClickUsage,

    #[error("usage: mode <idle|localize|map>")]
    ModeUsage,
}

impl FromStr for OperatorCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Unknown(String::new()));
        };
        let command = match head {
            "localize" => Self::ToggleLocalization,
            "map" => Self::ToggleMapping,
            "reset-map" => Self::ResetMap,
            "save-map" => Self::SaveMap,
            "robot" => Self::ToggleRobot,
            "lasers" => Self::ToggleLasers,
            "particles" => Self::ToggleParticles,
            "status" => Self::Status,
            "quit" | "exit" => Self::Quit,
            "mode" => {
                let target = match words.next() {
                    Some("idle") => SlamMode::Idle,
                    Some("localize") => SlamMode::LocalizationOnly,
                    Some("map") => SlamMode::FullSlam,
                    _ => return Err(CommandError::ModeUsage),
                };
                Self::SetSlamMode(target)
            }
            "click" => {
                let args: Vec<&str> = words.by_ref().collect();
                return match args.as_slice() {
                    [] => Ok(Self::Click(None)),
                    [px, py] => {
                        let px = px.parse().map_err(|_| CommandError::ClickUsage)?;
                        let py = py.parse().map_err(|_| CommandError::ClickUsage)?;
                        Ok(Self::Click(Some((px, py))))
                    }
                    _ => Err(CommandError::ClickUsage),
                };
            }
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        match words.next() {
            None => Ok(command),
            Some(_) => Err(CommandError::Unknown(line.trim().to_string())),
        }
    }
}

/// A command plus the acknowledgement the loop sends once it is handled.
#[derive(Debug)]
pub struct CommandRequest {
    pub command: OperatorCommand,
    pub done: oneshot::Sender<()>,
}

/// Forward commands from `next_line` until EOF, `quit`, or the loop goes
/// away. Blocking; run it off the runtime.
pub fn read_commands(
    mut next_line: impl FnMut() -> io::Result<Option<String>>,
    tx: mpsc::Sender<CommandRequest>,
) {
    loop {
        let line = match next_line() {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("stdin read failed: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<OperatorCommand>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}\n{HELP}");
                continue;
            }
        };

        let (done, ack) = oneshot::channel();
        if tx.blocking_send(CommandRequest { command, done }).is_err() {
            break;
        }
        if ack.blocking_recv().is_err() || command == OperatorCommand::Quit {
            break;
        }
    }
    tracing::debug!("command reader finished");
}

/// Spawn the stdin reader thread.
pub fn spawn_stdin_reader(tx: mpsc::Sender<CommandRequest>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("mbot-console-stdin".to_string())
        .spawn(move || {
            // Lock per line only, so confirmation prompts can take stdin.
            read_commands(
                || {
                    let mut line = String::new();
                    match io::stdin().read_line(&mut line)? {
                        0 => Ok(None),
                        _ => Ok(Some(line)),
                    }
                },
                tx,
            );
        })
}
