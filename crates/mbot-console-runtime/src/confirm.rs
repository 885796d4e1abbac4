//! Terminal confirmation for destructive SLAM actions.

use std::io::{self, BufRead, Write};

use mbot_console_core::{Confirm, ConfirmPolicy};

use crate::cli::ConfirmMode;

/// Confirmation source chosen at startup.
#[derive(Debug, Clone, Copy)]
pub enum ConsoleConfirm {
    /// Ask on stdin/stdout.
    Prompt,
    Policy(ConfirmPolicy),
}

impl From<ConfirmMode> for ConsoleConfirm {
    fn from(mode: ConfirmMode) -> Self {
        match mode {
            ConfirmMode::Prompt => Self::Prompt,
            ConfirmMode::Accept => Self::Policy(ConfirmPolicy::Accept),
            ConfirmMode::Decline => Self::Policy(ConfirmPolicy::Decline),
        }
    }
}

impl Confirm for ConsoleConfirm {
    fn confirm(&self, message: &str) -> bool {
        match self {
            Self::Prompt => {
                let stdin = io::stdin();
                let mut input = stdin.lock();
                ask(&mut input, &mut io::stdout(), message)
            }
            Self::Policy(policy) => policy.confirm(message),
        }
    }
}

/// Print `message` and read one answer line. Only `y`/`yes` accepts; EOF
/// and IO errors decline.
fn ask(input: &mut impl BufRead, output: &mut impl Write, message: &str) -> bool {
    if write!(output, "{message} [y/N] ")
        .and_then(|()| output.flush())
        .is_err()
    {
        return false;
    }
    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(0) | Err(_) => false,
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
    }
}
