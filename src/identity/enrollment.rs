//! Enrollment of unknown cards.

use super::preferences::{CardId, SeasonalSetpoints};
use crate::error::{ClimateError, Result};
use log::{debug, warn};
use std::io::{BufRead, Write};

/// Asks whoever is at the reader whether an unknown card should be enrolled.
pub trait EnrollmentPrompt {
    /// Returns the setpoints to store, or `None` when enrollment is declined.
    fn offer(&mut self, card_id: CardId) -> Option<SeasonalSetpoints>;
}

/// Line-oriented prompt over any reader/writer pair (stdin/stdout in the
/// master binary).
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Read the next line without its trailing newline. `None` on end of input.
    pub fn next_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                warn!("Console read failed: {}", e);
                None
            }
        }
    }

    /// Write `text` and flush. Returns `false` if the console could not be
    /// written; the prompt keeps reading input either way.
    pub fn say(&mut self, text: &str) -> bool {
        self.emit(format_args!("{}\n", text))
    }

    fn emit(&mut self, text: std::fmt::Arguments<'_>) -> bool {
        match self
            .output
            .write_fmt(text)
            .and_then(|()| self.output.flush())
        {
            Ok(()) => true,
            Err(e) => {
                debug!("Console write failed: {}", e);
                false
            }
        }
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        self.emit(format_args!("{}", question));
        self.next_line()
            .map(|l| l.trim().to_string())
            .ok_or(ClimateError::EnrollmentInputClosed)
    }

    fn ask_setpoint(&mut self, question: &str) -> Result<f32> {
        let answer = self.ask(question)?;
        answer
            .parse::<f32>()
            .map_err(|_| ClimateError::InvalidSetpoint(answer))
    }

    fn enroll(&mut self) -> Result<Option<SeasonalSetpoints>> {
        let response = self.ask("Do you want to add the user? (yes/no): ")?;
        if response.to_lowercase() != "yes" {
            return Ok(None);
        }
        let winter = self.ask_setpoint("Enter preferred winter temperature: ")?;
        let summer = self.ask_setpoint("Enter preferred summer temperature: ")?;
        SeasonalSetpoints::new(winter, summer).map(Some)
    }
}

impl<R: BufRead, W: Write> EnrollmentPrompt for ConsolePrompt<R, W> {
    fn offer(&mut self, card_id: CardId) -> Option<SeasonalSetpoints> {
        match self.enroll() {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Enrollment of card {} abandoned: {}", card_id, e);
                None
            }
        }
    }
}
