//! Operator console standing in for the node hardware.
//!
//! The card reader, the mode button and the potentiometers are external to
//! this crate. On a bench the binaries read them from stdin instead:
//!
//! | Node | Line | Effect |
//! |------|------|--------|
//! | master | `scan 42` or `42` | card 42 presented to the reader |
//! | master | `uid 50:3a:0c:59` | card presented by raw UID bytes |
//! | master | `press` | button pressed and released after the hold time |
//! | master | `rise` / `fall` | a single edge on the button line |
//! | actuator | `23.5` | knob turned to read 23.5 °C |
//!
//! Each console runs on its own OS thread so a blocked read never stalls the
//! node loop.

use crate::control::{Edge, ModeArbiter};
use crate::identity::{
    CardId, ConsolePrompt, IdentityResolver, UserPreference, card_id_from_uid,
};
use crate::sensors::KnobPosition;
use log::{info, warn};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc;

const MASTER_HELP: &str =
    "Commands: scan <card id> | uid <hex bytes> | press | rise | fall | help";

/// One parsed master console line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MasterCommand {
    Scan(CardId),
    Press,
    Edge(Edge),
    Help,
    Nothing,
}

fn parse_uid(text: &str) -> Option<Vec<u8>> {
    let hex: String = text
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | ' '))
        .collect();
    if hex.is_empty() || hex.len() % 2 != 0 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

pub fn parse_master_command(line: &str) -> Result<MasterCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_lowercase().as_str() {
        "" => Ok(MasterCommand::Nothing),
        "press" => Ok(MasterCommand::Press),
        "rise" => Ok(MasterCommand::Edge(Edge::Rising)),
        "fall" => Ok(MasterCommand::Edge(Edge::Falling)),
        "help" => Ok(MasterCommand::Help),
        "scan" => rest
            .parse::<CardId>()
            .map(MasterCommand::Scan)
            .map_err(|_| format!("Not a card id: {}", rest)),
        "uid" => parse_uid(rest)
            .map(|bytes| MasterCommand::Scan(card_id_from_uid(&bytes)))
            .ok_or_else(|| format!("Not a hex UID: {}", rest)),
        other => other
            .parse::<CardId>()
            .map(MasterCommand::Scan)
            .map_err(|_| format!("Unknown command: {}. {}", line, MASTER_HELP)),
    }
}

/// Drive the master's reader and button from `prompt` until input ends.
///
/// Identified users are sent to the master loop; enrollment of unknown cards
/// is asked on the same console.
pub fn run_master_console<R: BufRead, W: Write>(
    mut prompt: ConsolePrompt<R, W>,
    resolver: IdentityResolver,
    arbiter: Arc<ModeArbiter>,
    users: mpsc::Sender<UserPreference>,
    hold: Duration,
) {
    prompt.say("Bring TAG closer...");

    while let Some(line) = prompt.next_line() {
        match parse_master_command(&line) {
            Ok(MasterCommand::Scan(card_id)) => {
                if let Some(user) = resolver.scan(card_id, &mut prompt)
                    && users.blocking_send(user).is_err()
                {
                    warn!("Master loop is gone, closing console");
                    return;
                }
                prompt.say(&format!("CARD ID: {}", card_id));
            }
            Ok(MasterCommand::Press) => {
                arbiter.on_edge(Edge::Rising);
                thread::sleep(hold);
                arbiter.on_edge(Edge::Falling);
            }
            Ok(MasterCommand::Edge(edge)) => {
                arbiter.on_edge(edge);
            }
            Ok(MasterCommand::Help) => {
                prompt.say(MASTER_HELP);
            }
            Ok(MasterCommand::Nothing) => {}
            Err(message) => {
                prompt.say(&message);
            }
        }
    }

    info!("Console input closed");
}

pub fn spawn_master_console(
    resolver: IdentityResolver,
    arbiter: Arc<ModeArbiter>,
    users: mpsc::Sender<UserPreference>,
    hold: Duration,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("master-console".into())
        .spawn(move || {
            let stdin = io::stdin();
            let prompt = ConsolePrompt::new(stdin.lock(), io::stdout());
            run_master_console(prompt, resolver, arbiter, users, hold);
        })
}

/// Move the simulated knob from lines of °C values until input ends.
pub fn run_actuator_console<R: BufRead>(name: &str, input: R, knob: KnobPosition) {
    for line in input.lines() {
        let Ok(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<f64>() {
            Ok(celsius) if celsius.is_finite() => {
                knob.set_celsius(celsius);
                info!("[{}] Knob turned to {:.1} °C", name, celsius);
            }
            _ => warn!("[{}] Expected a temperature in °C, got {:?}", name, line),
        }
    }
}

pub fn spawn_actuator_console(
    name: &'static str,
    knob: KnobPosition,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}-console", name.to_lowercase()))
        .spawn(move || {
            let stdin = io::stdin();
            run_actuator_console(name, stdin.lock(), knob);
        })
}
