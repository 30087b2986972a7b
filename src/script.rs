// Scripted client sessions used to drive a demo against a running company
//
// One step per line: <client> <command> [args]
//   available <start> <end>
//   quote     <start> <end> <car type>
//   reserve   <start> <end> <car type>    (quote, then confirm)
//   reservations
//   count     <car type>
// Dates are YYYY-MM-DD at midnight UTC. Blank lines and lines starting with '#' are skipped.

use crate::car::Period;
use crate::quote::{Quote, Reservation, ReservationConstraints};
use crate::service::{RentalService, ServiceError};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },

    #[error("Line {line}: '{command}' expects {expected} argument(s), found {found}")]
    WrongArity {
        line: usize,
        command: String,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: invalid date '{value}'")]
    InvalidDate { line: usize, value: String },

    #[error("Line {line}: {message}")]
    InvalidStep { line: usize, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Available(Period),
    Quote(ReservationConstraints),
    Reserve(ReservationConstraints),
    Reservations,
    Count(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptStep {
    pub line: usize,
    pub client: String,
    pub command: Command,
}

// What a step produced; failures are recorded and the script moves on
#[derive(Debug)]
pub enum StepOutcome {
    Listing(String),
    Quoted(Quote),
    Reserved(Reservation),
    Reservations(Vec<Reservation>),
    Count(usize),
    Failed(ServiceError),
}

pub fn parse_script(text: &str) -> Result<Vec<ScriptStep>, ScriptError> {
    let mut steps = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() < 2 {
            return Err(ScriptError::InvalidStep {
                line,
                message: "expected a client name followed by a command".to_string(),
            });
        }

        let client = tokens[0].to_string();
        let name = tokens[1].to_lowercase();
        let args = &tokens[2..];

        let command = match name.as_str() {
            "available" => {
                expect_args(line, &name, args, 2)?;
                Command::Available(parse_period(line, args[0], args[1])?)
            }
            "quote" | "reserve" => {
                // Car type names may contain spaces
                if args.len() < 3 {
                    return Err(ScriptError::WrongArity {
                        line,
                        command: name.clone(),
                        expected: 3,
                        found: args.len(),
                    });
                }
                let period = parse_period(line, args[0], args[1])?;
                let constraints = ReservationConstraints::for_period(period, args[2..].join(" "));
                if name == "quote" {
                    Command::Quote(constraints)
                } else {
                    Command::Reserve(constraints)
                }
            }
            "reservations" => {
                expect_args(line, &name, args, 0)?;
                Command::Reservations
            }
            "count" => {
                if args.is_empty() {
                    return Err(ScriptError::WrongArity {
                        line,
                        command: name.clone(),
                        expected: 1,
                        found: 0,
                    });
                }
                Command::Count(args.join(" "))
            }
            _ => {
                return Err(ScriptError::UnknownCommand {
                    line,
                    command: tokens[1].to_string(),
                })
            }
        };

        steps.push(ScriptStep {
            line,
            client,
            command,
        });
    }

    Ok(steps)
}

pub fn load_script(path: impl AsRef<Path>) -> Result<Vec<ScriptStep>, ScriptError> {
    let text = std::fs::read_to_string(path)?;
    parse_script(&text)
}

fn expect_args(line: usize, command: &str, args: &[&str], expected: usize) -> Result<(), ScriptError> {
    if args.len() != expected {
        return Err(ScriptError::WrongArity {
            line,
            command: command.to_string(),
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

fn parse_date(line: usize, value: &str) -> Result<DateTime<Utc>, ScriptError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| ScriptError::InvalidDate {
            line,
            value: value.to_string(),
        })
}

fn parse_period(line: usize, start: &str, end: &str) -> Result<Period, ScriptError> {
    let start = parse_date(line, start)?;
    let end = parse_date(line, end)?;
    Period::new(start, end).map_err(|e| ScriptError::InvalidStep {
        line,
        message: e.to_string(),
    })
}

// Runs the steps in order; one step's failure does not stop the rest
pub async fn run_script(service: &dyn RentalService, steps: &[ScriptStep]) -> Vec<StepOutcome> {
    let mut outcomes = Vec::with_capacity(steps.len());

    for step in steps {
        let outcome = run_step(service, step).await;
        match &outcome {
            StepOutcome::Failed(e) => {
                warn!(line = step.line, client = %step.client, error = %e, "Step failed")
            }
            _ => info!(line = step.line, client = %step.client, "Step completed"),
        }
        outcomes.push(outcome);
    }

    outcomes
}

async fn run_step(service: &dyn RentalService, step: &ScriptStep) -> StepOutcome {
    let client = step.client.clone();
    let result = match &step.command {
        Command::Available(period) => service
            .available_car_types(*period)
            .await
            .map(StepOutcome::Listing),
        Command::Quote(constraints) => service
            .create_quote(constraints.clone(), client)
            .await
            .map(StepOutcome::Quoted),
        Command::Reserve(constraints) => {
            match service.create_quote(constraints.clone(), client).await {
                Ok(quote) => service.confirm_quote(quote).await.map(StepOutcome::Reserved),
                Err(e) => Err(e),
            }
        }
        Command::Reservations => service
            .reservations_by(client)
            .await
            .map(StepOutcome::Reservations),
        Command::Count(car_type) => service
            .reservation_count_for_car_type(car_type.clone())
            .await
            .map(StepOutcome::Count),
    };

    result.unwrap_or_else(StepOutcome::Failed)
}
