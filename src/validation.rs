// src/validation.rs
use uuid::Uuid;

use crate::error::PollError;
use crate::models::{PollInput, VoteInput};

pub const QUESTION_MIN: usize = 5;
pub const QUESTION_MAX: usize = 1000;
pub const OPTIONS_MIN: usize = 2;
pub const OPTIONS_MAX: usize = 50;
pub const OPTION_MAX: usize = 300;

/// Trims the question, drops blank options and checks every bound.
/// All violations are reported together.
pub fn validate_poll_input(question: &str, options: &[String]) -> Result<PollInput, PollError> {
    let question = question.trim().to_string();
    let options: Vec<String> = options
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();

    let mut violations = Vec::new();

    let question_len = question.chars().count();
    if question_len < QUESTION_MIN {
        violations.push(format!("Question must be at least {QUESTION_MIN} characters"));
    }
    if question_len > QUESTION_MAX {
        violations.push(format!("Question must be at most {QUESTION_MAX} characters"));
    }

    if options.len() < OPTIONS_MIN {
        violations.push(format!("At least {OPTIONS_MIN} options are required"));
    }
    if options.len() > OPTIONS_MAX {
        violations.push(format!("At most {OPTIONS_MAX} options are allowed"));
    }
    if options.iter().any(|o| o.chars().count() > OPTION_MAX) {
        violations.push(format!("Each option must be at most {OPTION_MAX} characters"));
    }

    if !violations.is_empty() {
        return Err(PollError::Validation(violations));
    }

    Ok(PollInput { question, options })
}

pub fn validate_poll_id(poll_id: &str) -> Result<Uuid, PollError> {
    Uuid::parse_str(poll_id.trim()).map_err(|_| PollError::validation("Invalid poll id"))
}

/// Shape check only; whether the index fits the poll is decided against live state.
pub fn validate_vote_input(poll_id: &str, option_index: i64) -> Result<VoteInput, PollError> {
    let mut violations = Vec::new();

    let parsed_id = Uuid::parse_str(poll_id.trim()).ok();
    if parsed_id.is_none() {
        violations.push("Invalid poll id".to_string());
    }

    let parsed_index = u32::try_from(option_index).ok();
    if parsed_index.is_none() {
        violations.push("Option index must be a non-negative integer".to_string());
    }

    match (parsed_id, parsed_index) {
        (Some(poll_id), Some(option_index)) => Ok(VoteInput {
            poll_id,
            option_index,
        }),
        _ => Err(PollError::Validation(violations)),
    }
}
