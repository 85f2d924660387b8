//! todo.txt line codec.
//!
//! Line grammar:
//!
//! ```text
//! [x ][(P) ][completion-date ][creation-date ]description[ key:value ...]
//! ```
//!
//! Decoding never fails: anything that does not fit a recognized slot is kept
//! as description text. The description is taken verbatim, so `key:value`
//! tokens, URLs and spacing stay where they were written. Attributes are read
//! from those tokens by [`Task`].

use crate::task::{format_date, parse_date, Priority, Task};

const COMPLETION_MARKER: &str = "x";

/// Decode one line into a task.
pub fn decode(line: &str) -> Task {
    let mut rest = line.trim();

    let mut completed = false;
    if let Some((COMPLETION_MARKER, after)) = split_first_token(rest) {
        completed = true;
        rest = after;
    }

    let mut priority = None;
    if let Some((token, after)) = split_first_token(rest) {
        if let Some(parsed) = parse_priority_token(token) {
            priority = Some(parsed);
            rest = after;
        }
    }

    let mut completion_date = None;
    let mut creation_date = None;
    if completed {
        if let Some((date, after)) = take_date(rest) {
            completion_date = Some(date);
            rest = after;
            if let Some((date, after)) = take_date(rest) {
                creation_date = Some(date);
                rest = after;
            }
        }
    } else if let Some((date, after)) = take_date(rest) {
        creation_date = Some(date);
        rest = after;
    }

    let mut task = Task::new(rest);
    task.completed = completed;
    task.priority = priority;
    task.completion_date = completion_date;
    task.creation_date = creation_date;
    task
}

/// Encode a task as its canonical line (without a trailing newline).
pub fn encode(task: &Task) -> String {
    let mut parts: Vec<String> = Vec::new();

    if task.is_completed() {
        parts.push(COMPLETION_MARKER.to_string());
    }
    if let Some(priority) = task.priority {
        parts.push(format!("({priority})"));
    }
    if task.is_completed() {
        if let Some(date) = task.completion_date() {
            parts.push(format_date(date));
        }
    }
    if let Some(date) = task.creation_date {
        parts.push(format_date(date));
    }
    if !task.description().is_empty() {
        parts.push(task.description().to_string());
    }

    parts.join(" ")
}

/// Split off the first whitespace-delimited token. Returns `None` when the
/// token is the whole input, so a lone marker stays description text.
fn split_first_token(input: &str) -> Option<(&str, &str)> {
    let (token, rest) = input.split_once(char::is_whitespace)?;
    Some((token, rest.trim_start()))
}

fn parse_priority_token(token: &str) -> Option<Priority> {
    let inner = token.strip_prefix('(')?.strip_suffix(')')?;
    let mut chars = inner.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) => Priority::new(letter),
        _ => None,
    }
}

fn take_date(input: &str) -> Option<(chrono::NaiveDate, &str)> {
    let (token, rest) = split_first_token(input)?;
    parse_date(token).map(|date| (date, rest))
}
