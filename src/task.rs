//! Task records.
//!
//! A [`Task`] is the in-memory form of one todo.txt line. The description is
//! kept verbatim, `key:value` tokens included. Projects, contexts and
//! attributes are a parsed view of it, refreshed through
//! [`Task::set_description`] / [`Task::refresh_metadata`]. Attribute setters
//! edit the tokens in the text. The completion date only moves through
//! [`Task::complete`] and [`Task::reopen`].

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{Error, Result};

/// Reserved attribute key holding the stable task identity.
pub const ID_KEY: &str = "cmid";

/// Attribute key holding the due date.
pub const DUE_KEY: &str = "due";

/// Date format used for every date in the task files.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const PROJECT_MARKER: char = '+';
const CONTEXT_MARKER: char = '@';

/// Today's date in local time.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    // chrono accepts unpadded fields; the file format does not.
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Task priority: a single uppercase letter, `A` being the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct Priority(char);

impl Priority {
    /// Build a priority from an uppercase ASCII letter.
    pub fn new(letter: char) -> Option<Self> {
        if letter.is_ascii_uppercase() {
            Some(Self(letter))
        } else {
            None
        }
    }

    pub fn letter(self) -> char {
        self.0
    }
}

impl FromStr for Priority {
    type Err = Error;

    /// Accepts one letter, in either case.
    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) if letter.is_ascii_alphabetic() => {
                Ok(Self(letter.to_ascii_uppercase()))
            }
            _ => Err(Error::Validation(
                "Priority must be a single uppercase letter A-Z".to_string(),
            )),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value of one attribute key. Keys seen more than once keep every value.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    Multiple(Vec<String>),
}

impl AttributeValue {
    /// First value stored under the key.
    pub fn first(&self) -> Option<&str> {
        match self {
            AttributeValue::Single(value) => Some(value),
            AttributeValue::Multiple(values) => values.first().map(String::as_str),
        }
    }

    /// All values in encounter order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            AttributeValue::Single(value) => vec![value.as_str()],
            AttributeValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            AttributeValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = AttributeValue::Multiple(vec![first, value]);
            }
            AttributeValue::Multiple(values) => values.push(value),
        }
    }
}

/// Ordered `key:value` attributes of a task, in first-seen key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, AttributeValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    /// First value stored under `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttributeValue::first)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Add a value under `key`, keeping any existing values.
    fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1.push(value),
            None => self.entries.push((key, AttributeValue::Single(value))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// One task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    description: String,
    pub(crate) completed: bool,
    pub priority: Option<Priority>,
    pub creation_date: Option<NaiveDate>,
    pub(crate) completion_date: Option<NaiveDate>,
    projects: Vec<String>,
    contexts: Vec<String>,
    attributes: Attributes,
    /// Line this task was read from, or the line written by its last save.
    pub(crate) stored_text: Option<String>,
}

impl Task {
    /// Create an open task with no dates, priority, or attributes.
    pub fn new(description: impl Into<String>) -> Self {
        let mut task = Self {
            description: description.into(),
            completed: false,
            priority: None,
            creation_date: None,
            completion_date: None,
            projects: Vec::new(),
            contexts: Vec::new(),
            attributes: Attributes::new(),
            stored_text: None,
        };
        task.refresh_metadata();
        task
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Replace the description and re-derive its tags and attributes.
    ///
    /// The task keeps its id, and its due date unless the new text carries a
    /// `due:` token of its own.
    pub fn set_description(&mut self, description: impl Into<String>) {
        let id = self.id().map(str::to_string);
        let due = self.attributes.first(DUE_KEY).map(str::to_string);

        self.description = description.into();
        self.refresh_metadata();

        if let Some(due) = due {
            if !self.attributes.contains_key(DUE_KEY) {
                self.set_token(DUE_KEY, &due);
            }
        }
        if let Some(id) = id {
            self.set_token(ID_KEY, &id);
        }
    }

    /// Re-scan the description for `+project`, `@context` and `key:value`
    /// tokens.
    pub fn refresh_metadata(&mut self) {
        self.projects = extract_tags(&self.description, PROJECT_MARKER);
        self.contexts = extract_tags(&self.description, CONTEXT_MARKER);
        self.attributes = extract_attributes(&self.description);
    }

    pub fn projects(&self) -> &[String] {
        &self.projects
    }

    pub fn contexts(&self) -> &[String] {
        &self.contexts
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn completion_date(&self) -> Option<NaiveDate> {
        self.completion_date
    }

    /// Mark the task completed today.
    pub fn complete(&mut self) {
        self.complete_on(today());
    }

    /// Mark the task completed on `date`. Calling it again resets the date.
    pub fn complete_on(&mut self, date: NaiveDate) {
        self.completed = true;
        self.completion_date = Some(date);
    }

    /// Mark the task open again and clear its completion date.
    pub fn reopen(&mut self) {
        self.completed = false;
        self.completion_date = None;
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Set a user attribute. The identity key is owned by the task store.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        validate_attribute_key(key)?;
        let value = value.into();
        if value.is_empty() || value.chars().any(char::is_whitespace) {
            return Err(Error::Validation(format!(
                "attribute '{key}' needs a value without whitespace"
            )));
        }
        self.set_token(key, &value);
        Ok(())
    }

    /// Remove a user attribute, returning its previous value.
    pub fn remove_attribute(&mut self, key: &str) -> Result<Option<AttributeValue>> {
        validate_attribute_key(key)?;
        let previous = self.attributes.get(key).cloned();
        self.remove_tokens(key);
        Ok(previous)
    }

    /// Stable identity, once the task store has assigned one.
    pub fn id(&self) -> Option<&str> {
        self.attributes.first(ID_KEY).filter(|id| !id.is_empty())
    }

    pub(crate) fn assign_id(&mut self, id: String) {
        self.set_token(ID_KEY, &id);
    }

    /// Due date from the `due` attribute; unparsable values read as none.
    pub fn due_date(&self) -> Option<NaiveDate> {
        self.attributes.first(DUE_KEY).and_then(parse_date)
    }

    /// Rewrite the `due` attribute, or remove it entirely for `None`.
    pub fn set_due_date(&mut self, due: Option<NaiveDate>) {
        match due {
            Some(date) => self.set_token(DUE_KEY, &format_date(date)),
            None => self.remove_tokens(DUE_KEY),
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date().is_some_and(|due| due < today)
    }

    pub fn is_due_today(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date() == Some(today)
    }

    /// Last known stored line for this task, if any.
    pub fn stored_text(&self) -> Option<&str> {
        self.stored_text.as_deref()
    }

    /// Rewrite the first `key:` token in place and drop any later ones, or
    /// append `key:value` when the text has none.
    fn set_token(&mut self, key: &str, value: &str) {
        let token = format!("{key}:{value}");
        let spans = attribute_spans(&self.description, key);
        match spans.split_first() {
            Some((first, later)) => {
                for span in later.iter().rev() {
                    remove_span(&mut self.description, span.clone());
                }
                self.description.replace_range(first.clone(), &token);
            }
            None => {
                if !self.description.is_empty() {
                    self.description.push(' ');
                }
                self.description.push_str(&token);
            }
        }
        self.refresh_metadata();
    }

    fn remove_tokens(&mut self, key: &str) {
        self.description = without_attribute_tokens(&self.description, key);
        self.refresh_metadata();
    }
}

/// Split a `key:value` token. Tags (`+x:y`, `@x:y`) and tokens with an empty
/// side are not attributes.
pub(crate) fn parse_attribute_token(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once(':')?;
    if key.is_empty() || value.is_empty() || key.starts_with([PROJECT_MARKER, CONTEXT_MARKER]) {
        return None;
    }
    Some((key, value))
}

/// Whether `text` carries a `key:value` token for `key`.
pub(crate) fn has_attribute_token(text: &str, key: &str) -> bool {
    !attribute_spans(text, key).is_empty()
}

/// Copy of `text` without its `key:value` tokens for `key`.
pub(crate) fn without_attribute_tokens(text: &str, key: &str) -> String {
    let mut text = text.to_string();
    for span in attribute_spans(&text, key).into_iter().rev() {
        remove_span(&mut text, span);
    }
    text
}

fn validate_attribute_key(key: &str) -> Result<()> {
    if key == ID_KEY {
        return Err(Error::Validation(format!(
            "attribute '{ID_KEY}' is reserved for task identity"
        )));
    }
    if key.is_empty() || key.contains(':') || key.chars().any(char::is_whitespace) {
        return Err(Error::Validation(format!("invalid attribute key '{key}'")));
    }
    Ok(())
}

/// Byte ranges of the whitespace-delimited tokens in `text`.
fn token_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = None;
    for (index, ch) in text.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(begin)) => {
                spans.push(begin..index);
                start = None;
            }
            (false, None) => start = Some(index),
            _ => {}
        }
    }
    if let Some(begin) = start {
        spans.push(begin..text.len());
    }
    spans
}

fn attribute_spans(text: &str, key: &str) -> Vec<Range<usize>> {
    token_spans(text)
        .into_iter()
        .filter(|span| {
            parse_attribute_token(&text[span.clone()]).is_some_and(|(found, _)| found == key)
        })
        .collect()
}

/// Cut one token out of `text` together with the whitespace that separated
/// it from its neighbour.
fn remove_span(text: &mut String, span: Range<usize>) {
    let start = text[..span.start].trim_end().len();
    let end = if start == 0 {
        text.len() - text[span.end..].trim_start().len()
    } else {
        span.end
    };
    text.replace_range(start..end, "");
}

fn extract_attributes(description: &str) -> Attributes {
    let mut attributes = Attributes::new();
    for token in description.split_whitespace() {
        if let Some((key, value)) = parse_attribute_token(token) {
            attributes.push(key, value);
        }
    }
    attributes
}

fn extract_tags(description: &str, marker: char) -> Vec<String> {
    description
        .split_whitespace()
        .filter_map(|token| token.strip_prefix(marker))
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
