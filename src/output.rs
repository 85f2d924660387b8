//! Shared output formatting for checkmate CLI commands.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};
use crate::task::{format_date, without_attribute_tokens, AttributeValue, Task, DUE_KEY, ID_KEY};

pub const SCHEMA_VERSION: &str = "checkmate.v1";

/// Global flags that take a value; skipped when inferring the command name.
const VALUE_FLAGS: [&str; 2] = ["--todo", "--done"];

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

/// JSON shape of one task.
///
/// `position` is the 1-based place of the task in its file, which is what
/// numeric task references resolve against.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    pub position: usize,
    pub id: Option<String>,
    pub description: String,
    pub completed: bool,
    pub priority: Option<String>,
    pub creation_date: Option<String>,
    pub completion_date: Option<String>,
    pub due_date: Option<String>,
    pub overdue: bool,
    pub due_today: bool,
    pub contexts: Vec<String>,
    pub projects: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl TaskOutput {
    pub fn new(position: usize, task: &Task, today: chrono::NaiveDate) -> Self {
        Self {
            position,
            id: task.id().map(str::to_string),
            description: display_description(task),
            completed: task.is_completed(),
            priority: task.priority.map(|p| p.to_string()),
            creation_date: task.creation_date.map(format_date),
            completion_date: task.completion_date().map(format_date),
            due_date: task.due_date().map(format_date),
            overdue: task.is_overdue(today),
            due_today: task.is_due_today(today),
            contexts: task.contexts().to_vec(),
            projects: task.projects().to_vec(),
            // The id is reported on its own
            attributes: task
                .attributes()
                .iter()
                .filter(|(key, _)| *key != ID_KEY)
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
        }
    }
}

/// Description as shown to people. The id and a readable due date have their
/// own fields, so their tokens are left out; the stored text keeps them.
pub fn display_description(task: &Task) -> String {
    let text = without_attribute_tokens(task.description(), ID_KEY);
    if task.due_date().is_some() {
        without_attribute_tokens(&text, DUE_KEY)
    } else {
        text
    }
}

/// One-line human rendering of a task, e.g.
/// `2. (A) Call mom @phone  [due 2024-05-01, overdue]  #q69g5fav`.
pub fn format_task_line(position: usize, task: &Task, today: chrono::NaiveDate) -> String {
    let mut line = format!("{position}. ");
    if task.is_completed() {
        line.push_str("x ");
    }
    if let Some(priority) = task.priority {
        line.push_str(&format!("({priority}) "));
    }
    line.push_str(&display_description(task));

    let mut meta = Vec::new();
    if let Some(date) = task.completion_date() {
        meta.push(format!("done {}", format_date(date)));
    }
    if let Some(due) = task.due_date() {
        if task.is_overdue(today) {
            meta.push(format!("due {}, overdue", format_date(due)));
        } else if task.is_due_today(today) {
            meta.push(format!("due {}, today", format_date(due)));
        } else {
            meta.push(format!("due {}", format_date(due)));
        }
    }
    if !meta.is_empty() {
        line.push_str(&format!("  [{}]", meta.join("; ")));
    }
    if let Some(id) = task.id() {
        line.push_str(&format!("  #{id}"));
    }
    line
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let warnings = human.map(|h| h.warnings.clone()).unwrap_or_default();
        let next_steps = human.map(|h| h.next_steps.clone()).unwrap_or_default();

        #[derive(Serialize)]
        struct Envelope<'a, T: Serialize> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            data: &'a T,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            warnings: Vec<String>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
            warnings,
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if options.quiet {
        return Ok(());
    }

    if let Some(human) = human {
        println!("{}", format_human(human));
    }

    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    let hint = next_steps.first().map(|step| step.as_str());
    if json {
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            message: &'a str,
            code: i32,
            kind: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<serde_json::Value>,
        }

        #[derive(Serialize)]
        struct Envelope<'a> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            error: ErrorBody<'a>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: ErrorBody {
                message: &err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            },
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = Vec::new();
    lines.push(output.header.clone());

    push_summary(&mut lines, &output.summary);
    push_section(&mut lines, "Details", &output.details);
    push_section(&mut lines, "Warnings", &output.warnings);
    push_section(&mut lines, "Next steps", &output.next_steps);

    lines.join("\n")
}

pub fn infer_command_name_from_args() -> String {
    infer_command_name(std::env::args().skip(1))
}

fn infer_command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return arg;
    }
    "checkmate".to_string()
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        exit_codes::USER_ERROR => "user_error",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::TaskNotFound(_) => vec!["checkmate list".to_string()],
        Error::InvalidConfig(_) => vec!["fix ~/.todo/config then retry".to_string()],
        Error::Repository(err) | Error::TaskOperation { source: err, .. } => vec![format!(
            "check that {} is a writable file",
            err.path().display()
        )],
        _ => Vec::new(),
    }
}

fn push_summary(lines: &mut Vec<String>, summary: &[(String, String)]) {
    if summary.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());
    for (key, value) in summary {
        if value.is_empty() {
            lines.push(format!("- {key}"));
        } else {
            lines.push(format!("- {key}: {value}"));
        }
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push(format!("{title}:"));
    for item in items {
        lines.push(format!("- {item}"));
    }
}
