//! Filtering and sorting of task snapshots for display.
//!
//! Everything here is pure: functions take a snapshot and return a new
//! ordering without touching storage.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::task::{format_date, Task};

/// Attribute a task list can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortAttribute {
    Priority,
    Context,
    Project,
    Due,
    Created,
}

impl SortAttribute {
    pub const ALL: [SortAttribute; 5] = [
        SortAttribute::Priority,
        SortAttribute::Context,
        SortAttribute::Project,
        SortAttribute::Due,
        SortAttribute::Created,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortAttribute::Priority => "priority",
            SortAttribute::Context => "context",
            SortAttribute::Project => "project",
            SortAttribute::Due => "due",
            SortAttribute::Created => "created",
        }
    }
}

impl fmt::Display for SortAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortAttribute {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        SortAttribute::ALL
            .into_iter()
            .find(|attribute| attribute.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown sort attribute '{trimmed}' (expected one of: priority, context, project, due, created)"
                ))
            })
    }
}

/// Context/project filter.
///
/// An empty filter keeps every task. Otherwise a task is kept when any of
/// its contexts is selected OR any of its projects is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    contexts: BTreeSet<String>,
    projects: BTreeSet<String>,
}

impl TaskFilter {
    pub fn new<C, P>(contexts: C, projects: P) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            contexts: contexts.into_iter().map(Into::into).collect(),
            projects: projects.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contexts(&self) -> &BTreeSet<String> {
        &self.contexts
    }

    pub fn projects(&self) -> &BTreeSet<String> {
        &self.projects
    }

    /// True when at least one context or project is selected.
    pub fn is_active(&self) -> bool {
        !self.contexts.is_empty() || !self.projects.is_empty()
    }

    pub fn clear(&mut self) {
        self.contexts.clear();
        self.projects.clear();
    }

    pub fn matches(&self, task: &Task) -> bool {
        if !self.is_active() {
            return true;
        }
        task.contexts().iter().any(|c| self.contexts.contains(c))
            || task.projects().iter().any(|p| self.projects.contains(p))
    }

    /// Keep matching tasks, preserving order.
    pub fn apply(&self, mut tasks: Vec<Task>) -> Vec<Task> {
        tasks.retain(|task| self.matches(task));
        tasks
    }
}

/// Filter `tasks` by context and project sets.
pub fn filter_tasks(
    tasks: Vec<Task>,
    contexts: &BTreeSet<String>,
    projects: &BTreeSet<String>,
) -> Vec<Task> {
    TaskFilter::new(contexts.iter().cloned(), projects.iter().cloned()).apply(tasks)
}

/// Stable sort by `attribute`. Tasks missing the attribute go last.
pub fn sort_tasks(tasks: &mut [Task], attribute: SortAttribute) {
    tasks.sort_by(|left, right| compare_tasks(left, right, attribute));
}

/// Ordering used by [`sort_tasks`], for callers sorting their own wrappers.
pub fn compare_tasks(left: &Task, right: &Task, attribute: SortAttribute) -> Ordering {
    compare_missing_last(&sort_key(left, attribute), &sort_key(right, attribute))
}

/// Sorted copy of `tasks`.
pub fn sorted(mut tasks: Vec<Task>, attribute: SortAttribute) -> Vec<Task> {
    sort_tasks(&mut tasks, attribute);
    tasks
}

fn sort_key(task: &Task, attribute: SortAttribute) -> Option<String> {
    match attribute {
        SortAttribute::Priority => task.priority.map(|p| p.letter().to_string()),
        SortAttribute::Context => task.contexts().first().cloned(),
        SortAttribute::Project => task.projects().first().cloned(),
        // ISO dates order the same as strings
        SortAttribute::Due => task.due_date().map(format_date),
        SortAttribute::Created => task.creation_date.map(format_date),
    }
}

fn compare_missing_last(left: &Option<String>, right: &Option<String>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.cmp(right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sorted, de-duplicated contexts across `tasks`.
pub fn unique_contexts(tasks: &[Task]) -> Vec<String> {
    let set: BTreeSet<&String> = tasks.iter().flat_map(|task| task.contexts()).collect();
    set.into_iter().cloned().collect()
}

/// Sorted, de-duplicated projects across `tasks`.
pub fn unique_projects(tasks: &[Task]) -> Vec<String> {
    let set: BTreeSet<&String> = tasks.iter().flat_map(|task| task.projects()).collect();
    set.into_iter().cloned().collect()
}
