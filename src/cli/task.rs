//! checkmate command implementations.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{self, Config, TaskFiles};
use crate::error::{Error, Result};
use crate::output::{
    display_description, emit_success, format_task_line, HumanOutput, OutputOptions, TaskOutput,
};
use crate::repository::FileTaskRepository;
use crate::service::{self, TaskUpdate, TodoService};
use crate::task::{parse_date, today, Priority, Task};
use crate::view::{self, SortAttribute, TaskFilter};

/// Flags shared by every command.
pub struct Globals {
    pub todo: Option<PathBuf>,
    pub done: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl Globals {
    fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }
}

pub struct AddOptions {
    pub description: String,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub globals: Globals,
}

pub struct ListOptions {
    pub completed: bool,
    pub sort: Option<String>,
    pub contexts: Vec<String>,
    pub projects: Vec<String>,
    pub globals: Globals,
}

pub struct EditOptions {
    pub task: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub clear_priority: bool,
    pub due: Option<String>,
    pub clear_due: bool,
    pub globals: Globals,
}

pub struct TargetOptions {
    pub task: String,
    pub globals: Globals,
}

pub struct RmOptions {
    pub task: String,
    pub completed: bool,
    pub globals: Globals,
}

pub struct SortOptions {
    pub attribute: String,
    pub globals: Globals,
}

#[derive(Serialize)]
struct TaskListOutput {
    list: &'static str,
    sort: Option<SortAttribute>,
    contexts: Vec<String>,
    projects: Vec<String>,
    total: usize,
    tasks: Vec<TaskOutput>,
}

#[derive(Serialize)]
struct TagListOutput {
    total: usize,
    items: Vec<String>,
}

#[derive(Serialize)]
struct SortOutput {
    sort: SortAttribute,
    config: PathBuf,
}

struct TaskContext {
    service: TodoService<FileTaskRepository>,
    config: Config,
    files: TaskFiles,
}

fn load_context(globals: &Globals) -> Result<TaskContext> {
    let home = config::home_dir()?;
    let config = Config::load_from_home(&home);
    let files = config::discover_files(
        globals.todo.as_deref(),
        globals.done.as_deref(),
        &config,
        &home,
    )?;
    let repository = FileTaskRepository::new(&files.todo_file, &files.done_file)?;
    tracing::debug!(
        todo = %files.todo_file.display(),
        done = %files.done_file.display(),
        "opened task files"
    );
    Ok(TaskContext {
        service: TodoService::new(repository),
        config,
        files,
    })
}

pub fn run_add(options: AddOptions) -> Result<()> {
    // Reject bad input before the task files are touched
    let due = parse_due(options.due.as_deref())?;
    service::validate_description(&options.description)?;
    if let Some(priority) = options.priority.as_deref() {
        priority.parse::<Priority>()?;
    }

    let ctx = load_context(&options.globals)?;
    let task = ctx
        .service
        .create_task(&options.description, options.priority.as_deref(), due)?;

    let position = ctx.service.active_tasks()?.len();
    let output = TaskOutput::new(position, &task, today());

    let mut human = HumanOutput::new("Task added");
    push_task_summary(&mut human, &task);
    human.push_summary("File", ctx.files.todo_file.display().to_string());

    emit_success(options.globals.output(), "add", &output, Some(&human))
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(&options.globals)?;
    let mut warnings = Vec::new();
    let sort = match options.sort.as_deref() {
        Some(value) => Some(value.parse::<SortAttribute>()?),
        // A bad configured default should not block listing
        None => ctx.config.sort_attribute().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring configured sort");
            warnings.push(err.to_string());
            None
        }),
    };
    let filter = TaskFilter::new(options.contexts, options.projects);

    let tasks = if options.completed {
        ctx.service.completed_tasks()?
    } else {
        ctx.service.active_tasks()?
    };

    // Positions refer to file order, whatever the display order.
    let mut entries: Vec<(usize, Task)> = tasks
        .into_iter()
        .enumerate()
        .map(|(index, task)| (index + 1, task))
        .filter(|(_, task)| filter.matches(task))
        .collect();
    if let Some(attribute) = sort {
        entries.sort_by(|(_, left), (_, right)| view::compare_tasks(left, right, attribute));
    }

    let today = today();
    let output = TaskListOutput {
        list: if options.completed { "completed" } else { "active" },
        sort,
        contexts: filter.contexts().iter().cloned().collect(),
        projects: filter.projects().iter().cloned().collect(),
        total: entries.len(),
        tasks: entries
            .iter()
            .map(|(position, task)| TaskOutput::new(*position, task, today))
            .collect(),
    };

    let header = if options.completed {
        "Completed tasks"
    } else {
        "Tasks"
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("Total", entries.len().to_string());
    if let Some(attribute) = sort {
        human.push_summary("Sort", attribute.as_str());
    }
    if filter.is_active() {
        human.push_summary("Filter", describe_filter(&filter));
    }
    for (position, task) in &entries {
        human.push_detail(format_task_line(*position, task, today));
    }
    for warning in warnings {
        human.push_warning(warning);
    }
    if entries.is_empty() && !options.completed && !filter.is_active() {
        human.push_next_step("checkmate add \"...\"");
    }

    emit_success(options.globals.output(), "list", &output, Some(&human))
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let update = TaskUpdate {
        description: options.description,
        priority: if options.clear_priority {
            Some(None)
        } else {
            options.priority.map(Some)
        },
        due_date: if options.clear_due {
            Some(None)
        } else {
            parse_due(options.due.as_deref())?.map(Some)
        },
    };
    if update.description.is_none() && update.priority.is_none() && update.due_date.is_none() {
        return Err(Error::InvalidArgument(
            "nothing to change; pass --description, --priority or --due".to_string(),
        ));
    }

    let ctx = load_context(&options.globals)?;
    let (_, mut task) = resolve_task(ctx.service.active_tasks()?, &options.task)?;
    ctx.service.update_task(&mut task, update)?;

    // Saving moves the line to the end of the file
    let position = ctx.service.active_tasks()?.len();
    let output = TaskOutput::new(position, &task, today());
    let mut human = HumanOutput::new("Task updated");
    push_task_summary(&mut human, &task);

    emit_success(options.globals.output(), "edit", &output, Some(&human))
}

pub fn run_complete(options: TargetOptions) -> Result<()> {
    let ctx = load_context(&options.globals)?;
    let (_, mut task) = resolve_task(ctx.service.active_tasks()?, &options.task)?;
    ctx.service.complete_task(&mut task)?;

    let position = ctx.service.completed_tasks()?.len();
    let output = TaskOutput::new(position, &task, today());
    let mut human = HumanOutput::new("Task completed");
    push_task_summary(&mut human, &task);
    human.push_summary("File", ctx.files.done_file.display().to_string());

    emit_success(options.globals.output(), "complete", &output, Some(&human))
}

pub fn run_reopen(options: TargetOptions) -> Result<()> {
    let ctx = load_context(&options.globals)?;
    let (_, mut task) = resolve_task(ctx.service.completed_tasks()?, &options.task)?;
    ctx.service.reopen_task(&mut task)?;

    let position = ctx.service.active_tasks()?.len();
    let output = TaskOutput::new(position, &task, today());
    let mut human = HumanOutput::new("Task reopened");
    push_task_summary(&mut human, &task);
    human.push_summary("File", ctx.files.todo_file.display().to_string());

    emit_success(options.globals.output(), "reopen", &output, Some(&human))
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let ctx = load_context(&options.globals)?;
    let tasks = if options.completed {
        ctx.service.completed_tasks()?
    } else {
        ctx.service.active_tasks()?
    };
    let (position, task) = resolve_task(tasks, &options.task)?;
    ctx.service.delete_task(&task)?;

    let output = TaskOutput::new(position, &task, today());
    let mut human = HumanOutput::new("Task deleted");
    push_task_summary(&mut human, &task);

    emit_success(options.globals.output(), "rm", &output, Some(&human))
}

pub fn run_contexts(globals: Globals) -> Result<()> {
    let ctx = load_context(&globals)?;
    let items = ctx.service.unique_contexts()?;
    emit_tags(&globals, "contexts", "Contexts", '@', items)
}

pub fn run_projects(globals: Globals) -> Result<()> {
    let ctx = load_context(&globals)?;
    let items = ctx.service.unique_projects()?;
    emit_tags(&globals, "projects", "Projects", '+', items)
}

pub fn run_sort(options: SortOptions) -> Result<()> {
    let sort: SortAttribute = options.attribute.parse()?;
    let home = config::home_dir()?;
    config::save_config_value(&home, config::SORT_ATTRIBUTE_KEY, sort.as_str())?;

    let output = SortOutput {
        sort,
        config: config::config_path(&home),
    };
    let mut human = HumanOutput::new("Default sort saved");
    human.push_summary("Sort", sort.as_str());
    human.push_summary("Config", output.config.display().to_string());

    emit_success(options.globals.output(), "sort", &output, Some(&human))
}

fn emit_tags(
    globals: &Globals,
    command: &str,
    header: &str,
    marker: char,
    items: Vec<String>,
) -> Result<()> {
    let mut human = HumanOutput::new(header);
    human.push_summary("Total", items.len().to_string());
    for item in &items {
        human.push_detail(format!("{marker}{item}"));
    }

    let output = TagListOutput {
        total: items.len(),
        items,
    };
    emit_success(globals.output(), command, &output, Some(&human))
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    if let Some(id) = task.id() {
        human.push_summary("ID", id);
    }
    human.push_summary("Description", display_description(task));
    if let Some(priority) = task.priority {
        human.push_summary("Priority", priority.to_string());
    }
    if let Some(due) = task.due_date() {
        human.push_summary("Due", crate::task::format_date(due));
    }
}

fn describe_filter(filter: &TaskFilter) -> String {
    filter
        .contexts()
        .iter()
        .map(|context| format!("@{context}"))
        .chain(filter.projects().iter().map(|project| format!("+{project}")))
        .collect::<Vec<_>>()
        .join(" or ")
}

fn parse_due(value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|raw| {
            parse_date(raw.trim()).ok_or_else(|| {
                Error::Validation(format!("Due date must be YYYY-MM-DD, got '{raw}'"))
            })
        })
        .transpose()
}

/// Find a task by reference: an exact id, a 1-based position, or a unique
/// id prefix, tried in that order.
fn resolve_task(tasks: Vec<Task>, reference: &str) -> Result<(usize, Task)> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument(
            "task reference cannot be empty".to_string(),
        ));
    }
    let needle = trimmed.to_ascii_lowercase();

    let mut indexed: Vec<(usize, Task)> = tasks
        .into_iter()
        .enumerate()
        .map(|(index, task)| (index + 1, task))
        .collect();

    // Hand-written ids may be mixed case, so try the reference as typed first
    for exact in [trimmed, needle.as_str()] {
        if let Some(index) = indexed
            .iter()
            .position(|(_, task)| task.id() == Some(exact))
        {
            return Ok(indexed.swap_remove(index));
        }
    }

    if needle.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(position) = needle.parse::<usize>() {
            if position >= 1 && position <= indexed.len() {
                return Ok(indexed.swap_remove(position - 1));
            }
        }
    }

    let mut candidates: Vec<usize> = indexed
        .iter()
        .enumerate()
        .filter(|(_, (_, task))| task.id().is_some_and(|id| id.starts_with(&needle)))
        .map(|(index, _)| index)
        .collect();
    match candidates.len() {
        0 => Err(Error::TaskNotFound(trimmed.to_string())),
        1 => Ok(indexed.swap_remove(candidates.remove(0))),
        _ => {
            let ids: Vec<&str> = candidates
                .iter()
                .filter_map(|index| indexed[*index].1.id())
                .collect();
            Err(Error::InvalidArgument(format!(
                "ambiguous task id '{trimmed}': {}",
                ids.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    fn tasks() -> Vec<Task> {
        vec![
            codec::decode("First cmid:ab12cd34"),
            codec::decode("Second cmid:ab99zz00"),
            codec::decode("Legacy without id"),
            codec::decode("Digits cmid:12345678"),
        ]
    }

    #[test]
    fn resolve_by_exact_id() {
        let (position, task) = resolve_task(tasks(), "ab99zz00").expect("resolve");
        assert_eq!(position, 2);
        assert_eq!(task.id(), Some("ab99zz00"));

        // An all-digit id wins over a position
        let (position, _) = resolve_task(tasks(), "12345678").expect("resolve");
        assert_eq!(position, 4);
    }

    #[test]
    fn resolve_by_position() {
        let (position, task) = resolve_task(tasks(), "3").expect("resolve");
        assert_eq!(position, 3);
        assert_eq!(task.description(), "Legacy without id");
    }

    #[test]
    fn resolve_by_unique_prefix() {
        let (_, task) = resolve_task(tasks(), "AB1").expect("resolve");
        assert_eq!(task.id(), Some("ab12cd34"));

        // Out-of-range numbers fall back to prefix matching
        let (_, task) = resolve_task(tasks(), "1234").expect("resolve");
        assert_eq!(task.id(), Some("12345678"));
    }

    #[test]
    fn resolve_mixed_case_id_as_written() {
        let mut tasks = tasks();
        tasks.push(codec::decode("Hand written cmid:MiXed123"));

        let (position, task) = resolve_task(tasks.clone(), "MiXed123").expect("resolve");
        assert_eq!(position, 5);
        assert_eq!(task.id(), Some("MiXed123"));

        // Lowercase references still reach lowercase ids
        let (position, _) = resolve_task(tasks, "AB99ZZ00").expect("resolve");
        assert_eq!(position, 2);
    }

    #[test]
    fn resolve_rejects_ambiguous_and_unknown() {
        let err = resolve_task(tasks(), "ab").unwrap_err();
        assert!(err.to_string().contains("ambiguous task id 'ab'"));

        let err = resolve_task(tasks(), "zz").unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(ref reference) if reference == "zz"));

        assert!(matches!(
            resolve_task(tasks(), "  "),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn parse_due_validates_format() {
        assert_eq!(parse_due(None).expect("none"), None);
        assert_eq!(
            parse_due(Some("2024-05-01")).expect("date"),
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
        assert!(matches!(
            parse_due(Some("May 1st")),
            Err(Error::Validation(_))
        ));
    }
}
