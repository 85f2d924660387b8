//! Task use cases on top of a [`TaskRepository`].
//!
//! The service validates caller input before any I/O, applies the change to
//! the task record, then saves it. Repository failures come back as
//! [`Error::TaskOperation`] naming the use case.

use chrono::NaiveDate;

use crate::error::{Error, RepositoryError, Result};
use crate::repository::TaskRepository;
use crate::task::{has_attribute_token, today, Priority, Task, ID_KEY};
use crate::view;

/// Changes to apply to an existing task. `None` leaves a field alone;
/// `Some(None)` clears priority or due date.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub description: Option<String>,
    pub priority: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
}

pub struct TodoService<R> {
    repository: R,
}

impl<R: TaskRepository> TodoService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn active_tasks(&self) -> Result<Vec<Task>> {
        self.repository
            .load_active()
            .map_err(wrap("retrieve active tasks"))
    }

    pub fn completed_tasks(&self) -> Result<Vec<Task>> {
        self.repository
            .load_completed()
            .map_err(wrap("retrieve completed tasks"))
    }

    pub fn create_task(
        &self,
        description: &str,
        priority: Option<&str>,
        due_date: Option<NaiveDate>,
    ) -> Result<Task> {
        validate_description(description)?;
        let priority = priority.map(parse_priority).transpose()?;

        let mut task = Task::new(description.trim());
        task.priority = priority;
        task.creation_date = Some(today());
        task.set_due_date(due_date);

        self.repository
            .save(&mut task)
            .map_err(wrap("create task"))?;
        Ok(task)
    }

    pub fn update_task(&self, task: &mut Task, update: TaskUpdate) -> Result<()> {
        if let Some(description) = &update.description {
            validate_description(description)?;
        }
        // An empty priority clears it, matching `Some(None)`.
        let priority = match update.priority {
            Some(Some(value)) if value.trim().is_empty() => Some(None),
            Some(Some(value)) => Some(Some(parse_priority(&value)?)),
            Some(None) => Some(None),
            None => None,
        };

        if let Some(description) = update.description {
            task.set_description(description.trim());
        }
        if let Some(priority) = priority {
            task.priority = priority;
        }
        if let Some(due_date) = update.due_date {
            task.set_due_date(due_date);
        }

        self.repository.save(task).map_err(wrap("update task"))
    }

    pub fn complete_task(&self, task: &mut Task) -> Result<()> {
        task.complete();
        self.repository.save(task).map_err(wrap("complete task"))
    }

    pub fn reopen_task(&self, task: &mut Task) -> Result<()> {
        task.reopen();
        self.repository.save(task).map_err(wrap("reopen task"))
    }

    pub fn delete_task(&self, task: &Task) -> Result<()> {
        self.repository.delete(task).map_err(wrap("delete task"))
    }

    /// Sorted unique contexts of active tasks.
    pub fn unique_contexts(&self) -> Result<Vec<String>> {
        Ok(view::unique_contexts(&self.active_tasks()?))
    }

    /// Sorted unique projects of active tasks.
    pub fn unique_projects(&self) -> Result<Vec<String>> {
        Ok(view::unique_projects(&self.active_tasks()?))
    }
}

fn wrap(action: &'static str) -> impl Fn(RepositoryError) -> Error {
    move |source| Error::TaskOperation { action, source }
}

/// Check a description before it reaches the store: it must have text and no
/// `cmid:` token of its own.
pub fn validate_description(description: &str) -> Result<()> {
    if description.trim().is_empty() {
        return Err(Error::Validation(
            "Task description cannot be empty".to_string(),
        ));
    }
    if has_attribute_token(description, ID_KEY) {
        return Err(Error::Validation(format!(
            "Task description cannot contain a '{ID_KEY}:' attribute; it is reserved for task identity"
        )));
    }
    Ok(())
}

fn parse_priority(value: &str) -> Result<Priority> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::error::{IoFailure, RepositoryOperation};

    /// In-memory repository that can be told to fail.
    #[derive(Default)]
    struct MemoryRepository {
        saved: RefCell<Vec<Task>>,
        fail: bool,
    }

    impl MemoryRepository {
        fn failure(operation: RepositoryOperation) -> RepositoryError {
            RepositoryError::new(
                operation,
                IoFailure::new(
                    "memory",
                    std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"),
                ),
            )
        }
    }

    impl TaskRepository for MemoryRepository {
        fn load_active(&self) -> std::result::Result<Vec<Task>, RepositoryError> {
            if self.fail {
                return Err(Self::failure(RepositoryOperation::LoadActive));
            }
            Ok(self
                .saved
                .borrow()
                .iter()
                .filter(|task| !task.is_completed())
                .cloned()
                .collect())
        }

        fn load_completed(&self) -> std::result::Result<Vec<Task>, RepositoryError> {
            Ok(self
                .saved
                .borrow()
                .iter()
                .filter(|task| task.is_completed())
                .cloned()
                .collect())
        }

        fn save(&self, task: &mut Task) -> std::result::Result<(), RepositoryError> {
            if self.fail {
                return Err(Self::failure(RepositoryOperation::Save));
            }
            let mut saved = self.saved.borrow_mut();
            saved.retain(|existing| existing.description() != task.description());
            saved.push(task.clone());
            Ok(())
        }

        fn delete(&self, task: &Task) -> std::result::Result<(), RepositoryError> {
            self.saved
                .borrow_mut()
                .retain(|existing| existing.description() != task.description());
            Ok(())
        }
    }

    fn service() -> TodoService<MemoryRepository> {
        TodoService::new(MemoryRepository::default())
    }

    #[test]
    fn create_sets_creation_date_and_fields() {
        let service = service();
        let due = NaiveDate::from_ymd_opt(2025, 12, 31).expect("date");
        let task = service
            .create_task("Buy milk", Some("a"), Some(due))
            .expect("create");

        assert_eq!(task.creation_date, Some(today()));
        assert_eq!(task.priority.map(|p| p.letter()), Some('A'));
        assert_eq!(task.due_date(), Some(due));
        assert_eq!(service.active_tasks().expect("active").len(), 1);
    }

    #[test]
    fn create_rejects_blank_description_before_saving() {
        let service = service();
        for description in ["", "   "] {
            let err = service.create_task(description, None, None).unwrap_err();
            assert_eq!(err.to_string(), "Task description cannot be empty");
        }
        assert!(service.repository().saved.borrow().is_empty());
    }

    #[test]
    fn identity_attribute_in_text_is_rejected() {
        let service = service();
        let err = service
            .create_task("Pay rent cmid:abc", None, None)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(service.repository().saved.borrow().is_empty());

        let mut task = service.create_task("Pay rent", None, None).expect("create");
        let err = service
            .update_task(
                &mut task,
                TaskUpdate {
                    description: Some("Pay rent cmid:abc".to_string()),
                    ..TaskUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(task.description(), "Pay rent");
    }

    #[test]
    fn explicit_due_date_wins_over_inline_token() {
        let service = service();
        let explicit = NaiveDate::from_ymd_opt(2025, 2, 2).expect("date");
        let task = service
            .create_task("Pay rent due:2025-01-01 at 10:30", None, Some(explicit))
            .expect("create");

        assert_eq!(task.description(), "Pay rent due:2025-02-02 at 10:30");
        assert_eq!(task.due_date(), Some(explicit));
    }

    #[test]
    fn create_rejects_bad_priority() {
        let service = service();
        for priority in ["AB", "1", "?"] {
            let err = service
                .create_task("Invalid priority", Some(priority), None)
                .unwrap_err();
            assert!(err
                .to_string()
                .contains("Priority must be a single uppercase letter"));
        }
    }

    #[test]
    fn update_validates_before_mutating() {
        let service = service();
        let mut task = service.create_task("Valid", None, None).expect("create");

        let err = service
            .update_task(
                &mut task,
                TaskUpdate {
                    description: Some("Changed".to_string()),
                    priority: Some(Some("AB".to_string())),
                    ..TaskUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(task.description(), "Valid");
    }

    #[test]
    fn update_clears_priority_and_due() {
        let service = service();
        let due = NaiveDate::from_ymd_opt(2025, 1, 1).expect("date");
        let mut task = service
            .create_task("Task @home", Some("B"), Some(due))
            .expect("create");

        service
            .update_task(
                &mut task,
                TaskUpdate {
                    description: Some("Task @work".to_string()),
                    priority: Some(Some(String::new())),
                    due_date: Some(None),
                },
            )
            .expect("update");

        assert_eq!(task.priority, None);
        assert_eq!(task.due_date(), None);
        assert_eq!(task.contexts(), ["work"]);
    }

    #[test]
    fn repository_failures_name_the_use_case() {
        let service = TodoService::new(MemoryRepository {
            fail: true,
            ..MemoryRepository::default()
        });

        let err = service.create_task("Buy milk", None, None).unwrap_err();
        assert!(matches!(err, Error::TaskOperation { action: "create task", .. }));
        assert!(err.to_string().starts_with("Failed to create task: could not save task"));

        let err = service.unique_contexts().unwrap_err();
        assert!(matches!(
            err,
            Error::TaskOperation {
                action: "retrieve active tasks",
                ..
            }
        ));
    }

    #[test]
    fn complete_and_reopen_move_between_lists() {
        let service = service();
        let mut task = service.create_task("Buy milk", None, None).expect("create");

        service.complete_task(&mut task).expect("complete");
        assert!(service.active_tasks().expect("active").is_empty());
        assert_eq!(service.completed_tasks().expect("completed").len(), 1);

        service.reopen_task(&mut task).expect("reopen");
        assert_eq!(service.active_tasks().expect("active").len(), 1);
        assert_eq!(task.completion_date(), None);
    }

    #[test]
    fn unique_tags_exclude_completed_tasks() {
        let service = service();
        let mut done = service
            .create_task("Task @home @work +backend", None, None)
            .expect("create");
        service.create_task("Task @phone +mobile", None, None).expect("create");
        service.complete_task(&mut done).expect("complete");

        assert_eq!(service.unique_contexts().expect("contexts"), ["phone"]);
        assert_eq!(service.unique_projects().expect("projects"), ["mobile"]);
    }
}
