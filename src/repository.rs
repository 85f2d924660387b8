//! Task repository over the active/completed file pair.
//!
//! Identity: the first save of a task assigns a short id stored in the
//! `cmid` attribute. Later saves find the stored copy by that id in either
//! file, remove it, and append the fresh line to the file matching the
//! task's completion state. Lines written before ids existed are matched by
//! their exact text instead.
//!
//! Saves are not transactional across the two files. If the removal step
//! succeeds and the append fails, the task is missing from both files until
//! the save is retried; the failure is reported, never masked.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ulid::Ulid;

use crate::codec;
use crate::error::{Error, IoFailure, RepositoryError, RepositoryOperation, Result};
use crate::file_store::{self, StoredLine};
use crate::task::Task;

/// Length of generated task ids.
pub const ID_LEN: usize = 8;

/// Storage interface consumed by the service layer.
pub trait TaskRepository {
    /// Tasks in the active file, in file order.
    fn load_active(&self) -> std::result::Result<Vec<Task>, RepositoryError>;

    /// Tasks in the completed file, in file order.
    fn load_completed(&self) -> std::result::Result<Vec<Task>, RepositoryError>;

    /// Create or update `task`, assigning an id on first save.
    fn save(&self, task: &mut Task) -> std::result::Result<(), RepositoryError>;

    /// Remove `task` from whichever file holds it. Missing tasks are a no-op.
    fn delete(&self, task: &Task) -> std::result::Result<(), RepositoryError>;
}

/// Repository backed by a todo file and a done file.
#[derive(Debug, Clone)]
pub struct FileTaskRepository {
    todo_file: PathBuf,
    done_file: PathBuf,
}

impl FileTaskRepository {
    /// Open the repository, creating both files if they are missing.
    pub fn new(todo_file: impl Into<PathBuf>, done_file: impl Into<PathBuf>) -> Result<Self> {
        let todo_file = todo_file.into();
        let done_file = done_file.into();
        if todo_file == done_file {
            return Err(Error::InvalidConfig(format!(
                "todo and done files must be distinct: {}",
                todo_file.display()
            )));
        }

        for path in [&todo_file, &done_file] {
            file_store::ensure_exists(path)
                .map_err(|err| RepositoryError::new(RepositoryOperation::Open, err))?;
        }

        Ok(Self {
            todo_file,
            done_file,
        })
    }

    pub fn todo_file(&self) -> &Path {
        &self.todo_file
    }

    pub fn done_file(&self) -> &Path {
        &self.done_file
    }

    fn files(&self) -> [&Path; 2] {
        [&self.todo_file, &self.done_file]
    }

    fn target_file(&self, task: &Task) -> &Path {
        if task.is_completed() {
            &self.done_file
        } else {
            &self.todo_file
        }
    }

    fn load(&self, path: &Path) -> std::result::Result<Vec<Task>, IoFailure> {
        Ok(file_store::load_lines(path)?
            .into_iter()
            .map(|line| line.task)
            .collect())
    }

    /// Generate an id not used by any line in either file.
    fn generate_id(&self) -> std::result::Result<String, IoFailure> {
        let mut existing = HashSet::new();
        for path in self.files() {
            for line in file_store::load_lines(path)? {
                if let Some(id) = line.task.id() {
                    existing.insert(id.to_string());
                }
            }
        }

        loop {
            let candidate = short_id(&Ulid::new());
            if !existing.contains(&candidate) {
                return Ok(candidate);
            }
        }
    }

    /// Remove the stored copy of `task` from both files: by id, or by last
    /// known text when no line carries the id.
    fn remove_stored(&self, task: &Task) -> std::result::Result<usize, IoFailure> {
        let mut removed = 0;
        if let Some(id) = task.id() {
            let matches_id = |line: &StoredLine| line.task.id() == Some(id);
            for path in self.files() {
                removed += file_store::remove_matching(path, matches_id)?;
            }
        }

        if removed == 0 {
            if let Some(previous) = task.stored_text() {
                let matches_text = |line: &StoredLine| line.raw == previous;
                for path in self.files() {
                    removed += file_store::remove_matching(path, matches_text)?;
                }
            }
        }
        Ok(removed)
    }
}

impl TaskRepository for FileTaskRepository {
    fn load_active(&self) -> std::result::Result<Vec<Task>, RepositoryError> {
        self.load(&self.todo_file)
            .map_err(|err| RepositoryError::new(RepositoryOperation::LoadActive, err))
    }

    fn load_completed(&self) -> std::result::Result<Vec<Task>, RepositoryError> {
        self.load(&self.done_file)
            .map_err(|err| RepositoryError::new(RepositoryOperation::LoadCompleted, err))
    }

    fn save(&self, task: &mut Task) -> std::result::Result<(), RepositoryError> {
        let wrap = |err| RepositoryError::new(RepositoryOperation::Save, err);

        if task.id().is_none() {
            let id = self.generate_id().map_err(wrap)?;
            tracing::debug!(id = %id, "assigned task id");
            task.assign_id(id);
        }

        let line = codec::encode(task);
        let removed = self.remove_stored(task).map_err(wrap)?;
        let target = self.target_file(task);
        file_store::append(target, &line).map_err(wrap)?;
        tracing::debug!(
            id = task.id().unwrap_or_default(),
            replaced = removed,
            file = %target.display(),
            "saved task"
        );

        task.stored_text = Some(line);
        Ok(())
    }

    fn delete(&self, task: &Task) -> std::result::Result<(), RepositoryError> {
        let removed = self
            .remove_stored(task)
            .map_err(|err| RepositoryError::new(RepositoryOperation::Delete, err))?;
        tracing::debug!(id = task.id().unwrap_or_default(), removed, "deleted task");
        Ok(())
    }
}

/// Lowercase tail of a ULID: the random component, which makes ids created
/// in the same millisecond distinct.
fn short_id(ulid: &Ulid) -> String {
    let text = ulid.to_string().to_ascii_lowercase();
    text[text.len() - ID_LEN..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileTaskRepository) {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FileTaskRepository::new(dir.path().join("todo.txt"), dir.path().join("done.txt"))
            .expect("repo");
        (dir, repo)
    }

    #[test]
    fn new_creates_both_files() {
        let (dir, repo) = setup();
        assert!(dir.path().join("todo.txt").is_file());
        assert!(dir.path().join("done.txt").is_file());
        assert_eq!(repo.todo_file(), dir.path().join("todo.txt"));
    }

    #[test]
    fn new_rejects_same_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.txt");
        let err = FileTaskRepository::new(&path, &path).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(ref msg) if msg.contains("distinct")));
    }

    #[test]
    fn new_reports_uncreatable_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("readonly");
        fs::write(&blocker, "").expect("write blocker");

        let err = FileTaskRepository::new(blocker.join("todo.txt"), blocker.join("done.txt"))
            .unwrap_err();
        match err {
            Error::Repository(err) => assert_eq!(err.operation, RepositoryOperation::Open),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn save_generates_id_and_persists_it() {
        let (dir, repo) = setup();
        let mut task = Task::new("Test task");
        repo.save(&mut task).expect("save");

        let id = task.id().expect("id").to_string();
        assert_eq!(id.len(), ID_LEN);
        let content = fs::read_to_string(dir.path().join("todo.txt")).expect("read");
        assert_eq!(content, format!("Test task cmid:{id}\n"));
        assert_eq!(task.stored_text(), Some(content.trim_end()));
    }

    #[test]
    fn generated_ids_are_unique() {
        let (_dir, repo) = setup();
        let mut ids = HashSet::new();
        for n in 0..20 {
            let mut task = Task::new(format!("Task {n}"));
            repo.save(&mut task).expect("save");
            assert!(ids.insert(task.id().expect("id").to_string()));
        }
    }

    #[test]
    fn legacy_line_is_replaced_by_text_match() {
        let (dir, repo) = setup();
        let todo = dir.path().join("todo.txt");
        fs::write(&todo, "Old task @home\nOther task\n").expect("write");

        let mut task = repo
            .load_active()
            .expect("load")
            .into_iter()
            .next()
            .expect("task");
        assert_eq!(task.id(), None);
        task.set_description("Old task @work");
        repo.save(&mut task).expect("save");

        let lines = file_store::load_lines(&todo).expect("lines");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].raw, "Other task");
        let id = task.id().expect("id");
        assert_eq!(lines[1].task.description(), format!("Old task @work cmid:{id}"));
        assert_eq!(lines[1].task.id(), Some(id));
    }

    #[test]
    fn save_by_id_ignores_stale_text() {
        let (dir, repo) = setup();
        let mut task = Task::new("First");
        repo.save(&mut task).expect("save");

        // Hand-edit the stored line; the id still finds it.
        let id = task.id().expect("id").to_string();
        fs::write(dir.path().join("todo.txt"), format!("(B) Edited cmid:{id}\n")).expect("write");
        task.set_description("Second");
        repo.save(&mut task).expect("save");

        let active = repo.load_active().expect("load");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].description(), format!("Second cmid:{id}"));
    }

    #[test]
    fn delete_without_id_uses_stored_text() {
        let (dir, repo) = setup();
        fs::write(dir.path().join("todo.txt"), "Legacy\nKeep\n").expect("write");
        let task = repo.load_active().expect("load").remove(0);

        repo.delete(&task).expect("delete");
        let remaining = repo.load_active().expect("load");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].description(), "Keep");
    }

    #[test]
    fn delete_of_unsaved_task_is_noop() {
        let (_dir, repo) = setup();
        let mut saved = Task::new("Saved");
        repo.save(&mut saved).expect("save");

        repo.delete(&Task::new("Never saved")).expect("delete");
        assert_eq!(repo.load_active().expect("load").len(), 1);
    }

    #[test]
    fn load_failure_names_operation() {
        let (dir, repo) = setup();
        let done = dir.path().join("done.txt");
        fs::remove_file(&done).expect("remove");
        fs::create_dir(&done).expect("mkdir");

        let err = repo.load_completed().unwrap_err();
        assert_eq!(err.operation, RepositoryOperation::LoadCompleted);
        assert_eq!(err.path(), done);
    }

    #[test]
    fn short_id_uses_random_tail() {
        let ulid = Ulid::from_string("01ARZ3NDEKTSV4RRFFQ69G5FAV").expect("ulid");
        assert_eq!(short_id(&ulid), "q69g5fav");
    }
}
