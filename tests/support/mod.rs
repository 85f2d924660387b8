#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use checkmate::repository::FileTaskRepository;
use checkmate::service::TodoService;
use tempfile::TempDir;

/// A temporary home directory holding a todo/done file pair.
pub struct TestFiles {
    dir: TempDir,
}

impl TestFiles {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn home(&self) -> &Path {
        self.dir.path()
    }

    pub fn todo_path(&self) -> PathBuf {
        self.dir.path().join("todo.txt")
    }

    pub fn done_path(&self) -> PathBuf {
        self.dir.path().join("done.txt")
    }

    pub fn repository(&self) -> FileTaskRepository {
        FileTaskRepository::new(self.todo_path(), self.done_path()).expect("repository")
    }

    pub fn service(&self) -> TodoService<FileTaskRepository> {
        TodoService::new(self.repository())
    }

    pub fn write_todo(&self, contents: &str) {
        fs::write(self.todo_path(), contents).expect("write todo file");
    }

    pub fn write_done(&self, contents: &str) {
        fs::write(self.done_path(), contents).expect("write done file");
    }

    pub fn todo_lines(&self) -> Vec<String> {
        read_lines(&self.todo_path())
    }

    pub fn done_lines(&self) -> Vec<String> {
        read_lines(&self.done_path())
    }

    /// Replace `path` with a directory so every read or rewrite fails.
    pub fn break_file(&self, path: &Path) {
        if path.exists() {
            fs::remove_file(path).expect("remove file");
        }
        fs::create_dir_all(path).expect("create blocking dir");
    }
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("read file")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// `checkmate` with HOME pointed at the fixture and explicit file flags.
pub fn checkmate_cmd(files: &TestFiles) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("checkmate").expect("binary");
    cmd.env("HOME", files.home())
        .env_remove("CHECKMATE_TODO_FILE")
        .env_remove("CHECKMATE_DONE_FILE")
        .env_remove("RUST_LOG")
        .current_dir(files.home())
        .arg("--todo")
        .arg(files.todo_path())
        .arg("--done")
        .arg(files.done_path());
    cmd
}
