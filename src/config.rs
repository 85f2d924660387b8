//! Configuration loading and task file discovery
//!
//! Configuration lives in `~/.todo/config` as `KEY=VALUE` lines, the same
//! format todo.sh uses. Recognized keys:
//!
//! - `TODO_FILE`: path of the active task file
//! - `DONE_FILE`: path of the completed task file
//! - `SORT_ATTRIBUTE`: default sort for `checkmate list`

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, IoFailure, Result};
use crate::file_store;
use crate::view::SortAttribute;

/// Config directory inside the home directory
pub const CONFIG_DIR: &str = ".todo";

/// Config file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config";

pub const TODO_FILE_KEY: &str = "TODO_FILE";
pub const DONE_FILE_KEY: &str = "DONE_FILE";
pub const SORT_ATTRIBUTE_KEY: &str = "SORT_ATTRIBUTE";

/// Default task file names inside the home directory
pub const DEFAULT_TODO_FILE: &str = "todo.txt";
pub const DEFAULT_DONE_FILE: &str = "done.txt";

/// Parsed `KEY=VALUE` configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    values: BTreeMap<String, String>,
}

impl Config {
    /// Parse config text.
    ///
    /// Blank lines, `#` comments, and lines without `=` are ignored. Lines
    /// are split on the first `=`; the key is trimmed, the value is kept as
    /// written. Later entries win.
    pub fn parse(content: &str) -> Self {
        let mut values = BTreeMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            values.insert(key.trim().to_string(), value.to_string());
        }
        Self { values }
    }

    /// Load a config file. A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(Error::Io(IoFailure::new(path, err))),
        }
    }

    /// Load `~/.todo/config`, falling back to an empty config when the file
    /// is missing or unreadable.
    pub fn load_from_home(home: &Path) -> Self {
        let path = config_path(home);
        match Self::load(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "ignoring unreadable config"
                );
                Self::default()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn todo_file(&self) -> Option<PathBuf> {
        self.path_value(TODO_FILE_KEY)
    }

    pub fn done_file(&self) -> Option<PathBuf> {
        self.path_value(DONE_FILE_KEY)
    }

    /// Configured default sort, if any.
    pub fn sort_attribute(&self) -> Result<Option<SortAttribute>> {
        match self.get(SORT_ATTRIBUTE_KEY).map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|_| {
                Error::InvalidConfig(format!(
                    "{SORT_ATTRIBUTE_KEY}: unknown sort attribute '{value}'"
                ))
            }),
        }
    }

    fn path_value(&self, key: &str) -> Option<PathBuf> {
        self.get(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }
}

/// Path of the config file for `home`
pub fn config_path(home: &Path) -> PathBuf {
    home.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// The current user's home directory
pub fn home_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| Error::InvalidConfig("could not determine home directory".to_string()))
}

/// Resolved locations of the two task files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFiles {
    pub todo_file: PathBuf,
    pub done_file: PathBuf,
}

/// Pick the task files: command line, then config, then `<home>/todo.txt`
/// and `<home>/done.txt`. Results are absolute with symlinks resolved.
/// The files do not have to exist yet.
pub fn discover_files(
    cli_todo: Option<&Path>,
    cli_done: Option<&Path>,
    config: &Config,
    home: &Path,
) -> Result<TaskFiles> {
    let todo_file = cli_todo
        .map(Path::to_path_buf)
        .or_else(|| config.todo_file())
        .unwrap_or_else(|| home.join(DEFAULT_TODO_FILE));
    let done_file = cli_done
        .map(Path::to_path_buf)
        .or_else(|| config.done_file())
        .unwrap_or_else(|| home.join(DEFAULT_DONE_FILE));

    Ok(TaskFiles {
        todo_file: resolve_path(&todo_file).map_err(|err| IoFailure::new(&todo_file, err))?,
        done_file: resolve_path(&done_file).map_err(|err| IoFailure::new(&done_file, err))?,
    })
}

/// Make `path` absolute and resolve symlinks in its longest existing prefix.
pub fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            let mut resolved = canonical;
            for name in missing.iter().rev() {
                resolved.push(name);
            }
            return Ok(resolved);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(absolute),
        }
    }
}

/// Set `key` in `~/.todo/config`.
///
/// An existing entry is replaced in place; otherwise the entry is appended.
/// Comments, blank lines, and other keys are kept.
pub fn save_config_value(home: &Path, key: &str, value: &str) -> Result<()> {
    if key.trim().is_empty() || key.contains('=') || key.contains('\n') {
        return Err(Error::InvalidArgument(format!("invalid config key '{key}'")));
    }
    if value.contains('\n') {
        return Err(Error::InvalidArgument(format!(
            "config value for {key} cannot span lines"
        )));
    }

    let path = config_path(home);
    let existing = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(Error::Io(IoFailure::new(&path, err))),
    };

    let entry = format!("{key}={value}");
    let mut replaced = false;
    let mut lines: Vec<String> = existing
        .lines()
        .map(|line| {
            if entry_key(line) == Some(key) {
                replaced = true;
                entry.clone()
            } else {
                line.to_string()
            }
        })
        .collect();
    if !replaced {
        lines.push(entry);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| IoFailure::new(parent, err))?;
    }
    file_store::write_lines(&path, &lines)?;
    tracing::debug!(path = %path.display(), key, replaced, "saved config value");
    Ok(())
}

fn entry_key(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.starts_with('#') {
        return None;
    }
    trimmed.split_once('=').map(|(key, _)| key.trim())
}
