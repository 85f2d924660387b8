//! Whole-line access to one task file.
//!
//! Every mutation rewrites the whole file: the new content goes to a temp
//! file in the same directory which is then renamed over the target, so a
//! reader sees either the old file or the new one, never a truncated one.
//! Blank lines and stray surrounding whitespace are dropped on rewrite.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::codec;
use crate::error::IoFailure;
use crate::task::Task;

type IoResult<T> = std::result::Result<T, IoFailure>;

/// One non-blank line of a task file with its decoded task.
#[derive(Debug, Clone)]
pub struct StoredLine {
    pub raw: String,
    pub task: Task,
}

/// Create the file (and its parent directories) if it does not exist.
pub fn ensure_exists(path: &Path) -> IoResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| IoFailure::new(parent, err))?;
        }
    }

    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|err| IoFailure::new(path, err))?;
    Ok(())
}

/// Read every non-blank line and decode it.
pub fn load_lines(path: &Path) -> IoResult<Vec<StoredLine>> {
    let content = fs::read_to_string(path).map_err(|err| IoFailure::new(path, err))?;
    let lines = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut task = codec::decode(line);
            task.stored_text = Some(line.to_string());
            StoredLine {
                raw: line.to_string(),
                task,
            }
        })
        .collect();
    Ok(lines)
}

/// Drop every line matching `predicate`. The file is only rewritten when
/// something was removed.
pub fn remove_matching<F>(path: &Path, mut predicate: F) -> IoResult<usize>
where
    F: FnMut(&StoredLine) -> bool,
{
    let lines = load_lines(path)?;
    let before = lines.len();
    let kept: Vec<String> = lines
        .into_iter()
        .filter(|line| !predicate(line))
        .map(|line| line.raw)
        .collect();

    let removed = before - kept.len();
    if removed > 0 {
        write_lines(path, &kept)?;
        tracing::debug!(path = %path.display(), removed, "removed task lines");
    }
    Ok(removed)
}

/// Append one encoded line.
pub fn append(path: &Path, line: &str) -> IoResult<()> {
    let mut lines: Vec<String> = load_lines(path)?
        .into_iter()
        .map(|stored| stored.raw)
        .collect();
    lines.push(line.to_string());
    write_lines(path, &lines)?;
    tracing::debug!(path = %path.display(), total = lines.len(), "appended task line");
    Ok(())
}

/// Replace the file with `lines`, one per line, newline-terminated.
pub fn write_lines(path: &Path, lines: &[String]) -> IoResult<()> {
    let mut content = String::new();
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    write_atomic(path, content.as_bytes())
}

/// Write `data` to a temp file next to `path`, then rename it into place.
pub fn write_atomic(path: &Path, data: &[u8]) -> IoResult<()> {
    let temp_path = temp_path_for(path);

    let written = File::create(&temp_path).and_then(|mut file| {
        file.write_all(data)?;
        file.sync_all()
    });
    if let Err(err) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(IoFailure::new(path, err));
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(IoFailure::new(path, err));
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp.{}", file_name, std::process::id()))
}
