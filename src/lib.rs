//! checkmate - todo.txt task persistence with stable identity
//!
//! Tasks are stored one per line in two todo.txt files: active tasks in the
//! todo file, completed tasks in the done file. Each task gets a short id in
//! its `cmid` attribute on first save, so it can be found again after its
//! text changes or it moves between the files.
//!
//! # Module Organization
//!
//! - `task`: the task record and its derived tags
//! - `codec`: todo.txt line decoding and encoding
//! - `file_store`: whole-line reads and atomic rewrites of one file
//! - `repository`: identity-preserving storage over the file pair
//! - `view`: filtering and sorting of task snapshots
//! - `service`: validated task use cases
//! - `config`: `~/.todo/config` loading and task file discovery
//! - `error`: error types, exit codes, and result aliases
//! - `output`: human and JSON output for the CLI
//! - `cli`: command-line interface using clap

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod file_store;
pub mod output;
pub mod repository;
pub mod service;
pub mod task;
pub mod view;

pub use error::{Error, Result};
