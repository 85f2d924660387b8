//! Command-line interface for checkmate
//!
//! This module defines the CLI structure using clap derive macros. Command
//! implementations live in [`task`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

mod task;

/// checkmate - todo.txt task lists with stable task identity
///
/// Tasks live in two plain-text todo.txt files, one for active tasks and one
/// for completed tasks. Every saved task gets a short `cmid` id that follows
/// it across edits and between the two files.
#[derive(Parser, Debug)]
#[command(name = "checkmate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Active task file (overrides TODO_FILE in ~/.todo/config)
    #[arg(long, global = true, env = "CHECKMATE_TODO_FILE")]
    pub todo: Option<PathBuf>,

    /// Completed task file (overrides DONE_FILE in ~/.todo/config)
    #[arg(long, global = true, env = "CHECKMATE_DONE_FILE")]
    pub done: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a new task
    Add {
        /// Task description; may contain +project, @context and key:value tags
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,

        /// Priority letter A-Z
        #[arg(long, short = 'p')]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// List tasks
    List {
        /// List completed tasks instead of active ones
        #[arg(long)]
        completed: bool,

        /// Sort by priority, context, project, due or created
        #[arg(long)]
        sort: Option<String>,

        /// Only tasks with this context (repeatable, any match)
        #[arg(long = "context", short = 'c')]
        contexts: Vec<String>,

        /// Only tasks with this project (repeatable, any match)
        #[arg(long = "project", short = 'p')]
        projects: Vec<String>,
    },

    /// Edit an active task
    Edit {
        /// Task id, id prefix, or list position
        task: String,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New priority letter A-Z
        #[arg(long, conflicts_with = "clear_priority")]
        priority: Option<String>,

        /// Remove the priority
        #[arg(long)]
        clear_priority: bool,

        /// New due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },

    /// Mark an active task completed
    Complete {
        /// Task id, id prefix, or position in the active list
        task: String,
    },

    /// Move a completed task back to the active list
    Reopen {
        /// Task id, id prefix, or position in the completed list
        task: String,
    },

    /// Delete a task
    Rm {
        /// Task id, id prefix, or list position
        task: String,

        /// Resolve positions against the completed list
        #[arg(long)]
        completed: bool,
    },

    /// List contexts used by active tasks
    Contexts,

    /// List projects used by active tasks
    Projects,

    /// Set the default sort for `list`
    Sort {
        /// priority, context, project, due or created
        attribute: String,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let globals = task::Globals {
            todo: self.todo,
            done: self.done,
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Add {
                description,
                priority,
                due,
            } => task::run_add(task::AddOptions {
                description: description.join(" "),
                priority,
                due,
                globals,
            }),
            Commands::List {
                completed,
                sort,
                contexts,
                projects,
            } => task::run_list(task::ListOptions {
                completed,
                sort,
                contexts,
                projects,
                globals,
            }),
            Commands::Edit {
                task,
                description,
                priority,
                clear_priority,
                due,
                clear_due,
            } => task::run_edit(task::EditOptions {
                task,
                description,
                priority,
                clear_priority,
                due,
                clear_due,
                globals,
            }),
            Commands::Complete { task } => {
                task::run_complete(task::TargetOptions { task, globals })
            }
            Commands::Reopen { task } => task::run_reopen(task::TargetOptions { task, globals }),
            Commands::Rm { task, completed } => task::run_rm(task::RmOptions {
                task,
                completed,
                globals,
            }),
            Commands::Contexts => task::run_contexts(globals),
            Commands::Projects => task::run_projects(globals),
            Commands::Sort { attribute } => task::run_sort(task::SortOptions { attribute, globals }),
        }
    }
}
