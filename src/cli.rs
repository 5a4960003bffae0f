use crate::calendar::Granularity;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "taskgrid", version, about = "Terminal task organizer with a calendar timeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a project task store in the current directory
    Init {
        /// Optional store name
        #[arg(long)]
        name: Option<String>,
    },
    /// List tasks, pending first
    List {
        /// Only pending tasks
        #[arg(long, conflicts_with = "completed")]
        pending: bool,
        /// Only completed tasks
        #[arg(long)]
        completed: bool,
    },
    /// Add a new task
    Add {
        /// Title of the task
        title: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Edit an existing task
    Edit {
        /// Task id to edit
        id: u32,
        /// New title
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
        /// Clear the start date
        #[arg(long, conflicts_with = "start")]
        clear_start: bool,
        /// Clear the category
        #[arg(long, conflicts_with = "category")]
        clear_category: bool,
    },
    /// Mark a task as completed
    Done {
        /// Task id
        id: u32,
        /// Mark as pending again
        #[arg(long)]
        undo: bool,
    },
    /// Delete a task
    Delete {
        /// Task id
        id: u32,
    },
    /// Assign start dates to open tasks
    Optimize,
    /// Print the calendar grid
    Calendar {
        /// Grid granularity
        #[arg(long, value_enum)]
        view: Option<Granularity>,
        /// Focused date in YYYY-MM-DD format (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Show completion statistics
    Stats {
        /// Write the pie chart as an SVG file
        #[arg(long)]
        svg: Option<std::path::PathBuf>,
    },
    /// Launch the interactive TUI
    Tui,
}

#[derive(Args, Debug, Default)]
pub struct TaskFields {
    /// Deadline in YYYY-MM-DD format
    #[arg(long)]
    pub deadline: Option<String>,
    /// Priority from 1 (lowest) to 5 (highest)
    #[arg(long, short = 'p')]
    pub priority: Option<String>,
    /// Estimated hours
    #[arg(long)]
    pub hours: Option<String>,
    /// Estimated minutes
    #[arg(long)]
    pub minutes: Option<String>,
    /// Start date in YYYY-MM-DD format
    #[arg(long)]
    pub start: Option<String>,
    /// Free-text category
    #[arg(long)]
    pub category: Option<String>,
}
