use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "tock")]
#[command(about = "Track time offline and reconcile with your tock server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Work offline: never contact the server
    #[arg(long, global = true)]
    pub offline: bool,

    /// Skip the automatic sync after local changes
    #[arg(long, global = true)]
    pub no_sync: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage projects
    #[command(alias = "projects")]
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage tasks
    #[command(alias = "tasks")]
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Start, stop and inspect the running timer
    Timer {
        #[command(subcommand)]
        command: TimerCommands,
    },
    /// Manage recorded time entries
    #[command(alias = "logs")]
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Summarize tracked time
    Report {
        /// Range start (RFC 3339, `YYYY-MM-DD[ HH:MM]` or `now`); defaults to today
        #[arg(long, value_name = "TIME")]
        from: Option<String>,
        /// Range end, inclusive; defaults to now
        #[arg(long, value_name = "TIME")]
        to: Option<String>,
        /// Grouping of the totals
        #[arg(long, value_enum, default_value_t = ReportGroup::Project)]
        group_by: ReportGroup,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reconcile the local replica with the server
    Sync {
        /// Only push local changes
        #[arg(long, conflicts_with = "pull_only")]
        push_only: bool,
        /// Only pull remote changes
        #[arg(long)]
        pull_only: bool,
    },
    /// Show or change client configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a project
    #[command(alias = "new")]
    Add {
        name: String,
        #[arg(long)]
        subtitle: Option<String>,
        /// Display color as `#rrggbb`
        #[arg(long)]
        color: Option<String>,
    },
    /// List projects
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a project's name, subtitle or color
    Edit {
        /// Project ID or unique ID prefix
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        subtitle: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a project with its tasks and entries
    Delete {
        /// Project ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create a task under a project
    #[command(alias = "new")]
    Add {
        /// Project ID or unique ID prefix
        project: String,
        name: String,
    },
    /// List tasks
    List {
        /// Only tasks of this project
        #[arg(long, value_name = "PROJECT")]
        project: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a task
    Rename {
        /// Task ID or unique ID prefix
        id: String,
        name: String,
    },
    /// Delete a task with its entries
    Delete {
        /// Task ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum TimerCommands {
    /// Start timing a task, replacing any running timer
    Start {
        /// Task ID or unique ID prefix
        task: String,
    },
    /// Stop the timer and record the entry on the server
    Stop,
    /// Show the running timer
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move the running timer to another task or project
    Switch {
        /// Switch to this task
        #[arg(
            long,
            value_name = "TASK",
            conflicts_with = "project",
            required_unless_present = "project"
        )]
        task: Option<String>,
        /// Switch to the first task of this project
        #[arg(long, value_name = "PROJECT")]
        project: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum LogCommands {
    /// List time entries, newest first
    List {
        #[arg(long, value_name = "TIME")]
        from: Option<String>,
        #[arg(long, value_name = "TIME")]
        to: Option<String>,
        /// Only entries of this project
        #[arg(long, value_name = "PROJECT", conflicts_with = "task")]
        project: Option<String>,
        /// Only entries of this task
        #[arg(long, value_name = "TASK")]
        task: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a completed entry
    Add {
        /// Task ID or unique ID prefix
        task: String,
        #[arg(long, value_name = "TIME")]
        start: String,
        #[arg(long, value_name = "TIME")]
        end: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Change an entry
    Edit {
        /// Entry ID or unique ID prefix
        id: String,
        /// Move the entry to this task
        #[arg(long, value_name = "TASK")]
        task: Option<String>,
        #[arg(long, value_name = "TIME")]
        start: Option<String>,
        #[arg(long, value_name = "TIME")]
        end: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete an entry
    Delete {
        /// Entry ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a config value (api_base_url, request_timeout_secs, auto_sync, offline)
    Set { key: String, value: String },
    /// Print the config file location
    Path,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ReportGroup {
    Project,
    Task,
    Day,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
