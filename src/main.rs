use chrono::{DateTime, Local, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use colored::{ColoredString, Colorize};
use eyre::{Context, Result};
use std::path::PathBuf;
use tasktrack::{Config, ListFilter, Session, SessionStart, StoreError, Task, TaskFile, TaskStatus, TaskStore, TaskUpdate};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tasktrack")]
#[command(about = "tasktrack - track personal tasks through todo, in-progress and done")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Task file (default: from config, else the user data directory)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Config file (default: <config dir>/tasktrack/tasktrack.yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        description: String,

        /// todo, in-progress or done
        #[arg(short, long, default_value = "todo")]
        status: TaskStatus,
    },

    /// Change a task's description and/or status
    #[command(group(ArgGroup::new("changes").required(true).multiple(true)))]
    Update {
        id: u64,

        #[arg(short, long, group = "changes")]
        description: Option<String>,

        /// todo, in-progress or done
        #[arg(short, long, group = "changes")]
        status: Option<TaskStatus>,
    },

    /// Delete a task
    Delete { id: u64 },

    /// List tasks
    List {
        /// all, todo, in-progress or done
        #[arg(short, long, default_value = "all")]
        status: ListFilter,
    },

    /// Show one task
    Show { id: u64 },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    if cli.no_color || !config.color {
        colored::control::set_override(false);
    }

    let task_file = TaskFile::new(cli.file.clone().unwrap_or(config.task_file));
    let path = task_file.path().display().to_string();
    let mut session = Session::open(task_file).wrap_err_with(|| format!("Failed to read task file {}", path))?;
    report_start(&session, &path);

    match cli.command {
        Commands::Add { description, status } => {
            let task = session.store_mut().create(description, status)?.clone();
            save(&mut session, &path)?;
            println!("{}", "Task added successfully".green());
            print_task(&task);
        }
        Commands::Update {
            id,
            description,
            status,
        } => {
            let task = session
                .store_mut()
                .update(id, TaskUpdate { description, status })?
                .clone();
            save(&mut session, &path)?;
            println!("{}", "Task updated successfully".green());
            print_task(&task);
        }
        Commands::Delete { id } => {
            let task = session.store_mut().delete(id)?;
            save(&mut session, &path)?;
            println!("{}", "Task deleted successfully".green());
            print_task(&task);
        }
        Commands::List { status } => print_list(session.store(), status),
        Commands::Show { id } => {
            let task = session.store().get(id).ok_or(StoreError::NotFound(id))?;
            print_task(task);
        }
    }

    Ok(())
}

fn report_start(session: &Session, path: &str) {
    match session.start() {
        SessionStart::Loaded { .. } => {}
        SessionStart::Fresh => {
            let notice = format!("No previous task data found at {}. Starting fresh.", path);
            eprintln!("{}", notice.as_str().dimmed());
        }
        SessionStart::Degraded { reason } => {
            let notice = format!("Could not load {} ({}). Starting fresh.", path, reason);
            eprintln!("{}", notice.as_str().yellow());
        }
    }
}

fn save(session: &mut Session, path: &str) -> Result<()> {
    let backup = session
        .save()
        .wrap_err_with(|| format!("Failed to save tasks to {}", path))?;

    if let Some(backup) = backup {
        let notice = format!("Previous task file saved to {}", backup.display());
        eprintln!("{}", notice.as_str().yellow());
    }
    Ok(())
}

fn status_label(status: TaskStatus) -> ColoredString {
    match status {
        TaskStatus::Todo => status.as_str().yellow(),
        TaskStatus::InProgress => status.as_str().cyan(),
        TaskStatus::Done => status.as_str().green(),
    }
}

fn print_task(task: &Task) {
    let local = |ts: &DateTime<Utc>| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");

    println!();
    println!("{} {}  [{}]", "Task".bold(), task.id.to_string().as_str().bold(), status_label(task.status));
    println!("  description: {}", task.description);
    println!("  created:     {}", local(&task.created_at));
    println!("  updated:     {}", local(&task.updated_at));
}

fn print_list(store: &TaskStore, filter: ListFilter) {
    let tasks = store.list(filter);

    if tasks.is_empty() {
        match filter {
            ListFilter::All => println!("No tasks found."),
            ListFilter::Status(status) => println!("No {} tasks found.", status),
        }
    } else {
        for task in tasks {
            print_task(task);
        }
        println!();
    }

    let counts = store.counts();
    let breakdown: Vec<String> = TaskStatus::ALL
        .into_iter()
        .map(|status| format!("{} {}", counts[&status], status_label(status)))
        .collect();
    let summary = format!("{} tasks: {}", store.len(), breakdown.join(", "));
    println!("{}", summary.as_str().dimmed());
}
