use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result};
use std::cell::Cell;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use todostore::confirm::{Always, Confirm};
use todostore::render::{self, EMPTY_MESSAGE, Row};
use todostore::{
    Backend, ClearOutcome, Config, Counts, DateFilter, Slot, StatusFilter, StoreError, TaskFilter, TaskId, TaskStatus,
    TaskStore,
};

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "TodoStore CLI - to-do list with due dates, status and date filters")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a YAML config file (default: <config dir>/todostore/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the task data (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Storage backend (overrides the config file)
    #[arg(short, long, value_parser = parse_backend)]
    backend: Option<Backend>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        /// What needs doing
        description: String,

        /// Due date as YYYY-MM-DD (default: tomorrow)
        #[arg(long)]
        due: Option<String>,
    },

    /// Show tasks, optionally filtered
    List {
        /// all, in-progress or completed
        #[arg(long, default_value = "all")]
        status: StatusFilter,

        /// all, overdue, today or future
        #[arg(long, default_value = "all")]
        date: DateFilter,
    },

    /// Mark a task completed
    Done { id: u64 },

    /// Mark a task in progress again
    Undo { id: u64 },

    /// Delete a task
    Delete { id: u64 },

    /// Delete all tasks
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show task counts
    Counts,
}

fn parse_backend(s: &str) -> Result<Backend, String> {
    match s.to_ascii_lowercase().as_str() {
        "sqlite" => Ok(Backend::Sqlite),
        "file" => Ok(Backend::File),
        other => Err(format!("Unknown backend: {} (expected sqlite or file)", other)),
    }
}

/// Asks on stdin; anything but y/yes declines
struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

type CliStore = TaskStore<Box<dyn Slot>, Box<dyn Confirm>>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .init();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    let skip_prompt = matches!(cli.command, Commands::Clear { yes: true }) || !config.confirm_clear;
    let confirm: Box<dyn Confirm> = if skip_prompt {
        Box::new(Always::yes())
    } else {
        Box::new(TerminalConfirm)
    };

    // Open store
    let slot = config.open_slot().context("Failed to open task storage")?;
    let mut store: CliStore = TaskStore::open(slot, confirm);

    let changed = Rc::new(Cell::new(false));
    let flag = Rc::clone(&changed);
    store.subscribe(move |_| flag.set(true));

    // Only `list` asks for a specific view; mutations re-render the full list
    let view = match cli.command {
        Commands::Add { description, due } => {
            let due = due.unwrap_or_else(default_due_date);
            match store.add_raw(&description, &due) {
                Ok(id) => println!("Added task #{}", id),
                Err(e) => exit_with(e),
            }
            None
        }
        Commands::List { status, date } => Some(TaskFilter::new(status, date)),
        Commands::Done { id } => {
            set_status(&mut store, TaskId(id), true)?;
            None
        }
        Commands::Undo { id } => {
            set_status(&mut store, TaskId(id), false)?;
            None
        }
        Commands::Delete { id } => {
            if store.delete(TaskId(id))? {
                println!("Deleted task #{}", id);
            } else {
                eprintln!("No task #{}", id);
            }
            None
        }
        Commands::Clear { .. } => {
            match store.clear_all()? {
                ClearOutcome::Empty => println!("No tasks to delete"),
                ClearOutcome::Declined => println!("Kept all tasks"),
                ClearOutcome::Cleared(count) => println!("Deleted {} task(s)", count),
            }
            None
        }
        Commands::Counts => {
            println!("{}", render::counts_line(&store.counts()));
            return Ok(());
        }
    };

    if view.is_some() || changed.get() {
        let today = todostore::today();
        let rows = render::rows(store.filtered(view.unwrap_or_default(), today), today);
        print_table(&rows, &store.counts());
    }

    Ok(())
}

fn set_status(store: &mut CliStore, id: TaskId, completed: bool) -> Result<()> {
    if store.toggle_status(id, completed)? {
        let status = TaskStatus::from_completed(completed);
        println!("Task #{} is now {}", id, status);
    } else {
        eprintln!("No task #{}", id);
    }
    Ok(())
}

/// Tomorrow, as the add form suggests
fn default_due_date() -> String {
    let today = todostore::today();
    today.succ_opt().unwrap_or(today).format("%Y-%m-%d").to_string()
}

fn exit_with(err: StoreError) -> ! {
    eprintln!("{}", err.to_string().red());
    process::exit(1);
}

fn print_table(rows: &[Row], counts: &Counts) {
    println!("{}", render::counts_line(counts).bold());

    if rows.is_empty() {
        println!("{}", EMPTY_MESSAGE.dimmed());
        return;
    }

    for row in rows {
        let check = if row.checked { "[x]" } else { "[ ]" };
        let id = format!("#{:<4}", row.id.0);

        let due = format!("{:>12}", row.due);
        let due = if row.overdue { due.red() } else { due.normal() };

        let badge = match row.status {
            TaskStatus::Completed => row.badge().green(),
            TaskStatus::InProgress => row.badge().yellow(),
        };

        println!("{} {} {:<40} {} {}", id.dimmed(), check, row.description, due, badge);
    }
}
