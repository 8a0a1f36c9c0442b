use clap::{Parser, Subcommand};
use crate::config::Config;
use crate::models::Flag;
use crate::nav::{NavigationRequest, Navigator};
use crate::repo::FlagRepo;
use crate::store::{FlagStore, SqliteFlagStore};
use crate::tracker::{OnboardingTracker, TrackerView, Trigger};
use crate::cli::abbrev;
use crate::cli::error::{user_error, validate_flag_name, validate_flag_value, validate_interval_ms};
use crate::cli::output::{
    format_flag_history, format_flag_list, format_navigation, format_status_dashboard,
    format_task_table, get_terminal_width, use_color,
};
use anyhow::{Context, Result};
use std::io::Write;
use std::ops::ControlFlow;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "ontrack")]
#[command(about = "Onboarding progress tracker - derives task status from persisted onboarding flags")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Increase log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the onboarding dashboard
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Highlight this task instead of the computed default
        #[arg(long)]
        select: Option<String>,
    },
    /// List onboarding tasks with their derived status
    Tasks {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show stored flag values
    Flags {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Show every recorded write instead of current values
        #[arg(long)]
        history: bool,
    },
    /// Set a flag (what the onboarding wizards do on completion)
    Set {
        /// Flag name (companyProfileDone, entityCreated, entityVerified)
        flag: String,
        /// true or false (default: true)
        value: Option<String>,
    },
    /// Remove one flag, or all flags
    Reset {
        /// Flag name (omit to remove all onboarding flags)
        flag: Option<String>,
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Hand a task's destination to the navigator
    Start {
        /// Task id, number or prefix (defaults to the next task)
        task: Option<String>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Keep the dashboard up to date as flags change
    Watch {
        /// Poll interval in milliseconds (default from rc, 500)
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after this many refreshes
        #[arg(long)]
        count: Option<usize>,
        /// Highlight this task until its own status changes
        #[arg(long)]
        select: Option<String>,
        /// Emit one JSON object per change
        #[arg(long)]
        json: bool,
    },
}

pub fn run() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    // Check for version flag early (before any processing)
    if args.iter().any(|a| a == "--version" || a == "-V") {
        match Cli::try_parse_from(std::env::args()) {
            Ok(_) => return Ok(()),
            Err(_e) => {
                // clap reports --version through an Err; print it ourselves
                println!("ontrack {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
        }
    }

    args = match abbrev::expand_command_abbreviations(args) {
        Ok(expanded) => expanded,
        Err(e) => {
            user_error(&e);
        }
    };

    // No command: show the dashboard
    if args.iter().all(|a| a.starts_with('-') && a != "--help" && a != "-h") {
        args.insert(0, "status".to_string());
    }

    let clap_args = std::iter::once("ontrack".to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>();
    let cli = match Cli::try_parse_from(clap_args) {
        Ok(cli) => cli,
        Err(e) => {
            // Help output is a successful exit; real parse errors exit 2 as clap does
            if e.use_stderr() {
                e.exit();
            }
            e.print()?;
            return Ok(());
        }
    };

    init_logging(cli.verbose);
    handle_command(cli)
}

/// Initialise env_logger once; RUST_LOG wins over -v
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .try_init();
}

fn handle_command(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    log::debug!("Using flag store at {}", config.data_location.display());

    match cli.command {
        Commands::Status { json, select } => handle_status(&config, json, select),
        Commands::Tasks { json } => handle_tasks(&config, json),
        Commands::Flags { json, history } => handle_flags(&config, json, history),
        Commands::Set { flag, value } => handle_set(&config, flag, value),
        Commands::Reset { flag, yes } => handle_reset(&config, flag, yes),
        Commands::Start { task, json } => handle_start(&config, task, json),
        Commands::Watch { interval, count, select, json } => {
            handle_watch(&config, interval, count, select, json)
        }
    }
}

fn open_store(config: &Config) -> Result<SqliteFlagStore> {
    SqliteFlagStore::open(&config.data_location)
        .context("Failed to open flag store")
}

fn open_tracker(config: &Config) -> Result<OnboardingTracker<SqliteFlagStore>> {
    Ok(OnboardingTracker::new(open_store(config)?, config.selection_policy))
}

fn view_json(view: &TrackerView) -> serde_json::Value {
    serde_json::json!({
        "flags": view.snapshot.flags,
        "tasks": view.snapshot.tasks,
        "default_selection": view.snapshot.default_selection,
        "selected": view.selected,
        "manual_selection": view.manual,
        "done_count": view.snapshot.done_count,
        "total_count": view.snapshot.tasks.len(),
        "percent_complete": view.snapshot.percent_complete,
        "setup": view.snapshot.setup,
    })
}

fn handle_status(config: &Config, json: bool, select: Option<String>) -> Result<()> {
    let mut tracker = open_tracker(config)?;
    if let Some(task) = select {
        tracker.select(&task)?;
    }
    let view = tracker.refresh();

    if json {
        println!("{}", serde_json::to_string_pretty(&view_json(&view))?);
    } else {
        print!("{}", format_status_dashboard(&view, use_color(config.color), get_terminal_width()));
    }
    Ok(())
}

fn handle_tasks(config: &Config, json: bool) -> Result<()> {
    let mut tracker = open_tracker(config)?;
    let view = tracker.refresh();

    if json {
        println!("{}", serde_json::to_string_pretty(&view.snapshot.tasks)?);
    } else {
        print!("{}", format_task_table(&view, use_color(config.color)));
    }
    Ok(())
}

fn handle_flags(config: &Config, json: bool, history: bool) -> Result<()> {
    let store = open_store(config)?;

    if history {
        let events = store.with_conn(|conn| FlagRepo::history(conn, None))?;
        if json {
            println!("{}", serde_json::to_string_pretty(&events)?);
        } else {
            print!("{}", format_flag_history(&events));
        }
        return Ok(());
    }

    let records = store.list()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print!("{}", format_flag_list(&records, use_color(config.color)));
    }
    Ok(())
}

fn handle_set(config: &Config, flag: String, value: Option<String>) -> Result<()> {
    let flag = validate_flag_name(&flag)?;
    let value = validate_flag_value(value.as_deref())?;

    let store = open_store(config)?;
    store.set(flag.key(), value)?;
    println!("Set {}={}", flag.key(), value);
    Ok(())
}

/// Ask before wiping every flag
/// Returns true only on an explicit yes
fn prompt_confirm(question: &str) -> Result<bool> {
    eprint!("{} [y/N]: ", question);
    std::io::stderr().flush()
        .map_err(|e| anyhow::anyhow!("Failed to flush stderr: {}", e))?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)
        .map_err(|e| anyhow::anyhow!("Failed to read input: {}", e))?;

    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn handle_reset(config: &Config, flag: Option<String>, yes: bool) -> Result<()> {
    let flags: Vec<Flag> = match flag {
        Some(name) => vec![validate_flag_name(&name)?],
        None => {
            if !yes && !prompt_confirm("Remove all onboarding flags?")? {
                println!("Cancelled.");
                return Ok(());
            }
            Flag::ALL.to_vec()
        }
    };

    let store = open_store(config)?;
    for flag in &flags {
        store.remove(flag.key())?;
    }
    let names: Vec<&str> = flags.iter().map(|f| f.key()).collect();
    println!("Reset {}", names.join(", "));
    Ok(())
}

/// Writes navigation requests to stdout
struct PrintNavigator {
    json: bool,
}

impl Navigator for PrintNavigator {
    fn navigate(&mut self, request: &NavigationRequest) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        if self.json {
            writeln!(stdout, "{}", serde_json::to_string_pretty(request)?)?;
        } else {
            write!(stdout, "{}", format_navigation(request))?;
        }
        Ok(())
    }
}

fn handle_start(config: &Config, task: Option<String>, json: bool) -> Result<()> {
    let mut tracker = open_tracker(config)?;
    let mut navigator = PrintNavigator { json };
    tracker.start(task.as_deref(), &mut navigator)?;
    Ok(())
}

fn handle_watch(
    config: &Config,
    interval: Option<u64>,
    count: Option<usize>,
    select: Option<String>,
    json: bool,
) -> Result<()> {
    let interval = match interval {
        Some(ms) => match validate_interval_ms(ms) {
            Ok(ms) => Duration::from_millis(ms),
            Err(e) => user_error(&e),
        },
        None => config.poll_interval,
    };

    let mut tracker = open_tracker(config)?;
    if let Some(task) = select {
        tracker.select(&task)?;
    }

    let color = use_color(config.color);
    tracker.watch(interval, count, |trigger, view| {
        if !view.changed {
            return Ok(ControlFlow::Continue(()));
        }
        let mut stdout = std::io::stdout().lock();
        if json {
            let mut value = view_json(view);
            value["trigger"] = serde_json::Value::String(trigger.label());
            writeln!(stdout, "{}", serde_json::to_string(&value)?)?;
        } else {
            if *trigger != Trigger::Initial {
                writeln!(stdout)?;
            }
            writeln!(
                stdout,
                "--- {} ({}) ---",
                chrono::Local::now().format("%H:%M:%S"),
                trigger.label()
            )?;
            write!(stdout, "{}", format_status_dashboard(view, color, get_terminal_width()))?;
        }
        stdout.flush()?;
        Ok(ControlFlow::Continue(()))
    })
}
