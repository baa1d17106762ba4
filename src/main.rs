use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use clipkeeper::clipboard_history::{default_data_dir, get_db_path, Entry, EntryId, HistoryStore, LogView};
use clipkeeper::config::{default_config_path, load_config};
use clipkeeper::core::Core;
use clipkeeper::error::{ClipkeeperError, ResultExt};
use clipkeeper::logging;
use clipkeeper::singleton::SingletonGuard;
use clipkeeper::APP_NAME;

/// Another instance holds the singleton guard
const EXIT_ALREADY_RUNNING: u8 = 3;
/// History store (or clipboard) could not be opened
const EXIT_HISTORY_UNAVAILABLE: u8 = 2;

static STOP: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "clipkeeper", version, about = "Clipboard history manager")]
struct Cli {
    /// Settings file (default: <config dir>/clipkeeper/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the history database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the clipboard until interrupted (default)
    Run,
    /// Print stored entries, newest first
    List {
        /// Case-insensitive filter on the entry text
        #[arg(long, short)]
        query: Option<String>,
        #[arg(long, short)]
        limit: Option<usize>,
        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },
    /// Delete an entry and its stored formats
    Delete { id: EntryId },
    /// Protect an entry from retention
    Keep {
        id: EntryId,
        /// Clear the flag instead
        #[arg(long)]
        off: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = logging::init();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => return run(config_path, data_dir),
        Command::List { query, limit, json } => list(&data_dir, query.as_deref(), limit, json),
        Command::Delete { id } => delete(&data_dir, id),
        Command::Keep { id, off } => keep(&data_dir, id, !off),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: PathBuf, data_dir: PathBuf) -> ExitCode {
    let mut singleton = match SingletonGuard::acquire(APP_NAME) {
        Ok(guard) => guard,
        Err(e) => {
            error!(component = "main", operation = "acquire_singleton", error = %e);
            return ExitCode::FAILURE;
        }
    };

    if singleton.is_running() {
        let err = ClipkeeperError::AlreadyRunning {
            pid: singleton.other_pid(),
        };
        info!(error = %err, "Exiting");
        eprintln!("{}", err.user_message());
        return ExitCode::from(EXIT_ALREADY_RUNNING);
    }

    let config = load_config(&config_path);
    info!(
        hotkey = %config.global_hotkey,
        max_entries = config.max_entries,
        expire_days = config.expire_days,
        private_mode = config.private_mode,
        "Loaded config"
    );

    let mut core = match Core::open(config, config_path, &data_dir, Box::new(LogView)) {
        Ok(core) => core,
        Err(e) => {
            error!(component = "main", operation = "open_history", error = %e);
            eprintln!("{}", e.user_message());
            singleton.destroy();
            return ExitCode::from(EXIT_HISTORY_UNAVAILABLE);
        }
    };

    install_signal_handlers();
    core.start_platform();
    core.run(&STOP);

    core.shutdown().log_err();
    singleton.destroy();
    ExitCode::SUCCESS
}

fn open_store(data_dir: &std::path::Path) -> anyhow::Result<HistoryStore> {
    let path = get_db_path(data_dir)?;
    HistoryStore::open(&path).with_context(|| format!("Failed to open {}", path.display()))
}

fn list(
    data_dir: &std::path::Path,
    query: Option<&str>,
    limit: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;
    let entries = match query {
        Some(query) => store.search(query)?,
        None => store.list_entries()?,
    };

    for entry in entries.iter().take(limit.unwrap_or(usize::MAX)) {
        if json {
            println!("{}", serde_json::to_string(entry)?);
        } else {
            println!("{}", format_entry(entry));
        }
    }
    Ok(())
}

fn format_entry(entry: &Entry) -> String {
    let when = chrono::DateTime::from_timestamp_millis(entry.created_at)
        .map(|utc| {
            utc.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "?".to_string());
    let first_line = entry.short_title.lines().next().unwrap_or_default();
    format!(
        "{:>6} {} {} {}",
        entry.id,
        when,
        if entry.keep { "*" } else { " " },
        first_line
    )
}

fn delete(data_dir: &std::path::Path, id: EntryId) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;
    store.delete_blobs(id)?;
    if store.delete_entry(id)? == 0 {
        bail!("no entry with id {}", id);
    }
    Ok(())
}

fn keep(data_dir: &std::path::Path, id: EntryId, keep: bool) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;
    if store.set_keep(id, keep)? == 0 {
        bail!("no entry with id {}", id);
    }
    Ok(())
}

#[cfg(unix)]
extern "C" fn on_signal(_signal: libc::c_int) {
    STOP.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn install_signal_handlers() {
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, on_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_signal as libc::sighandler_t);
    }
}

#[cfg(windows)]
fn install_signal_handlers() {
    use windows::Win32::Foundation::BOOL;
    use windows::Win32::System::Console::SetConsoleCtrlHandler;

    unsafe extern "system" fn on_ctrl(_ctrl_type: u32) -> BOOL {
        STOP.store(true, Ordering::SeqCst);
        BOOL::from(true)
    }

    // SAFETY: on_ctrl has the signature the console expects and lives forever.
    unsafe {
        if !SetConsoleCtrlHandler(Some(on_ctrl), BOOL::from(true)).as_bool() {
            tracing::warn!("Failed to install console control handler");
        }
    }
}

#[cfg(not(any(unix, windows)))]
fn install_signal_handlers() {}
