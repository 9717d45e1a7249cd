//! CLI entry point for tasknest.

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tasknest_app::config::ENV_DATA_DIR;
use tasknest_core::Route;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;

const DATA_DIR_NAME: &str = "tasknest";

/// Personal task lists stored as JSON documents.
#[derive(Parser, Debug)]
#[command(name = "tasknest", version, about = "tasknest: personal task lists with filters and stats")]
struct Cli {
    /// Data directory (defaults to $TASKNEST_DATA_DIR, then the platform data dir).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed reference categories and the demo account (once).
    Init {
        /// Do not create the demo account.
        #[arg(long)]
        no_demo: bool,
    },

    /// Create an account and sign in.
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        name: String,
    },

    /// Sign in (email defaults to $TASKNEST_USER).
    Signin {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: String,
    },

    /// End the current session.
    Signout,

    /// Show the signed-in principal and preferences.
    Whoami,

    /// Request a password reset.
    ResetPassword {
        #[arg(long)]
        email: String,
    },

    /// Create a task.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// low, medium, or high (defaults to the preferred priority).
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// RFC 3339 timestamp or YYYY-MM-DD.
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },

    /// List tasks, newest first.
    Ls {
        /// pending or completed.
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Case-insensitive text in title or description.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = LsFormat::Table)]
        format: LsFormat,
    },

    /// Show a task as JSON.
    Show {
        #[arg(long)]
        task: String,
    },

    /// Counts over every task.
    Stats,

    /// Tasks due in a date range, earliest first.
    Agenda {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },

    /// Mark a task completed.
    Done {
        #[arg(long)]
        task: String,
    },

    /// Mark a task pending.
    Undone {
        #[arg(long)]
        task: String,
    },

    /// Flip a task's completion.
    Toggle {
        #[arg(long)]
        task: String,
    },

    /// Change fields of a task.
    Edit {
        #[arg(long)]
        task: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long, conflicts_with = "clear_category")]
        category: Option<String>,
        #[arg(long)]
        clear_category: bool,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
    },

    /// Delete a task.
    Rm {
        #[arg(long)]
        task: String,
    },

    /// Mark several tasks completed.
    BulkDone {
        #[arg(short = 't', long = "task", required = true)]
        tasks: Vec<String>,
    },

    /// Delete several tasks.
    BulkRm {
        #[arg(short = 't', long = "task", required = true)]
        tasks: Vec<String>,
    },

    /// List reference categories.
    Categories,

    /// Create demo tasks for the signed-in account.
    Demo,

    /// Show or change preferences.
    Prefs {
        #[command(subcommand)]
        action: Option<PrefsAction>,
    },

    /// Upload or transform task images.
    Image {
        #[command(subcommand)]
        action: ImageAction,
    },
}

#[derive(Subcommand, Debug)]
enum PrefsAction {
    /// light, dark, or toggle.
    Theme { value: String },
    /// fr or en.
    Lang { value: String },
    /// Whether `ls` includes completed tasks by default.
    ShowCompleted {
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
    /// Priority preselected by `add`.
    DefaultPriority { value: String },
}

#[derive(Subcommand, Debug)]
enum ImageAction {
    /// Upload a file and attach it to a task.
    Upload {
        #[arg(long)]
        task: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the URL of a resized rendition.
    Resize {
        #[arg(long)]
        url: String,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LsFormat {
    #[default]
    Table,
    Json,
}

impl Command {
    /// Route this command is guarded as.
    const fn route(&self) -> Route {
        match self {
            Self::Init { .. } => Route::Initialize,
            Self::Signup { .. } => Route::Register,
            Self::Signin { .. } | Self::ResetPassword { .. } => Route::Login,
            Self::Signout | Self::Whoami | Self::Prefs { .. } | Self::Demo => Route::Profile,
            _ => Route::Home,
        }
    }
}

fn main() -> Result<()> {
    let Cli { data_dir, cmd } = Cli::parse();
    install_tracing();

    let mut fetch = |key: &'static str| env::var_os(key).map(PathBuf::from);
    let data_dir = resolve_data_dir(data_dir, &mut fetch);
    tokio::runtime::Runtime::new()?.block_on(commands::run(&data_dir, cmd))
}

fn resolve_data_dir(explicit: Option<PathBuf>, fetch: &mut impl FnMut(&'static str) -> Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| fetch(ENV_DATA_DIR).filter(|path| !path.as_os_str().is_empty()))
        .or_else(|| dirs::data_dir().map(|dir| dir.join(DATA_DIR_NAME)))
        .unwrap_or_else(|| PathBuf::from(".tasknest"))
}

fn install_tracing() {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
