//! Command-line surface of the `rollcall` binary.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(version, about = "Broadcast-then-collect attendance sessions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// SQLite database file (created and migrated on first use)
    #[arg(long, global = true, env = "ROLLCALL_DB", default_value = "rollcall.db")]
    pub db: PathBuf,

    /// JSON configuration overriding window bounds and notice text
    #[arg(long, global = true, env = "ROLLCALL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, global = true, env = "ROLLCALL_LOG_DIR")]
    pub log_dir: Option<String>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the known recipient population
    Recipient {
        #[command(subcommand)]
        action: RecipientAction,
    },
    /// Manage push endpoints
    Endpoint {
        #[command(subcommand)]
        action: EndpointAction,
    },
    /// Manage preset groups
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },
    /// Start, end and inspect sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Check in to a session
    CheckIn {
        session_id: String,
        recipient_id: String,
    },
    /// Declare absence from a session
    Absence {
        session_id: String,
        recipient_id: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        location: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum RecipientAction {
    /// Register a recipient, or rename an existing one
    Add {
        id: String,
        #[arg(long, default_value = "")]
        name: String,
    },
    List,
}

#[derive(Subcommand)]
pub enum EndpointAction {
    /// Register or replace a recipient's push token
    Set { recipient_id: String, token: String },
    Remove { recipient_id: String },
}

#[derive(Subcommand)]
pub enum GroupAction {
    Create {
        name: String,
        /// Member recipient ids
        #[arg(value_delimiter = ',')]
        members: Vec<String>,
    },
    /// Replace a group's name and members
    Update {
        id: i64,
        name: String,
        #[arg(value_delimiter = ',')]
        members: Vec<String>,
    },
    Delete {
        id: i64,
    },
    List,
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Open a session and notify its targets
    Start {
        #[arg(long)]
        initiator: String,
        /// Response window in seconds
        #[arg(long)]
        window: u32,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// End a session early
    End {
        session_id: String,
        #[arg(long)]
        initiator: String,
    },
    /// Live per-recipient status of a session
    View { session_id: String },
    /// Sessions opened by an initiator, newest first
    List {
        #[arg(long)]
        initiator: String,
    },
    /// Sessions that addressed a recipient, newest first
    History { recipient_id: String },
    /// The newest still-active session addressing a recipient
    Active { recipient_id: String },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct TargetArgs {
    /// Address every registered recipient
    #[arg(long)]
    pub all: bool,
    /// Address the members of a preset group
    #[arg(long)]
    pub group: Option<String>,
    /// Address one recipient id
    #[arg(long)]
    pub single: Option<String>,
}
