//! `rollcall` command-line front end.
//!
//! # Responsibility
//! - Map subcommands onto the core services over one SQLite file.
//! - Print every result as one JSON document on stdout.
//!
//! # Invariants
//! - `session start` waits for its dispatch batch before the process exits.

mod cli;

use clap::Parser;
use cli::{
    Cli, Commands, EndpointAction, GroupAction, RecipientAction, SessionAction, TargetArgs,
};
use log::info;
use rollcall_core::{
    default_log_level, init_logging, parse_session_id, ConfigError, EndpointRepository,
    GroupService, GroupServiceError, LogDispatcher, LoggingError, ModelValidationError,
    RecipientId, RecipientService, RepoError, RollCallConfig, RollCallError, RollCallService,
    SqliteRollCallStore, Targeting,
};
use serde::Serialize;
use serde_json::json;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Logging(LoggingError),
    Store(RepoError),
    RollCall(RollCallError),
    Group(GroupServiceError),
    Output(serde_json::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "cannot open database: {err}"),
            Self::RollCall(err) => write!(f, "{err}"),
            Self::Group(err) => write!(f, "{err}"),
            Self::Output(err) => write!(f, "cannot encode output: {err}"),
        }
    }
}

impl Error for CliError {}

impl CliError {
    /// Machine-readable code printed with every failure.
    fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "invalid_config",
            Self::Logging(_) => "logging_unavailable",
            Self::Store(_) => "dependency_unavailable",
            Self::RollCall(err) => err.code(),
            Self::Group(err) => err.code(),
            Self::Output(_) => "output_failed",
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

impl From<RollCallError> for CliError {
    fn from(value: RollCallError) -> Self {
        Self::RollCall(value)
    }
}

impl From<ModelValidationError> for CliError {
    fn from(value: ModelValidationError) -> Self {
        Self::RollCall(value.into())
    }
}

impl From<GroupServiceError> for CliError {
    fn from(value: GroupServiceError) -> Self {
        Self::Group(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", json!({ "error": err.code(), "message": err.to_string() }));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }
    let config = match cli.config.as_ref() {
        Some(path) => RollCallConfig::load(path)?,
        None => RollCallConfig::default(),
    };
    let store = Arc::new(SqliteRollCallStore::open(&cli.db)?);
    info!(
        "event=cli_start module=cli status=ok version={}",
        rollcall_core::core_version()
    );

    match cli.command {
        Commands::Recipient { action } => run_recipient(&store, action),
        Commands::Endpoint { action } => run_endpoint(&store, action),
        Commands::Group { action } => run_group(&store, action),
        Commands::Session { action } => run_session(&roll_call(&store, config)?, action),
        Commands::CheckIn {
            session_id,
            recipient_id,
        } => {
            let ack =
                roll_call(&store, config)?.check_in(parse_session_id(&session_id)?, &recipient_id)?;
            print_json(&ack)
        }
        Commands::Absence {
            session_id,
            recipient_id,
            reason,
            location,
        } => {
            roll_call(&store, config)?.declare_absence(
                parse_session_id(&session_id)?,
                &recipient_id,
                &reason,
                location.as_deref(),
            )?;
            print_json(&json!({ "declared": true }))
        }
    }
}

fn roll_call(
    store: &Arc<SqliteRollCallStore>,
    config: RollCallConfig,
) -> Result<RollCallService<SqliteRollCallStore>, CliError> {
    let endpoints: Arc<dyn EndpointRepository + Send + Sync> = store.clone();
    Ok(
        RollCallService::new(Arc::clone(store), Arc::new(LogDispatcher::new(endpoints)))
            .with_config(config)?,
    )
}

fn run_recipient(store: &Arc<SqliteRollCallStore>, action: RecipientAction) -> Result<(), CliError> {
    let recipients = RecipientService::new(Arc::clone(store));
    match action {
        RecipientAction::Add { id, name } => print_json(&recipients.register_recipient(&id, &name)?),
        RecipientAction::List => print_json(&recipients.list_recipients()?),
    }
}

fn run_endpoint(store: &Arc<SqliteRollCallStore>, action: EndpointAction) -> Result<(), CliError> {
    let recipients = RecipientService::new(Arc::clone(store));
    match action {
        EndpointAction::Set {
            recipient_id,
            token,
        } => {
            recipients.register_endpoint(&recipient_id, &token)?;
            print_json(&json!({ "registered": true }))
        }
        EndpointAction::Remove { recipient_id } => {
            let removed = recipients.deregister_endpoint(&recipient_id)?;
            print_json(&json!({ "removed": removed }))
        }
    }
}

fn run_group(store: &Arc<SqliteRollCallStore>, action: GroupAction) -> Result<(), CliError> {
    let groups = GroupService::new(Arc::clone(store));
    match action {
        GroupAction::Create { name, members } => print_json(&groups.create_group(&name, members)?),
        GroupAction::Update { id, name, members } => {
            print_json(&groups.update_group(id, &name, members)?)
        }
        GroupAction::Delete { id } => {
            groups.delete_group(id)?;
            print_json(&json!({ "deleted": id }))
        }
        GroupAction::List => print_json(&groups.list_groups()?),
    }
}

fn run_session(
    service: &RollCallService<SqliteRollCallStore>,
    action: SessionAction,
) -> Result<(), CliError> {
    match action {
        SessionAction::Start {
            initiator,
            window,
            target,
        } => {
            let started = service.start_session(&initiator, targeting(target)?, window)?;
            let session_id = started.session_id;
            let target_count = started.target_count;
            let dispatch = started.dispatch.wait();
            print_json(&json!({
                "session_id": session_id,
                "target_count": target_count,
                "dispatch": dispatch,
            }))
        }
        SessionAction::End {
            session_id,
            initiator,
        } => {
            service.end_session(parse_session_id(&session_id)?, &initiator)?;
            print_json(&json!({ "ended": true }))
        }
        SessionAction::View { session_id } => {
            print_json(&service.live_view(parse_session_id(&session_id)?)?)
        }
        SessionAction::List { initiator } => print_json(&service.list_for_initiator(&initiator)?),
        SessionAction::History { recipient_id } => {
            print_json(&service.history_for_recipient(&recipient_id)?)
        }
        SessionAction::Active { recipient_id } => {
            print_json(&service.find_active_for_recipient(&recipient_id)?)
        }
    }
}

fn targeting(target: TargetArgs) -> Result<Targeting, CliError> {
    match (target.all, target.group, target.single) {
        (_, Some(name), _) => Ok(Targeting::Group(name)),
        (_, _, Some(id)) => Ok(Targeting::Single(RecipientId::parse(&id)?)),
        _ => Ok(Targeting::All),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
