//! Command-line front end for the IBM MQ administrative REST API.

mod health;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mqrest_core::config::env_vars;
use mqrest_core::{
    Attributes, CommandOptions, ConfigFile, Credentials, CredentialsConfig, EnsureTarget, Session,
    SessionConfig, StatusConfig, SyncConfig,
};
use serde::Serialize;
use serde_json::Value;

/// mqrest - Administer IBM MQ queue managers over REST.
#[derive(Parser, Debug)]
#[command(name = "mqrest")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// REST base URL (overrides MQ_REST_BASE_URL).
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Queue manager name (overrides MQ_QMGR_NAME).
    #[arg(long, global = true)]
    qmgr: Option<String>,

    /// Admin user (overrides MQ_ADMIN_USER).
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Admin password (overrides MQ_ADMIN_PASSWORD).
    #[arg(long, global = true)]
    password: Option<String>,

    /// Log in once and authenticate with an LTPA token.
    #[arg(long, global = true)]
    ltpa: bool,

    /// Skip TLS certificate verification.
    #[arg(long, global = true)]
    insecure: bool,

    /// Send and return raw MQSC attribute names.
    #[arg(long, global = true)]
    no_mapping: bool,

    /// Pass unmapped attributes through instead of failing.
    #[arg(long, global = true)]
    permissive: bool,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Display objects of one type.
    Display {
        /// Object type, e.g. QUEUE, CHANNEL, QMGR.
        qualifier: String,
        /// Object name or pattern.
        name: Option<String>,
        /// Request attribute as key=value.
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
        /// Attribute to return (repeatable).
        #[arg(short = 'r', long = "response")]
        response: Vec<String>,
        /// Filter clause, e.g. "current_queue_depth GT 100".
        #[arg(short = 'w', long = "where")]
        where_clause: Option<String>,
    },
    /// Run any MQSC command.
    Run {
        /// Command verb, e.g. DEFINE.
        verb: String,
        /// Object type, e.g. QLOCAL.
        qualifier: String,
        /// Object name.
        name: Option<String>,
        /// Request attribute as key=value.
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
        /// Attribute to return (repeatable).
        #[arg(short = 'r', long = "response")]
        response: Vec<String>,
    },
    /// Define an object or alter it to match the given attributes.
    Ensure {
        /// Object type.
        #[arg(value_enum)]
        object: EnsureKind,
        /// Object name (ignored for qmgr).
        name: Option<String>,
        /// Desired attribute as key=value.
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },
    /// Start an object and wait until it is running.
    Start(SyncArgs),
    /// Stop an object and wait until it is stopped.
    Stop(SyncArgs),
    /// Stop then start an object.
    Restart(SyncArgs),
    /// Check queue manager reachability, status, command server and listeners.
    Health,
}

#[derive(clap::Args, Debug)]
struct SyncArgs {
    /// Object type.
    #[arg(value_enum)]
    object: SyncKind,
    /// Object name.
    name: String,
    /// Seconds to wait for the target state.
    #[arg(long)]
    timeout: Option<f64>,
    /// Seconds between status checks.
    #[arg(long)]
    interval: Option<f64>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum EnsureKind {
    Qmgr,
    Qlocal,
    Qremote,
    Qalias,
    Qmodel,
    Channel,
    Authinfo,
    Listener,
    Namelist,
    Process,
    Service,
    Topic,
    Sub,
    Stgclass,
    Comminfo,
    Cfstruct,
}

impl EnsureKind {
    /// `None` for the queue manager, which has its own ensure path.
    fn target(self) -> Option<EnsureTarget> {
        let target = match self {
            EnsureKind::Qmgr => return None,
            EnsureKind::Qlocal => EnsureTarget::queue("QLOCAL"),
            EnsureKind::Qremote => EnsureTarget::queue("QREMOTE"),
            EnsureKind::Qalias => EnsureTarget::queue("QALIAS"),
            EnsureKind::Qmodel => EnsureTarget::queue("QMODEL"),
            EnsureKind::Channel => EnsureTarget::uniform("CHANNEL"),
            EnsureKind::Authinfo => EnsureTarget::uniform("AUTHINFO"),
            EnsureKind::Listener => EnsureTarget::uniform("LISTENER"),
            EnsureKind::Namelist => EnsureTarget::uniform("NAMELIST"),
            EnsureKind::Process => EnsureTarget::uniform("PROCESS"),
            EnsureKind::Service => EnsureTarget::uniform("SERVICE"),
            EnsureKind::Topic => EnsureTarget::uniform("TOPIC"),
            EnsureKind::Sub => EnsureTarget::uniform("SUB"),
            EnsureKind::Stgclass => EnsureTarget::uniform("STGCLASS"),
            EnsureKind::Comminfo => EnsureTarget::uniform("COMMINFO"),
            EnsureKind::Cfstruct => EnsureTarget::uniform("CFSTRUCT"),
        };
        Some(target)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SyncKind {
    Channel,
    Listener,
    Service,
}

impl SyncKind {
    fn status(self) -> &'static StatusConfig {
        match self {
            SyncKind::Channel => &StatusConfig::CHANNEL,
            SyncKind::Listener => &StatusConfig::LISTENER,
            SyncKind::Service => &StatusConfig::SERVICE,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut session = connect(&args)?;

    match args.command {
        Command::Display {
            qualifier,
            name,
            params,
            response,
            where_clause,
        } => {
            let mut options = options(params, response);
            if let Some(clause) = where_clause {
                options = options.with_where(clause);
            }
            let records = session.run_command("DISPLAY", &qualifier, name.as_deref(), options)?;
            print_json(&records)
        }
        Command::Run {
            verb,
            qualifier,
            name,
            params,
            response,
        } => {
            let records =
                session.run_command(&verb, &qualifier, name.as_deref(), options(params, response))?;
            print_json(&records)
        }
        Command::Ensure {
            object,
            name,
            params,
        } => {
            let desired: Attributes = params.into_iter().collect();
            let outcome = match object.target() {
                None => session.ensure_qmgr(&desired)?,
                Some(target) => {
                    let name = name.ok_or_else(|| anyhow!("ensure {:?} needs a name", object))?;
                    session.ensure_object(&name, &desired, target)?
                }
            };
            print_json(&outcome)
        }
        Command::Start(sync) => {
            let config = sync_config(&session, &sync)?;
            let outcome = session.start_sync(&sync.name, sync.object.status(), config)?;
            print_json(&outcome)
        }
        Command::Stop(sync) => {
            let config = sync_config(&session, &sync)?;
            let outcome = session.stop_sync(&sync.name, sync.object.status(), config)?;
            print_json(&outcome)
        }
        Command::Restart(sync) => {
            let config = sync_config(&session, &sync)?;
            let outcome = session.restart_sync(&sync.name, sync.object.status(), config)?;
            print_json(&outcome)
        }
        Command::Health => {
            let report = health::check(&mut session);
            print_json(&report)?;
            if !report.passed {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let json_logging = std::env::var("MQREST_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_directive = if verbose {
        "mqrest=debug,mqrest_core=debug"
    } else {
        "mqrest=info,mqrest_core=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    // Logs go to stderr so stdout stays machine-readable.
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Build a session from the config file or environment, then apply flags.
fn connect(args: &Args) -> Result<Session> {
    let (mut config, from_file) = match &args.config {
        Some(path) => {
            let file = ConfigFile::load(path)?;
            (file.session, file.credentials)
        }
        None => {
            let config = SessionConfig::from_lookup(|name| match name {
                env_vars::BASE_URL if args.base_url.is_some() => args.base_url.clone(),
                env_vars::QMGR_NAME if args.qmgr.is_some() => args.qmgr.clone(),
                _ => std::env::var(name).ok(),
            })
            .context("set --base-url and --qmgr, or MQ_REST_BASE_URL and MQ_QMGR_NAME")?;
            (config, None)
        }
    };

    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(qmgr) = &args.qmgr {
        config.qmgr_name = qmgr.clone();
    }
    if args.insecure {
        config.verify_tls = false;
    }
    if args.no_mapping {
        config.map_attributes = false;
    }
    if args.permissive {
        config.mapping_strict = false;
    }

    let credentials = credentials(args, from_file)?;
    tracing::debug!(base_url = %config.base_url, qmgr = %config.qmgr_name, "Connecting");
    Ok(Session::builder(config, credentials).build()?)
}

/// Flags win over the config file, which wins over the environment.
///
/// Without `--user`, `--password` and `--ltpa` apply to the file's
/// username and password.
fn credentials(args: &Args, from_file: Option<CredentialsConfig>) -> Result<Credentials> {
    if args.user.is_none() {
        if let Some(config) = from_file {
            return file_credentials(args, config);
        }
    }
    let user = args
        .user
        .clone()
        .or_else(|| std::env::var(env_vars::ADMIN_USER).ok())
        .ok_or_else(|| anyhow!("no credentials: pass --user or set {}", env_vars::ADMIN_USER))?;
    let password = args
        .password
        .clone()
        .or_else(|| std::env::var(env_vars::ADMIN_PASSWORD).ok())
        .unwrap_or_default();
    Ok(if args.ltpa {
        Credentials::ltpa(user, password)
    } else {
        Credentials::basic(user, password)
    })
}

fn file_credentials(args: &Args, config: CredentialsConfig) -> Result<Credentials> {
    let (username, password, ltpa) = match config {
        CredentialsConfig::Basic { username, password } => (username, password, args.ltpa),
        CredentialsConfig::Ltpa { username, password } => (username, password, true),
        certificate @ CredentialsConfig::Certificate { .. } => {
            if args.ltpa || args.password.is_some() {
                bail!("--ltpa and --password need a username; the config file uses a certificate");
            }
            return Ok(certificate.into());
        }
    };
    let password = args.password.clone().unwrap_or(password);
    Ok(if ltpa {
        Credentials::ltpa(username, password)
    } else {
        Credentials::basic(username, password)
    })
}

fn options(params: Vec<(String, Value)>, response: Vec<String>) -> CommandOptions {
    let mut options = CommandOptions::new().with_request_parameters(params.into_iter().collect());
    if !response.is_empty() {
        options = options.with_response_parameters(response);
    }
    options
}

fn sync_config(session: &Session, sync: &SyncArgs) -> Result<SyncConfig> {
    let config = session.config();
    Ok(SyncConfig::from_secs(
        sync.timeout.unwrap_or(config.sync_timeout_secs),
        sync.interval.unwrap_or(config.poll_interval_secs),
    )?)
}

/// Parse `key=value`. Integers and booleans become JSON numbers and
/// booleans; anything else stays a string.
fn parse_param(text: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", text))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", text));
    }
    let value = if let Ok(number) = value.parse::<i64>() {
        Value::from(number)
    } else if let Ok(flag) = value.parse::<bool>() {
        Value::from(flag)
    } else {
        Value::from(value)
    };
    Ok((key.to_string(), value))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
