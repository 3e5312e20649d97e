use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use sendfleet::api::{ApiClient, JobSubmitter, JobTracker, ServerRegistry, SessionJobSource};
use sendfleet::config::Config;
use sendfleet::models::DispatchRequest;
use sendfleet::planner;
use sendfleet::session::{SessionContext, SessionStorage, UserProfile};
use sendfleet::types::{AppError, DispatchMode, JobStatus, Priority};
use sendfleet::utils::with_retry;
use sendfleet::watch::JobWatcher;
use futures::FutureExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sendfleet", version, about = "Bulk email dispatch client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a backend-issued bearer token as the active session
    Login {
        /// Bearer token issued by the auth backend
        #[arg(long)]
        token: String,
        #[arg(long)]
        user_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Clear the stored session
    Logout,
    /// Show the active session
    Whoami,
    /// List the sending servers available to the user
    Servers,
    /// Show backend host telemetry
    ServerInfo,
    /// Mediator liveness probe
    Health,
    /// Worker liveness probe
    WorkerHealth,
    /// Send to all recipients synchronously
    Send(SendArgs),
    /// Queue a background send job
    SendBg(SendBgArgs),
    /// List email jobs
    Jobs {
        /// Filter by status (pending/processing/completed/failed/paused)
        #[arg(long)]
        status: Option<JobStatus>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one job
    Job { job_id: String },
    /// Pause a processing job
    Pause { job_id: String },
    /// Resume a paused job
    Resume { job_id: String },
    /// Poll one job until it reaches a terminal state
    Watch { job_id: String },
    /// Open the interactive job monitor
    Monitor,
}

#[derive(Args)]
struct SendArgs {
    /// Sender email address
    #[arg(long)]
    from: String,
    /// Sender display name
    #[arg(long)]
    name: String,
    /// Mail-provider app password (falls back to SENDFLEET_APP_PASSWORD)
    #[arg(long)]
    app_password: Option<String>,
    /// Recipient address; repeatable
    #[arg(long = "to")]
    to: Vec<String>,
    /// File with one recipient per line
    #[arg(long)]
    to_file: Option<PathBuf>,
    #[arg(long)]
    subject: String,
    /// Message body
    #[arg(long, conflicts_with = "body_file")]
    body: Option<String>,
    /// File containing the message body
    #[arg(long)]
    body_file: Option<PathBuf>,
    /// Explicit sending server id (auto-select when omitted)
    #[arg(long)]
    server: Option<String>,
}

#[derive(Args)]
struct SendBgArgs {
    #[command(flatten)]
    send: SendArgs,
    /// Job priority: high/normal/low or 1/2/3
    #[arg(long, default_value = "normal")]
    priority: Priority,
    /// Retry this many times when the server pool has no capacity
    #[arg(long, default_value_t = 1)]
    attempts: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // The monitor owns the terminal; its logs go to a file instead.
    let _guard = init_tracing(&config, matches!(cli.command, Command::Monitor))?;

    let storage = match &config.session.data_dir {
        Some(dir) => SessionStorage::with_path(dir.clone()),
        None => SessionStorage::new(),
    };
    let api = ApiClient::from_config(&config.backend);

    match cli.command {
        Command::Login {
            token,
            user_name,
            email,
        } => {
            let session = SessionContext::new(
                token,
                UserProfile {
                    id: String::new(),
                    user_name: user_name.unwrap_or_default(),
                    email: email.unwrap_or_default(),
                },
            );
            if session.is_expired() {
                anyhow::bail!("refusing to store an already-expired token");
            }
            storage.save(&session).await?;
            println!("session stored");
        }
        Command::Logout => {
            storage.clear().await?;
            println!("session cleared");
        }
        Command::Whoami => {
            let session = load_session(&storage).await?;
            if !session.has_token() {
                println!("not logged in");
            } else {
                let user = &session.user;
                let age = session.age();
                println!(
                    "{} <{}> (logged in {}h {}m ago{})",
                    user.user_name,
                    user.email,
                    age.num_hours(),
                    age.num_minutes() % 60,
                    if session.is_expired() { ", token expired" } else { "" },
                );
            }
        }
        Command::Servers => {
            let session = load_session(&storage).await?;
            let registry = ServerRegistry::new(api);
            let list = registry.list_servers(&session).await?;
            if list.servers.is_empty() {
                println!("no servers registered");
            }
            for server in &list.servers {
                let default = list.default_server_id.as_deref() == Some(&server.server_id);
                println!(
                    "{}{}  {}  {}  active={} busy={} sent={}",
                    server.server_id,
                    if default { " (default)" } else { "" },
                    server.server_name,
                    server.server_url,
                    server.is_active,
                    server.is_busy,
                    server.email_count,
                );
            }
        }
        Command::ServerInfo => {
            let session = load_session(&storage).await?;
            let info = api.server_info(&session).await?;
            println!("hostname:  {}", info.hostname);
            println!("platform:  {}", info.platform);
            println!("ip:        {}", info.primary_ip);
            println!("uptime:    {:.0}s", info.uptime);
            println!("emails:    {}", info.email_count);
        }
        Command::Health => {
            let status = api.health().await?;
            println!(
                "{}: {}",
                if status.success { "ok" } else { "down" },
                status.message
            );
        }
        Command::WorkerHealth => {
            let session = load_session(&storage).await?;
            let status = api.worker_health(&session).await?;
            println!(
                "{}: {}",
                if status.success { "ok" } else { "down" },
                status.message
            );
        }
        Command::Send(args) => {
            let session = load_session(&storage).await?;
            let (request, server) = build_request(&args)?;
            let payload =
                planner::plan(DispatchMode::Instant, server.as_deref(), None, &request)?;

            let submitter =
                JobSubmitter::new(api).with_demo_fallback(config.dispatch.demo_fallback);
            let receipt = submitter.send_instant(&session, &payload).await?;
            if receipt.demo {
                println!("(demo) {}", receipt.message);
            } else {
                println!("{} ({} recipients)", receipt.message, receipt.sent_count);
                if let Some(server) = receipt.server_info {
                    println!("via {} ({})", server.server_name, server.server_url);
                }
            }
        }
        Command::SendBg(args) => {
            let session = load_session(&storage).await?;
            let (request, server) = build_request(&args.send)?;
            let payload = planner::plan(
                DispatchMode::Background,
                server.as_deref(),
                Some(args.priority),
                &request,
            )?;

            let submitter = JobSubmitter::new(api);
            let ticket = with_retry(
                || submitter.send_background(&session, &payload).boxed(),
                args.attempts.max(1),
                |e| matches!(e, AppError::Capacity(_)),
            )
            .await?;

            println!("{}", ticket.message);
            println!(
                "job {} queued: {} ({} emails)",
                ticket.job_id, ticket.status, ticket.total_emails
            );
            if let Some(eta) = ticket.estimated_completion_time {
                println!("estimated completion: {eta}");
            }
            println!("track it with: sendfleet watch {}", ticket.job_id);
        }
        Command::Jobs { status, limit } => {
            let session = load_session(&storage).await?;
            let tracker = JobTracker::new(api);
            let jobs = tracker.list_jobs(&session, status, limit).await?;
            if jobs.is_empty() {
                println!("no jobs");
            }
            for job in jobs {
                print_job_line(&job);
            }
        }
        Command::Job { job_id } => {
            let session = load_session(&storage).await?;
            let tracker = JobTracker::new(api);
            let job = tracker.get_job(&session, &job_id).await?;
            print_job_line(&job);
            if let Some(server) = &job.server_info {
                println!("server: {} ({})", server.server_name, server.server_url);
            }
            if let Some(eta) = &job.estimated_completion_time {
                println!("estimated completion: {eta}");
            }
        }
        Command::Pause { job_id } => {
            let session = load_session(&storage).await?;
            let tracker = JobTracker::new(api);
            let job = tracker.pause(&session, &job_id).await?;
            println!("job {} is now {}", job.job_id, job.status);
        }
        Command::Resume { job_id } => {
            let session = load_session(&storage).await?;
            let tracker = JobTracker::new(api);
            let job = tracker.resume(&session, &job_id).await?;
            println!("job {} is now {}", job.job_id, job.status);
        }
        Command::Watch { job_id } => {
            let session = load_session(&storage).await?;
            let tracker = JobTracker::new(api);
            watch_job(tracker, session, &job_id, config.poll.interval_secs).await?;
        }
        Command::Monitor => {
            let session = load_session(&storage).await?;
            session
                .require_token()
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            sendfleet::tui::run(config, session).await?;
        }
    }

    Ok(())
}

/// Set up tracing: stderr for line-mode commands, a file while the TUI
/// owns the terminal.
fn init_tracing(
    config: &Config,
    to_file: bool,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sendfleet=info".into());

    if to_file {
        let log_dir = config
            .session
            .data_dir
            .clone()
            .or_else(dirs::data_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sendfleet");
        std::fs::create_dir_all(&log_dir)?;
        let appender = tracing_appender::rolling::daily(log_dir, "sendfleet.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        Ok(None)
    }
}

/// Load the stored session; an absent one becomes an anonymous context so
/// the guard inside each operation produces the auth error.
async fn load_session(storage: &SessionStorage) -> anyhow::Result<SessionContext> {
    Ok(storage.load().await?.unwrap_or_else(SessionContext::anonymous))
}

fn build_request(args: &SendArgs) -> anyhow::Result<(DispatchRequest, Option<String>)> {
    let mut recipients = args.to.clone();
    if let Some(path) = &args.to_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading recipients from {}", path.display()))?;
        recipients.extend(content.lines().map(str::to_string));
    }

    let template = match (&args.body, &args.body_file) {
        (Some(body), _) => body.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading body from {}", path.display()))?,
        (None, None) => String::new(),
    };

    let app_password = args
        .app_password
        .clone()
        .or_else(|| std::env::var("SENDFLEET_APP_PASSWORD").ok())
        .unwrap_or_default();

    let request = DispatchRequest {
        sender_email: args.from.clone(),
        sender_name: args.name.clone(),
        app_password,
        recipients,
        subject: args.subject.clone(),
        template,
    };
    Ok((request, args.server.clone()))
}

fn print_job_line(job: &sendfleet::models::EmailJob) {
    println!(
        "{}  {:<10}  {:>3}%  {}/{} sent, {} failed  updated {}",
        job.job_id,
        job.status.to_string(),
        job.display_progress(),
        job.sent_emails,
        job.total_emails,
        job.failed_emails,
        job.updated_at.format("%Y-%m-%d %H:%M:%S"),
    );
}

/// Line-mode watch: one status line per snapshot until the job is done or
/// the user interrupts. Ctrl-C tears the poll task down before exit.
async fn watch_job(
    tracker: JobTracker,
    session: SessionContext,
    job_id: &str,
    interval_secs: u64,
) -> anyhow::Result<()> {
    session
        .require_token()
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let source = Arc::new(SessionJobSource::new(tracker, session));
    let handle = JobWatcher::spawn(source, job_id, Duration::from_secs(interval_secs));
    let mut snapshots = handle.snapshots();

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let interrupted = loop {
        tokio::select! {
            _ = &mut interrupt => break true,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break false;
                }
                let job = snapshots.borrow().clone();
                if let Some(job) = job {
                    print_job_line(&job);
                    if job.status.is_terminal() {
                        info!(job_id = %job.job_id, "Job finished");
                        break false;
                    }
                }
            }
        }
    };

    if interrupted {
        handle.stop().await;
        println!("watch stopped");
    }
    Ok(())
}
