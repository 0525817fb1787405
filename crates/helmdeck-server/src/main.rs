//! Helmdeck console binary.
//!
//! Runs the demo room against a console surface. Renders and replies are
//! written to the log; clicks are read from stdin, one command per line:
//!
//! ```text
//! click <actor> <control>
//! cancel <actor>
//! render
//! quit
//! ```
//!
//! # Usage
//!
//! ```bash
//! # In-memory locks
//! helmdeck --log-level debug
//!
//! # Durable locks shared with other processes
//! helmdeck --lock-db locks.redb --namespace mm-space
//! ```

mod demo;

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use clap::Parser;
use helmdeck_core::{
    ActorId, Control, EventHandle, MessageId, Surface, SurfaceError, SurfaceMessage,
};
use helmdeck_server::{
    AppError, ClickEvent, EngineConfig, LockStore, MemoryLockStore, RedbLockStore, Room,
    SystemEnv,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Helmdeck interactive control surface
#[derive(Parser, Debug)]
#[command(name = "helmdeck")]
#[command(about = "Interactive control surface engine with a console front end")]
#[command(version)]
struct Args {
    /// Lock key namespace
    #[arg(long, default_value = helmdeck_server::DEFAULT_NAMESPACE)]
    namespace: String,

    /// Path to a redb lock database (in-memory locks when omitted)
    #[arg(long)]
    lock_db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Extra control ids that skip the busy check (repeatable)
    #[arg(long)]
    wait_exception: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    if args.namespace.is_empty() {
        return Err(AppError::Config("namespace must not be empty".to_string()));
    }

    let config = args
        .wait_exception
        .iter()
        .fold(demo::engine_config(&args.namespace), |config, id| {
            config.with_wait_exception(id.as_str())
        });
    let env = SystemEnv::new();

    tracing::info!("Helmdeck starting");

    match &args.lock_db {
        Some(path) => {
            tracing::info!("Using lock database {}", path.display());
            let store = RedbLockStore::open(path, env.clone())?;
            run(config, env, store).await
        },
        None => {
            tracing::warn!("No lock database given - locks are in-memory only");
            run(config, env.clone(), MemoryLockStore::new(env)).await
        },
    }
}

/// Open the demo room and feed it stdin commands until `quit` or EOF.
async fn run<L: LockStore>(
    config: EngineConfig,
    env: SystemEnv,
    store: L,
) -> Result<(), AppError> {
    let surface = Arc::new(ConsoleSurface::default());
    let room = Room::open(demo::room_options(env.clone()), config, env, store, surface).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["click", actor, control] => {
                let handle = Arc::new(ConsoleHandle::new(ActorId::new(*actor)));
                let task = room.dispatch(ClickEvent::new(*control, *actor, handle));
                tokio::spawn(async move {
                    match task.await {
                        Ok(Ok(outcome)) => tracing::debug!(?outcome, "click finished"),
                        Ok(Err(e)) => tracing::error!("Click failed: {}", e),
                        Err(e) => tracing::error!("Click task panicked: {}", e),
                    }
                });
            },
            ["cancel", actor] => {
                if room.cancel(&ActorId::new(*actor)) {
                    tracing::info!("Cancelled pending wait of {}", actor);
                } else {
                    tracing::info!("Nothing pending for {}", actor);
                }
            },
            ["render"] => {
                if let Err(e) = room.render().await {
                    tracing::error!("Render failed: {}", e);
                }
            },
            ["quit"] => break,
            [] => {},
            _ => tracing::warn!("Unknown command: {}", line),
        }
    }

    tracing::info!("Helmdeck stopping");
    Ok(())
}

/// Surface that writes the room message to the log.
#[derive(Default)]
struct ConsoleSurface {
    next_id: AtomicU64,
}

#[async_trait]
impl Surface for ConsoleSurface {
    async fn send(&self, message: SurfaceMessage) -> Result<MessageId, SurfaceError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = MessageId::new(format!("console-{n}"));
        tracing::info!(message_id = %id, "\n{}", render(&message));
        Ok(id)
    }

    async fn edit(
        &self,
        message_id: &MessageId,
        message: SurfaceMessage,
    ) -> Result<(), SurfaceError> {
        tracing::info!(%message_id, "\n{}", render(&message));
        Ok(())
    }

    fn mention(&self, actor: &ActorId) -> String {
        format!("@{actor}")
    }
}

/// Reply channel for one console click.
struct ConsoleHandle {
    actor: ActorId,
    replied: AtomicBool,
}

impl ConsoleHandle {
    fn new(actor: ActorId) -> Self {
        Self { actor, replied: AtomicBool::new(false) }
    }
}

#[async_trait]
impl EventHandle for ConsoleHandle {
    async fn reply(&self, message: SurfaceMessage) -> Result<(), SurfaceError> {
        self.replied.store(true, Ordering::SeqCst);
        tracing::info!(actor = %self.actor, "reply: {}", render(&message));
        Ok(())
    }

    async fn edit_reply(&self, message: SurfaceMessage) -> Result<(), SurfaceError> {
        tracing::info!(actor = %self.actor, "edit: {}", render(&message));
        Ok(())
    }

    fn replied(&self) -> bool {
        self.replied.load(Ordering::SeqCst)
    }
}

/// Text form of a message: body, then one line per row of `[label](id)`.
fn render(message: &SurfaceMessage) -> String {
    let mut out = message.content.plain_text().to_string();
    for row in &message.rows {
        let controls: Vec<String> = row.iter().map(render_control).collect();
        out.push('\n');
        out.push_str(&controls.join(" "));
    }
    out
}

fn render_control(control: &Control) -> String {
    if control.disabled {
        format!("[{}]({}, disabled)", control.label, control.id)
    } else {
        format!("[{}]({})", control.label, control.id)
    }
}
