// ABOUTME: ViewSync participant binary
// ABOUTME: Runs an admin or viewer console attached to the sync channel

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use viewsync::console::{self, AdminConsole, ViewerConsole};
use viewsync::media;
use viewsync::protocol::messages::DeviceRole;
use viewsync::session::{SessionConfig, SyncSession};
use viewsync::transport::LocalHub;

#[derive(Parser, Debug)]
#[command(name = "viewsync")]
#[command(author, version, about = "Synchronized media playback console", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the admin console (controls playback for all viewers)
    Admin(AdminArgs),
    /// Run a viewer console (replicates the admin's playback)
    Viewer(ViewerArgs),
}

/// Arguments shared by both participant roles
#[derive(Args, Debug, Clone)]
struct ParticipantArgs {
    /// Relay WebSocket URL
    #[arg(short, long, default_value = "ws://localhost:8931/sync")]
    relay: String,

    /// Device display name
    #[arg(short, long)]
    name: Option<String>,

    /// Run without the networked relay path (local-only sync)
    #[arg(long)]
    offline: bool,

    /// Enable verbose logging (corrupts the console; for debugging)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct AdminArgs {
    #[command(flatten)]
    participant: ParticipantArgs,

    /// Seed the library with the demo videos
    #[arg(long)]
    demo: bool,

    /// Media files to ingest at startup (local-only, will not sync)
    #[arg(long = "media")]
    media: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct ViewerArgs {
    #[command(flatten)]
    participant: ParticipantArgs,
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "viewsync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn session_config(participant: &ParticipantArgs, role: DeviceRole, default_name: String) -> SessionConfig {
    let name = participant.name.clone().unwrap_or(default_name);
    let mut config = SessionConfig::new(name, role);
    if !participant.offline {
        config = config.relay_url(participant.relay.clone());
    }
    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Admin(args) => run_admin(args).await,
        Command::Viewer(args) => run_viewer(args).await,
    }
}

async fn run_admin(args: AdminArgs) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if args.participant.verbose {
        init_tracing();
    }

    let config = session_config(
        &args.participant,
        DeviceRole::Admin,
        "Admin Console".to_string(),
    )
    .seed_demo_library(args.demo);

    let hub = LocalHub::new();
    let session = Arc::new(SyncSession::start(config, &hub));

    // Ingest local files before the console takes over the terminal
    for path in &args.media {
        match media::probe_file(path) {
            Ok(descriptor) => {
                let title = descriptor.title.clone();
                if let Some(added) = session.engine().add_media(descriptor) {
                    if !added.distributable {
                        eprintln!("note: '{}' has a local-only source and will not sync to other devices", title);
                    }
                }
            }
            Err(e) => {
                eprintln!("skipping {}: {}", path.display(), e);
            }
        }
    }

    let mut terminal = console::setup_terminal()?;
    let mut app = AdminConsole::new(Arc::clone(&session));
    let result = app.run(&mut terminal);
    console::restore_terminal(&mut terminal)?;

    session.shutdown();
    result?;
    Ok(())
}

async fn run_viewer(args: ViewerArgs) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if args.participant.verbose {
        init_tracing();
    }

    // Distinguishable default name per headset
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let default_name = format!("Headset {}", &suffix[..4]);

    let config = session_config(&args.participant, DeviceRole::Viewer, default_name);

    let hub = LocalHub::new();
    let session = Arc::new(SyncSession::start(config, &hub));

    let mut terminal = console::setup_terminal()?;
    let mut app = ViewerConsole::new(Arc::clone(&session));
    let result = app.run(&mut terminal);
    console::restore_terminal(&mut terminal)?;

    session.shutdown();
    result?;
    Ok(())
}
