//! # CourseCast CLI
//!
//! Paced broadcaster for free course coupons: keeps a session-authenticated
//! chat transport alive, fetches the current coupon batch on a fixed cadence,
//! and drips each item into the target group with a pacing delay.
//!
//! Usage:
//!   coursecast start               # Run the broadcaster + gateway
//!   coursecast info                # Show resolved configuration

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use coursecast_core::Config;
use coursecast_gateway::AppState;
use coursecast_scheduler::{BroadcastEngine, HttpItemSource, MediaStager};
use coursecast_transport::{build_transport, SessionManager};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "coursecast",
    version,
    about = "📚 CourseCast — paced course-coupon broadcaster for chat groups"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the session manager, broadcast loop, and HTTP gateway
    Start,
    /// Show resolved configuration and exit
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "coursecast=debug,coursecast_core=debug,coursecast_transport=debug,coursecast_scheduler=debug,coursecast_gateway=debug"
    } else {
        "coursecast=info,coursecast_transport=info,coursecast_scheduler=info,coursecast_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    match cli.command.unwrap_or(Commands::Start) {
        Commands::Start => start().await,
        Commands::Info => info(),
    }
}

fn info() -> Result<()> {
    println!("📚 CourseCast v{}", env!("CARGO_PKG_VERSION"));
    println!("   Platform: {} / {}", std::env::consts::OS, std::env::consts::ARCH);
    match Config::from_env() {
        Ok(config) => {
            println!("   Mode: {:?}", config.transport_mode);
            println!("   Feed: {}", config.feed_url);
            println!("   Target: {}", config.group_id);
            println!("   Gateway port: {}", config.port);
            println!(
                "   Pacing: {}s | Cadence: {}s | Reconnect delay: {}s",
                config.pacing.as_secs(),
                config.cadence.as_secs(),
                config.reconnect_delay.as_secs()
            );
        }
        Err(e) => println!("   ⚠️  Configuration incomplete: {e}"),
    }
    Ok(())
}

async fn start() -> Result<()> {
    // Missing required environment is fatal at startup.
    let config = Config::from_env()?;

    let transport = build_transport(&config)?;
    let session = Arc::new(SessionManager::new(transport, config.reconnect_delay));

    session.on_ready(|| tracing::info!("chat session ready"));
    session.on_disconnected(|| tracing::warn!("chat session disconnected"));

    // The only fatal connect: after the first Ready, disconnects are
    // supervised by the session manager.
    session.start().await?;

    let source = Arc::new(HttpItemSource::new(&config.feed_url));
    let stager = MediaStager::new(std::env::temp_dir().join("coursecast-media"));
    let engine = Arc::new(BroadcastEngine::new(
        Arc::clone(&session),
        source,
        stager,
        config.group_id.clone(),
        config.pacing,
        config.cadence,
    ));

    let state = Arc::new(AppState::new(
        Arc::clone(&session),
        config.send_preview_delay,
    ));

    let gateway = tokio::spawn(coursecast_gateway::serve(state, config.port));
    let broadcaster = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.run_forever().await })
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, stopping");
        }
        result = gateway => result??,
        result = broadcaster => result??,
    }
    Ok(())
}
