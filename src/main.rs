//! The `gitbot` binary: wires up the ambient hosting shell around the
//! webhook dispatcher and serves the five HTTP endpoints of §6.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use gitbot::config::Config;
use gitbot::platform::{PlatformGateway, RestPlatformGateway};
use gitbot::render::ImaraDiffRenderer;
use gitbot::server::{self, AppState};
use gitbot::vcs::VcsGateway;
use gitbot::webhook::{Dispatcher, SshRemoteResolver};

/// gitbot - webhook bot for rebase archaeology and per-commit policy checks
#[derive(Parser, Debug)]
#[command(name = "gitbot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file. Falls back to `GITBOT_CONFIG` if unset.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the address the HTTP server binds to.
    #[arg(long)]
    bind_address: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Some(bind_address) = args.bind_address {
        config.bind_address = bind_address;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "gitbot exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    // The dispatcher and the HTTP route handlers both need a handle on the
    // registry repository; `VcsGateway` wraps its `git2::Repository` in a
    // `Mutex` precisely so one instance can be shared this way.
    let vcs = Arc::new(VcsGateway::open(&config.repo_path)?);

    let platform: Arc<dyn PlatformGateway> = Arc::new(RestPlatformGateway::new(
        config.username.clone(),
        config.personal_access_token.clone(),
        config.endpoint.clone(),
    ));

    let remote_resolver = Box::new(SshRemoteResolver {
        hostname: config.hostname.clone(),
    });

    let dispatcher = Dispatcher::new(
        Arc::clone(&vcs),
        platform,
        remote_resolver,
        config.domains.clone(),
        config.url_root.clone(),
    );

    let state = Arc::new(AppState {
        dispatcher,
        vcs,
        renderer: Box::new(ImaraDiffRenderer),
        hostname: config.hostname.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(bind_address = %config.bind_address, "gitbot listening");
    axum::serve(listener, server::router(state)).await?;

    Ok(())
}
