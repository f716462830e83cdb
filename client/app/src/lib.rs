//! Terminal client for the NutriVault backend.
//!
//! # Event Loop
//! - One task owns every piece of UI state: the search coordinator, the screen, the caches
//! - The loop waits on stdin lines, the coordinator (debounce deadline or search completion) and the shutdown signal
//! - Searches run on spawned tasks and report back through the coordinator, never touching UI state themselves
//! - Commands run to completion before the next line is read
//!
//! # Output
//! Views and toasts go to stdout, logs go to stderr. Run with `RUST_LOG=app=debug,catalog=debug`
//! to see every request.
use std::{io::stdout, sync::Arc};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader, stdin},
    signal,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod screen;
pub mod search;
pub mod state;
pub mod utils;
pub mod views;

use config::{Config, Overrides};
use routes::Flow;
use screen::Screen;
use search::SearchCoordinator;
use state::State;
use views::Toast;

pub async fn start_app(overrides: Overrides) -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    info!("Initializing state...");
    let config = Config::load()?.with_overrides(overrides)?;
    let state = State::new(config)?;

    let screen = Screen::new(stdout(), true);
    let mut coordinator = SearchCoordinator::new(
        Arc::new(state.food_search()),
        screen,
        state.config.search,
    );

    let banner = match state.api.health().await {
        Ok(health) => views::status_banner(state.api.base_url(), Ok(health.message.as_str())),
        Err(e) => {
            warn!("Health check failed: {e}");
            views::status_banner(state.api.base_url(), Err(e.to_string().as_str()))
        }
    };
    coordinator.consumer_mut().show(&banner);
    coordinator.consumer_mut().show(views::help());

    let mut lines = BufReader::new(stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    info!("Client running");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Input closed");
                    break;
                };

                let flow = match routes::parse(&line) {
                    Ok(command) => routes::handle(&state, &mut coordinator, command).await,
                    Err(e) => Err(e),
                };

                match flow {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => break,
                    Err(e) => {
                        error!("Command failed: {e}");
                        coordinator.consumer_mut().toast(Toast::error(e.to_string()));
                    }
                }
            }
            _ = coordinator.settle() => {}
            _ = &mut shutdown => break,
        }
    }

    coordinator.dispose();
    info!("Client shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
