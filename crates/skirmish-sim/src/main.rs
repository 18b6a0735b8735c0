//! # Skirmish Sim
//!
//! Headless arena harness for the combat core.
//!
//! Usage: `skirmish [arena.toml]`. Without an argument the built-in arena
//! and profiles are used. Set `RUST_LOG=skirmish=debug` to follow every
//! animation, hit popup and state change.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod arena;
mod log_presenter;

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::arena::{Arena, ArenaConfig, DEFAULT_ARENA};
use crate::log_presenter::LogPresenter;

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("skirmish=info".parse()?))
        .init();

    info!("Skirmish arena starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => ArenaConfig::load_from(&path)?,
        None => {
            info!("No arena given, using the built-in arena");
            ArenaConfig::from_toml(DEFAULT_ARENA)?
        },
    };

    let registry = config.registry()?;
    info!("Profiles: {}", registry.names().join(", "));

    let mut arena = Arena::new(config, &registry)?;
    let mut presenter = LogPresenter::new();
    let outcome = arena.run(&mut presenter);

    info!(
        "{} animations, {} projectiles, {} deaths; {} combatants left standing",
        presenter.animations,
        presenter.projectiles,
        presenter.deaths,
        arena.world().len()
    );
    match outcome.victor {
        Some(victor) => info!("Victor: {:?}", victor),
        None => info!("No victor after {} ticks", outcome.ticks),
    }
    Ok(())
}
